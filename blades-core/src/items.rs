//! Weapons, armor, and the standard item catalogue.
//!
//! Equipment here is the minimum the combat engine reads: a weapon's attack
//! category, kind and flat bonus, and an armor's damage reduction and reflex
//! bonus. Standard items can be looked up by name.

use crate::combatant::Skill;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How an attack is delivered. Selects the attacker's base attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackCategory {
    Melee,
    Ranged,
    Arcane,
}

impl AttackCategory {
    pub fn name(&self) -> &'static str {
        match self {
            AttackCategory::Melee => "melee",
            AttackCategory::Ranged => "ranged",
            AttackCategory::Arcane => "arcane",
        }
    }

    pub fn all() -> [AttackCategory; 3] {
        [
            AttackCategory::Melee,
            AttackCategory::Ranged,
            AttackCategory::Arcane,
        ]
    }
}

impl fmt::Display for AttackCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Weapon family. Selects which combat skill feeds the skill bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponKind {
    Bladed,
    Blunt,
    Arcane,
    Ranged,
}

impl WeaponKind {
    pub fn skill(&self) -> Skill {
        match self {
            WeaponKind::Bladed => Skill::Bladed,
            WeaponKind::Blunt => Skill::Blunt,
            WeaponKind::Arcane => Skill::ArcaneWeapons,
            WeaponKind::Ranged => Skill::Ranged,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    pub name: String,
    pub kind: WeaponKind,
    pub category: AttackCategory,
    /// Flat bonus added to the attack coefficient.
    pub bonus: i32,
}

impl Weapon {
    pub fn new(
        name: impl Into<String>,
        kind: WeaponKind,
        category: AttackCategory,
        bonus: i32,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            category,
            bonus,
        }
    }
}

impl fmt::Display for Weapon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {:+})", self.name, self.category, self.bonus)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Armor {
    pub name: String,
    /// Subtracted from every hit before it reaches hit points.
    pub damage_reduction: i32,
    /// Added to the wearer's reflexes when defending. May be negative.
    pub reflex_bonus: i32,
}

impl Armor {
    pub fn new(name: impl Into<String>, damage_reduction: i32, reflex_bonus: i32) -> Self {
        Self {
            name: name.into(),
            damage_reduction,
            reflex_bonus,
        }
    }
}

impl fmt::Display for Armor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (reduction {}, reflexes {:+})",
            self.name, self.damage_reduction, self.reflex_bonus
        )
    }
}

// ============================================================================
// Standard items
// ============================================================================

/// Get a standard weapon by name (case-insensitive).
pub fn get_weapon(name: &str) -> Option<Weapon> {
    let name_lower = name.to_lowercase();
    standard_weapons()
        .into_iter()
        .find(|w| w.name.to_lowercase() == name_lower)
}

/// Get a standard armor piece by name (case-insensitive).
pub fn get_armor(name: &str) -> Option<Armor> {
    let name_lower = name.to_lowercase();
    standard_armors()
        .into_iter()
        .find(|a| a.name.to_lowercase() == name_lower)
}

pub fn standard_weapons() -> Vec<Weapon> {
    vec![
        basic_sword(),
        basic_bow(),
        basic_staff(),
        Weapon::new("Dagger", WeaponKind::Bladed, AttackCategory::Melee, 1),
        Weapon::new("Mace", WeaponKind::Blunt, AttackCategory::Melee, 3),
        Weapon::new("War Hammer", WeaponKind::Blunt, AttackCategory::Melee, 4),
        Weapon::new("Crossbow", WeaponKind::Ranged, AttackCategory::Ranged, 3),
        Weapon::new("Runed Wand", WeaponKind::Arcane, AttackCategory::Arcane, 3),
    ]
}

pub fn standard_armors() -> Vec<Armor> {
    vec![
        Armor::new("Leather Armor", 1, 1),
        Armor::new("Chain Mail", 3, 0),
        Armor::new("Plate Armor", 5, -2),
        Armor::new("Warded Robes", 2, 2),
    ]
}

pub fn basic_sword() -> Weapon {
    Weapon::new("Short Sword", WeaponKind::Bladed, AttackCategory::Melee, 2)
}

pub fn basic_bow() -> Weapon {
    Weapon::new("Short Bow", WeaponKind::Ranged, AttackCategory::Ranged, 2)
}

pub fn basic_staff() -> Weapon {
    Weapon::new("Wooden Staff", WeaponKind::Arcane, AttackCategory::Arcane, 2)
}
