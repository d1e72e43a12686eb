//! Combatant stat model.
//!
//! A [`Combatant`] is owned by the caller. The engine only reads its stats and
//! mutates its hit points, stamina and vital flags while resolving an attack.

use crate::items::{Armor, Weapon};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Hit points granted per point of endurance.
pub const HIT_POINTS_PER_ENDURANCE: i32 = 10;

/// Stamina points granted per point of the stamina attribute.
pub const STAMINA_PER_POINT: i32 = 5;

/// Skill levels per point of skill bonus.
pub const SKILL_BONUS_STEP: i32 = 5;

/// Unique identifier for combatants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatantId(pub Uuid);

impl CombatantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CombatantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Attributes and skills
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attribute {
    Strength,
    Reflexes,
    Endurance,
    Willpower,
    Accuracy,
    Stamina,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub strength: u8,
    pub reflexes: u8,
    pub endurance: u8,
    pub willpower: u8,
    pub accuracy: u8,
    pub stamina: u8,
}

impl Attributes {
    pub fn get(&self, attribute: Attribute) -> u8 {
        match attribute {
            Attribute::Strength => self.strength,
            Attribute::Reflexes => self.reflexes,
            Attribute::Endurance => self.endurance,
            Attribute::Willpower => self.willpower,
            Attribute::Accuracy => self.accuracy,
            Attribute::Stamina => self.stamina,
        }
    }

    pub fn max_hit_points(&self) -> i32 {
        i32::from(self.endurance) * HIT_POINTS_PER_ENDURANCE
    }

    pub fn max_stamina(&self) -> i32 {
        i32::from(self.stamina) * STAMINA_PER_POINT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Skill {
    Bladed,
    Blunt,
    ArcaneWeapons,
    Ranged,
    Unarmed,
    Stealth,
    Perception,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skills {
    pub bladed: u8,
    pub blunt: u8,
    pub arcane_weapons: u8,
    pub ranged: u8,
    pub unarmed: u8,
    pub stealth: u8,
    pub perception: u8,
}

impl Skills {
    pub fn get(&self, skill: Skill) -> u8 {
        match skill {
            Skill::Bladed => self.bladed,
            Skill::Blunt => self.blunt,
            Skill::ArcaneWeapons => self.arcane_weapons,
            Skill::Ranged => self.ranged,
            Skill::Unarmed => self.unarmed,
            Skill::Stealth => self.stealth,
            Skill::Perception => self.perception,
        }
    }

    /// +1 per [`SKILL_BONUS_STEP`] levels, rounded down.
    pub fn bonus(&self, skill: Skill) -> i32 {
        i32::from(self.get(skill)) / SKILL_BONUS_STEP
    }
}

// ============================================================================
// Resource pools
// ============================================================================

/// A current/maximum resource such as hit points or stamina.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub current: i32,
    pub maximum: i32,
}

impl Pool {
    pub fn full(maximum: i32) -> Self {
        Self {
            current: maximum,
            maximum,
        }
    }

    pub fn restore(&mut self) {
        self.current = self.maximum;
    }

    /// Remove up to `amount`, never going below zero. Returns what was removed.
    pub fn drain(&mut self, amount: i32) -> i32 {
        let before = self.current;
        self.current = self.current.saturating_sub(amount.max(0)).max(0);
        before - self.current
    }

    pub fn is_empty(&self) -> bool {
        self.current <= 0
    }

    pub fn ratio(&self) -> f32 {
        if self.maximum <= 0 {
            return 0.0;
        }
        (self.current as f32 / self.maximum as f32).max(0.0)
    }
}

// ============================================================================
// Combatant
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Combatant {
    pub id: CombatantId,
    pub name: String,
    pub attributes: Attributes,
    pub skills: Skills,
    pub hit_points: Pool,
    pub stamina: Pool,
    pub weapon: Option<Weapon>,
    pub armor: Option<Armor>,
    pub alive: bool,
    pub unconscious: bool,
}

impl Combatant {
    /// A combatant with zeroed attributes. Use the `with_*` methods to fill it in.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CombatantId::new(),
            name: name.into(),
            attributes: Attributes::default(),
            skills: Skills::default(),
            hit_points: Pool::full(0),
            stamina: Pool::full(0),
            weapon: None,
            armor: None,
            alive: true,
            unconscious: false,
        }
    }

    /// Set attributes and reset both pools to their derived maxima.
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self.hit_points = Pool::full(attributes.max_hit_points());
        self.stamina = Pool::full(attributes.max_stamina());
        self
    }

    pub fn with_skills(mut self, skills: Skills) -> Self {
        self.skills = skills;
        self
    }

    pub fn with_weapon(mut self, weapon: Weapon) -> Self {
        self.weapon = Some(weapon);
        self
    }

    pub fn with_armor(mut self, armor: Armor) -> Self {
        self.armor = Some(armor);
        self
    }

    /// Alive, conscious and above zero hit points.
    pub fn is_fit_to_fight(&self) -> bool {
        self.alive && !self.unconscious && self.hit_points.current > 0
    }

    pub fn restore_stamina(&mut self) {
        self.stamina.restore();
    }

    /// Spend stamina, flooring at zero. Returns the amount actually removed.
    pub fn spend_stamina(&mut self, amount: i32) -> i32 {
        self.stamina.drain(amount)
    }

    /// Out of stamina: the next successful hit lands a finishing blow.
    pub fn is_out_of_stamina(&self) -> bool {
        self.stamina.is_empty()
    }

    pub fn damage_reduction(&self) -> i32 {
        self.armor.as_ref().map_or(0, |a| a.damage_reduction)
    }

    /// Apply incoming damage after armor reduction.
    ///
    /// Returns the damage that actually reached hit points. Reaching zero hit
    /// points kills the combatant and leaves them unconscious.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let applied = amount.saturating_sub(self.damage_reduction()).max(0);
        self.hit_points.drain(applied);
        if self.hit_points.current == 0 {
            self.alive = false;
            self.unconscious = true;
        }
        applied
    }

    /// Reflexes plus any armor modifier.
    pub fn reflex_modifier(&self) -> i32 {
        i32::from(self.attributes.reflexes)
            .saturating_add(self.armor.as_ref().map_or(0, |a| a.reflex_bonus))
    }

    /// Skill bonus for the given weapon, or for unarmed combat without one.
    pub fn weapon_skill_bonus(&self, weapon: Option<&Weapon>) -> i32 {
        let skill = weapon.map_or(Skill::Unarmed, |w| w.kind.skill());
        self.skills.bonus(skill)
    }

    /// Name of the equipped weapon, or "Fists".
    pub fn weapon_name(&self) -> String {
        self.weapon
            .as_ref()
            .map_or_else(|| "Fists".to_string(), |w| w.name.clone())
    }
}
