//! Attack and defense coefficient formulas.
//!
//! The attack coefficient depends on the attack category, which picks the
//! attacker's base attribute:
//!
//! | Category | Attribute |
//! |----------|-----------|
//! | Melee    | Strength  |
//! | Ranged   | Accuracy  |
//! | Arcane   | Willpower |
//!
//! `attack = attribute + sum(dice) + weapon bonus + skill bonus`
//!
//! The defense coefficient is the same for every category:
//! `defense = reflexes + armor reflex bonus + sum(dice)`.

use crate::combatant::{Attribute, Combatant};
use crate::items::{AttackCategory, Weapon};

/// Coefficient formula for one attack category.
pub trait AttackStrategy {
    fn category(&self) -> AttackCategory;

    /// The attacker's attribute this category draws on.
    fn base_attribute(&self, attacker: &Combatant) -> i32;

    fn attack_coefficient(
        &self,
        attacker: &Combatant,
        weapon: Option<&Weapon>,
        dice: &[u32],
    ) -> i32 {
        let weapon_bonus = weapon.map_or(0, |w| w.bonus);
        let skill_bonus = attacker.weapon_skill_bonus(weapon);
        self.base_attribute(attacker)
            .saturating_add(dice_sum(dice))
            .saturating_add(weapon_bonus)
            .saturating_add(skill_bonus)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MeleeStrategy;

impl AttackStrategy for MeleeStrategy {
    fn category(&self) -> AttackCategory {
        AttackCategory::Melee
    }

    fn base_attribute(&self, attacker: &Combatant) -> i32 {
        i32::from(attacker.attributes.get(Attribute::Strength))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RangedStrategy;

impl AttackStrategy for RangedStrategy {
    fn category(&self) -> AttackCategory {
        AttackCategory::Ranged
    }

    fn base_attribute(&self, attacker: &Combatant) -> i32 {
        i32::from(attacker.attributes.get(Attribute::Accuracy))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ArcaneStrategy;

impl AttackStrategy for ArcaneStrategy {
    fn category(&self) -> AttackCategory {
        AttackCategory::Arcane
    }

    fn base_attribute(&self, attacker: &Combatant) -> i32 {
        i32::from(attacker.attributes.get(Attribute::Willpower))
    }
}

/// Defense coefficient: reflexes (with armor) plus the defense dice.
pub fn defense_coefficient(defender: &Combatant, dice: &[u32]) -> i32 {
    defender.reflex_modifier().saturating_add(dice_sum(dice))
}

/// Sum of die faces, saturating at `i32::MAX`.
pub fn dice_sum(dice: &[u32]) -> i32 {
    dice.iter().fold(0i32, |total, &d| {
        total.saturating_add(i32::try_from(d).unwrap_or(i32::MAX))
    })
}

/// One strategy per attack category. Unarmed attacks use the melee slot.
pub struct StrategyRegistry {
    melee: Box<dyn AttackStrategy>,
    ranged: Box<dyn AttackStrategy>,
    arcane: Box<dyn AttackStrategy>,
}

impl StrategyRegistry {
    pub fn standard() -> Self {
        Self {
            melee: Box::new(MeleeStrategy),
            ranged: Box::new(RangedStrategy),
            arcane: Box::new(ArcaneStrategy),
        }
    }

    pub fn get(&self, category: AttackCategory) -> &dyn AttackStrategy {
        match category {
            AttackCategory::Melee => self.melee.as_ref(),
            AttackCategory::Ranged => self.ranged.as_ref(),
            AttackCategory::Arcane => self.arcane.as_ref(),
        }
    }

    /// Strategy for the attacker's equipped weapon.
    pub fn for_attacker(&self, attacker: &Combatant) -> &dyn AttackStrategy {
        let category = attacker
            .weapon
            .as_ref()
            .map_or(AttackCategory::Melee, |w| w.category);
        self.get(category)
    }

    /// Replace the strategy for its own category.
    pub fn register(&mut self, strategy: Box<dyn AttackStrategy>) {
        match strategy.category() {
            AttackCategory::Melee => self.melee = strategy,
            AttackCategory::Ranged => self.ranged = strategy,
            AttackCategory::Arcane => self.arcane = strategy,
        }
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
