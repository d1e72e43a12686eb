//! Tunable combat rules.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound for `attack_dice` and `defense_dice`.
pub const MAX_DICE: u32 = 100;

/// Upper bound for `die_faces` and `initiative_faces`.
pub const MAX_DIE_FACES: u32 = 1000;

/// Upper bound for `stealth_damage_multiplier`.
pub const MAX_STEALTH_MULTIPLIER: i32 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid combat config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid combat config: {0}")]
    Invalid(String),
}

/// Dice counts, thresholds and limits used by the engine.
///
/// Every field has a default, so a JSON document only needs the values it
/// overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Dice rolled for an attack coefficient.
    pub attack_dice: u32,

    /// Dice rolled for a defense coefficient.
    pub defense_dice: u32,

    /// Faces on attack and defense dice.
    pub die_faces: u32,

    /// Faces on the single initiative die.
    pub initiative_faces: u32,

    /// A difference at or below this value hands the defender a counterattack.
    pub counter_threshold: i32,

    /// Role reversals allowed in one resolution before the exchange is
    /// treated as blocked.
    pub max_counter_chain: u32,

    /// Damage per point of stealth over perception.
    pub stealth_damage_multiplier: i32,

    /// Events retained by the engine's event bus.
    pub event_history_limit: usize,

    /// Rounds an encounter may run before it is called off.
    pub max_rounds: u32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            attack_dice: 3,
            defense_dice: 2,
            die_faces: 6,
            initiative_faces: 10,
            counter_threshold: -3,
            max_counter_chain: 8,
            stealth_damage_multiplier: 2,
            event_history_limit: 100,
            max_rounds: 100,
        }
    }
}

impl CombatConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: CombatConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, faces) in [
            ("die_faces", self.die_faces),
            ("initiative_faces", self.initiative_faces),
        ] {
            if faces == 0 || faces > MAX_DIE_FACES {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be between 1 and {MAX_DIE_FACES}, got {faces}"
                )));
            }
        }
        for (name, dice) in [
            ("attack_dice", self.attack_dice),
            ("defense_dice", self.defense_dice),
        ] {
            if dice > MAX_DICE {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be at most {MAX_DICE}, got {dice}"
                )));
            }
        }
        if !(0..=MAX_STEALTH_MULTIPLIER).contains(&self.stealth_damage_multiplier) {
            return Err(ConfigError::Invalid(format!(
                "stealth_damage_multiplier must be between 0 and {MAX_STEALTH_MULTIPLIER}, got {}",
                self.stealth_damage_multiplier
            )));
        }
        if self.counter_threshold >= 0 {
            return Err(ConfigError::Invalid(format!(
                "counter_threshold must be negative, got {}",
                self.counter_threshold
            )));
        }
        Ok(())
    }

    pub fn with_attack_dice(mut self, dice: u32) -> Self {
        self.attack_dice = dice;
        self
    }

    pub fn with_defense_dice(mut self, dice: u32) -> Self {
        self.defense_dice = dice;
        self
    }

    pub fn with_die_faces(mut self, faces: u32) -> Self {
        self.die_faces = faces;
        self
    }

    pub fn with_counter_threshold(mut self, threshold: i32) -> Self {
        self.counter_threshold = threshold;
        self
    }

    pub fn with_max_counter_chain(mut self, chain: u32) -> Self {
        self.max_counter_chain = chain;
        self
    }

    pub fn with_stealth_damage_multiplier(mut self, multiplier: i32) -> Self {
        self.stealth_damage_multiplier = multiplier;
        self
    }

    pub fn with_event_history_limit(mut self, limit: usize) -> Self {
        self.event_history_limit = limit;
        self
    }

    pub fn with_max_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = rounds;
        self
    }
}
