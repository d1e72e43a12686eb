//! Testing utilities for the combat engine.
//!
//! This module provides tools for deterministic tests:
//! - `ScriptedDice` replays queued die faces instead of rolling
//! - Sample combatants with known stats

use crate::combatant::{Attributes, Combatant, Skills};
use crate::dice::{DiceRoll, Randomizer};
use crate::items::{basic_sword, get_weapon, Weapon};
use std::collections::VecDeque;

/// A randomizer that returns scripted die faces in order.
///
/// Each die consumes one queued value, clamped to `1..=faces`. Once the queue
/// is empty every die shows the fallback face (1 unless changed).
#[derive(Debug, Clone)]
pub struct ScriptedDice {
    queue: VecDeque<u32>,
    fallback: u32,
    rolls: usize,
}

impl ScriptedDice {
    pub fn new(values: impl IntoIterator<Item = u32>) -> Self {
        Self {
            queue: values.into_iter().collect(),
            fallback: 1,
            rolls: 0,
        }
    }

    /// Face shown once the script runs out.
    pub fn with_fallback(mut self, face: u32) -> Self {
        self.fallback = face;
        self
    }

    /// Append more faces to the script.
    pub fn push(&mut self, values: impl IntoIterator<Item = u32>) {
        self.queue.extend(values);
    }

    /// Faces not yet consumed.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// Number of `roll` calls made so far.
    pub fn rolls(&self) -> usize {
        self.rolls
    }
}

impl Randomizer for ScriptedDice {
    fn roll(&mut self, count: u32, faces: u32) -> DiceRoll {
        self.rolls += 1;
        if faces == 0 {
            return DiceRoll::empty(faces);
        }
        let dice = (0..count)
            .map(|_| {
                self.queue
                    .pop_front()
                    .unwrap_or(self.fallback)
                    .clamp(1, faces)
            })
            .collect();
        DiceRoll::from_dice(dice, faces)
    }
}

/// Sword fighter: 70 HP, 15 stamina, attack 12 + dice, defense 4 + dice.
pub fn sample_warrior(name: &str) -> Combatant {
    Combatant::new(name)
        .with_attributes(Attributes {
            strength: 8,
            reflexes: 4,
            endurance: 7,
            stamina: 3,
            ..Attributes::default()
        })
        .with_skills(Skills {
            bladed: 10,
            perception: 5,
            ..Skills::default()
        })
        .with_weapon(basic_sword())
}

/// Dagger goblin: 40 HP, 10 stamina, attack 7 + dice, defense 7 + dice.
pub fn sample_goblin(name: &str) -> Combatant {
    let dagger = get_weapon("Dagger").unwrap_or_else(basic_sword);
    Combatant::new(name)
        .with_attributes(Attributes {
            strength: 5,
            reflexes: 7,
            endurance: 4,
            accuracy: 3,
            stamina: 2,
            ..Attributes::default()
        })
        .with_skills(Skills {
            bladed: 8,
            ranged: 5,
            stealth: 10,
            perception: 5,
            ..Skills::default()
        })
        .with_weapon(dagger)
}

/// Stealth specialist: 50 HP, 15 stamina, stealth 15.
pub fn sample_assassin(name: &str) -> Combatant {
    Combatant::new(name)
        .with_attributes(Attributes {
            strength: 6,
            reflexes: 5,
            endurance: 5,
            stamina: 3,
            ..Attributes::default()
        })
        .with_skills(Skills {
            stealth: 15,
            perception: 3,
            ..Skills::default()
        })
        .with_weapon(basic_sword())
}

/// A combatant with only the given attributes and an optional weapon.
pub fn plain_combatant(name: &str, attributes: Attributes, weapon: Option<Weapon>) -> Combatant {
    let combatant = Combatant::new(name).with_attributes(attributes);
    match weapon {
        Some(weapon) => combatant.with_weapon(weapon),
        None => combatant,
    }
}
