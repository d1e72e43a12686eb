//! Dice rolling for combat resolution.
//!
//! Every roll the engine makes goes through a [`Randomizer`]. The default
//! implementation, [`SeededDice`], is backed by a ChaCha stream so that two
//! randomizers created from the same seed produce the same sequence of rolls
//! for the same sequence of calls.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of rolling `count` dice with `faces` sides each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRoll {
    /// Individual die results, in the order they were rolled.
    pub dice: Vec<u32>,
    /// Sum of `dice`, wide enough that no face count can overflow it.
    pub total: u64,
    pub count: u32,
    pub faces: u32,
}

impl DiceRoll {
    /// Build a roll from already-rolled die values.
    pub fn from_dice(dice: Vec<u32>, faces: u32) -> Self {
        let total = dice.iter().map(|&d| u64::from(d)).sum();
        let count = dice.len() as u32;
        Self {
            dice,
            total,
            count,
            faces,
        }
    }

    /// An empty roll (no dice, total 0).
    pub fn empty(faces: u32) -> Self {
        Self::from_dice(Vec::new(), faces)
    }

    /// Total as a signed value for coefficient arithmetic, saturating at
    /// `i32::MAX`.
    pub fn total_i32(&self) -> i32 {
        i32::try_from(self.total).unwrap_or(i32::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.dice.is_empty()
    }
}

impl fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dice = self
            .dice
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(" + ");
        write!(f, "{}d{}: [{}] = {}", self.count, self.faces, dice, self.total)
    }
}

/// Source of dice rolls.
///
/// Implementations must return exactly `count` dice, each in `1..=faces`,
/// unless `count` or `faces` is zero, in which case the roll is empty.
pub trait Randomizer {
    fn roll(&mut self, count: u32, faces: u32) -> DiceRoll;

    /// Attack roll (`count` d`faces`, 3d6 by default configuration).
    fn roll_attack(&mut self, count: u32, faces: u32) -> DiceRoll {
        self.roll(count, faces)
    }

    /// Defense roll (2d6 by default configuration).
    fn roll_defense(&mut self, count: u32, faces: u32) -> DiceRoll {
        self.roll(count, faces)
    }

    /// A single initiative die.
    fn roll_initiative(&mut self, faces: u32) -> DiceRoll {
        self.roll(1, faces)
    }
}

impl<R: Randomizer + ?Sized> Randomizer for &mut R {
    fn roll(&mut self, count: u32, faces: u32) -> DiceRoll {
        (**self).roll(count, faces)
    }
}

/// Deterministic randomizer seeded with an integer.
#[derive(Debug, Clone)]
pub struct SeededDice {
    rng: ChaCha8Rng,
}

impl SeededDice {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Seed from the operating system's entropy source.
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Restart the stream from `seed`. Subsequent rolls replay exactly the
    /// sequence a fresh `SeededDice::new(seed)` would produce.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }
}

impl Default for SeededDice {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl Randomizer for SeededDice {
    fn roll(&mut self, count: u32, faces: u32) -> DiceRoll {
        if faces == 0 {
            return DiceRoll::empty(faces);
        }
        let dice = (0..count)
            .map(|_| self.rng.gen_range(1..=faces))
            .collect();
        let roll = DiceRoll::from_dice(dice, faces);
        tracing::trace!(%roll, "dice rolled");
        roll
    }
}
