//! Enemy behaviors.
//!
//! A [`Behavior`] picks what a computer-controlled combatant does on its
//! turn. Behaviors only look at the combatants; they never roll dice or
//! change anything, so the engine stays the single place where rules apply.

use crate::combatant::{Combatant, CombatantId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hit points under which a tactical combatant goes for the kill.
pub const TACTICAL_FINISH_THRESHOLD: i32 = 20;

/// Health ratio under which a defensive combatant stops attacking.
pub const DEFAULT_DEFENSE_THRESHOLD: f32 = 0.3;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BehaviorError {
    #[error("Unknown behavior: {0} (expected aggressive, defensive or tactical)")]
    UnknownBehavior(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Attack(CombatantId),
    Defend,
    /// Nobody left to attack.
    Wait,
}

impl Decision {
    pub fn target(&self) -> Option<CombatantId> {
        match self {
            Decision::Attack(id) => Some(*id),
            Decision::Defend | Decision::Wait => None,
        }
    }
}

pub trait Behavior {
    fn name(&self) -> &'static str;

    /// Choose an action for `actor` against the candidate `targets`.
    ///
    /// Targets that are not fit to fight are ignored.
    fn decide(&self, actor: &Combatant, targets: &[&Combatant]) -> Decision;
}

/// Attacks whoever has the fewest hit points.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggressive;

impl Behavior for Aggressive {
    fn name(&self) -> &'static str {
        "aggressive"
    }

    fn decide(&self, _actor: &Combatant, targets: &[&Combatant]) -> Decision {
        weakest(targets).map_or(Decision::Wait, |t| Decision::Attack(t.id))
    }
}

/// Holds back while badly hurt, otherwise attacks the strongest target.
#[derive(Debug, Clone, Copy)]
pub struct Defensive {
    pub threshold: f32,
}

impl Default for Defensive {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_DEFENSE_THRESHOLD,
        }
    }
}

impl Behavior for Defensive {
    fn name(&self) -> &'static str {
        "defensive"
    }

    fn decide(&self, actor: &Combatant, targets: &[&Combatant]) -> Decision {
        let Some(strongest) = strongest(targets) else {
            return Decision::Wait;
        };
        if actor.hit_points.ratio() < self.threshold {
            Decision::Defend
        } else {
            Decision::Attack(strongest.id)
        }
    }
}

/// Finishes off a nearly dead target, otherwise attacks the strongest.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tactical;

impl Behavior for Tactical {
    fn name(&self) -> &'static str {
        "tactical"
    }

    fn decide(&self, _actor: &Combatant, targets: &[&Combatant]) -> Decision {
        match weakest(targets) {
            None => Decision::Wait,
            Some(weak) if weak.hit_points.current < TACTICAL_FINISH_THRESHOLD => {
                Decision::Attack(weak.id)
            }
            Some(_) => strongest(targets).map_or(Decision::Wait, |t| Decision::Attack(t.id)),
        }
    }
}

/// Look up a behavior by its name, ignoring case.
pub fn behavior_by_name(name: &str) -> Result<Box<dyn Behavior>, BehaviorError> {
    match name.to_lowercase().as_str() {
        "aggressive" => Ok(Box::new(Aggressive)),
        "defensive" => Ok(Box::new(Defensive::default())),
        "tactical" => Ok(Box::new(Tactical)),
        _ => Err(BehaviorError::UnknownBehavior(name.to_string())),
    }
}

pub fn available_behaviors() -> [&'static str; 3] {
    ["aggressive", "defensive", "tactical"]
}

// Ties go to the earlier target.

fn weakest<'a>(targets: &[&'a Combatant]) -> Option<&'a Combatant> {
    targets
        .iter()
        .copied()
        .filter(|t| t.is_fit_to_fight())
        .reduce(|best, t| {
            if t.hit_points.current < best.hit_points.current {
                t
            } else {
                best
            }
        })
}

fn strongest<'a>(targets: &[&'a Combatant]) -> Option<&'a Combatant> {
    targets
        .iter()
        .copied()
        .filter(|t| t.is_fit_to_fight())
        .reduce(|best, t| {
            if t.attributes.strength > best.attributes.strength {
                t
            } else {
                best
            }
        })
}
