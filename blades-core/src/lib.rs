//! Ether Blades combat resolution engine.
//!
//! This crate provides:
//! - Opposed attack and defense rolls with stamina drain
//! - Finishing blows, counterattack chains and stealth attacks
//! - Initiative, turn order and win detection
//! - An event bus for narration and logging hooks
//! - Enemy behaviors and an encounter driver for complete fights
//!
//! # Quick Start
//!
//! ```
//! use blades_core::{CombatEngine, testing::{sample_goblin, sample_warrior}};
//!
//! let mut engine = CombatEngine::seeded(42);
//! let mut fighters = [sample_warrior("Aldric"), sample_goblin("Goblin")];
//! engine.initiate_combat(&mut fighters)?;
//!
//! let (aldric, goblin) = fighters.split_at_mut(1);
//! let result = engine.resolve_attack(&mut aldric[0], &mut goblin[0])?;
//! println!("{result}");
//! # Ok::<(), blades_core::CombatError>(())
//! ```

pub mod ai;
pub mod combat;
pub mod combatant;
pub mod config;
pub mod dice;
pub mod encounter;
pub mod events;
pub mod items;
pub mod rules;
pub mod strategy;
pub mod testing;

// Primary public API
pub use ai::{behavior_by_name, Behavior, BehaviorError, Decision};
pub use combat::{AttackOutcome, AttackResult, CombatState, CombatantSnapshot};
pub use combatant::{Attributes, Combatant, CombatantId, Skills};
pub use config::{CombatConfig, ConfigError};
pub use dice::{DiceRoll, Randomizer, SeededDice};
pub use encounter::{Encounter, EncounterReport};
pub use events::{Event, EventBus, EventKind, HandlerError};
pub use items::{Armor, AttackCategory, Weapon, WeaponKind};
pub use rules::{CombatEngine, CombatError};
pub use strategy::{AttackStrategy, StrategyRegistry};
