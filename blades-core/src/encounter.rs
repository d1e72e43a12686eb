//! Full fights driven by enemy behaviors.
//!
//! An [`Encounter`] owns the combatants and runs the turn loop: whoever holds
//! the turn picks a target through its [`Behavior`], the engine resolves the
//! attack, and the turn passes on until one combatant is left standing or the
//! round limit is reached.

use crate::ai::{Behavior, Decision};
use crate::combatant::{Combatant, CombatantId};
use crate::dice::{Randomizer, SeededDice};
use crate::rules::{CombatEngine, CombatError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// How an encounter ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterReport {
    pub winner: Option<String>,
    /// Completed rounds.
    pub rounds: u32,
    /// Attacks resolved, counting a whole counterattack chain once.
    pub exchanges: usize,
    /// Stopped at the round limit with more than one combatant standing.
    pub timed_out: bool,
}

pub struct Encounter<D = SeededDice> {
    engine: CombatEngine<D>,
    combatants: Vec<Combatant>,
    behaviors: Vec<Box<dyn Behavior>>,
}

impl<D: Randomizer> Encounter<D> {
    pub fn new(engine: CombatEngine<D>) -> Self {
        Self {
            engine,
            combatants: Vec::new(),
            behaviors: Vec::new(),
        }
    }

    pub fn with_combatant(mut self, combatant: Combatant, behavior: Box<dyn Behavior>) -> Self {
        self.add(combatant, behavior);
        self
    }

    pub fn add(&mut self, combatant: Combatant, behavior: Box<dyn Behavior>) {
        self.combatants.push(combatant);
        self.behaviors.push(behavior);
    }

    pub fn combatants(&self) -> &[Combatant] {
        &self.combatants
    }

    pub fn combatant(&self, name: &str) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.name == name)
    }

    pub fn engine(&self) -> &CombatEngine<D> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut CombatEngine<D> {
        &mut self.engine
    }

    /// Fight until a single combatant remains or `max_rounds` pass.
    pub fn run(&mut self) -> Result<EncounterReport, CombatError> {
        self.engine.initiate_combat(&mut self.combatants)?;
        let max_rounds = self.engine.config().max_rounds;
        let mut exchanges = 0;
        let mut timed_out = false;

        while !self.engine.check_termination() {
            let state = self.engine.state().ok_or(CombatError::NoActiveCombat)?;
            if state.round >= max_rounds {
                warn!(rounds = state.round, "encounter hit the round limit");
                timed_out = true;
                break;
            }
            if let Some(actor) = state.current_combatant().map(|s| s.id) {
                if self.take_turn(actor)? {
                    exchanges += 1;
                }
            }
            self.engine.advance_turn()?;
        }

        let state = self.engine.state().ok_or(CombatError::NoActiveCombat)?;
        let report = EncounterReport {
            winner: state.winner.clone(),
            rounds: state.round,
            exchanges,
            timed_out,
        };
        info!(winner = ?report.winner, rounds = report.rounds, exchanges, "encounter finished");
        Ok(report)
    }

    /// Play one combatant's turn. Returns whether an attack was resolved.
    fn take_turn(&mut self, actor_id: CombatantId) -> Result<bool, CombatError> {
        let actor_index = self.index_of(actor_id)?;
        let actor = &self.combatants[actor_index];
        if !actor.is_fit_to_fight() {
            debug!(combatant = %actor.name, "skipping turn of unfit combatant");
            return Ok(false);
        }

        let decision = {
            let targets: Vec<&Combatant> = self
                .combatants
                .iter()
                .filter(|c| c.id != actor_id)
                .collect();
            self.behaviors[actor_index].decide(actor, &targets)
        };

        match decision {
            Decision::Attack(target_id) => {
                let target_index = self.index_of(target_id)?;
                let Some((attacker, defender)) =
                    pair_mut(&mut self.combatants, actor_index, target_index)
                else {
                    warn!(combatant = %actor_id, "behavior targeted its own combatant, skipping turn");
                    return Ok(false);
                };
                let result = self.engine.resolve_attack(attacker, defender)?;
                info!("{}", result);
                Ok(true)
            }
            Decision::Defend => {
                debug!(combatant = %actor.name, "holding back");
                Ok(false)
            }
            Decision::Wait => Ok(false),
        }
    }

    fn index_of(&self, id: CombatantId) -> Result<usize, CombatError> {
        self.combatants
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| CombatError::UnknownCombatant(id.to_string()))
    }
}

/// Two distinct elements of a slice, mutably. `None` if `a == b` or either
/// index is out of bounds.
fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> Option<(&mut T, &mut T)> {
    if a == b || a.max(b) >= items.len() {
        return None;
    }
    if a < b {
        let (left, right) = items.split_at_mut(b);
        Some((&mut left[a], &mut right[0]))
    } else {
        let (left, right) = items.split_at_mut(a);
        Some((&mut right[0], &mut left[b]))
    }
}
