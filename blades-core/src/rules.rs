//! Combat resolution engine.
//!
//! An exchange runs through a fixed pipeline:
//! 1. Both sides roll: attack coefficient against defense coefficient
//! 2. A positive difference drains the defender's stamina by that amount
//! 3. A defender left without stamina takes a finishing blow to hit points
//! 4. A difference at or below the counter threshold swaps the roles and the
//!    defender strikes back, which may chain further
//! 5. Anything in between is blocked
//!
//! The engine only changes the two combatants it is handed. After every
//! exchange it refreshes their snapshots in the active [`CombatState`] and
//! appends the result to the history.

use crate::combat::{AttackOutcome, AttackResult, CombatState, CombatantSnapshot};
use crate::combatant::Combatant;
use crate::config::{CombatConfig, ConfigError};
use crate::dice::{DiceRoll, Randomizer, SeededDice};
use crate::events::{EventBus, EventKind};
use crate::strategy::{defense_coefficient, StrategyRegistry};
use serde_json::json;
use std::cmp::Reverse;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CombatError {
    #[error("Combat needs at least 2 combatants fit to fight, found {fit}")]
    NotEnoughCombatants { fit: usize },

    #[error("{name} is not fit to fight")]
    UnfitCombatant { name: String },

    #[error("No combat in progress")]
    NoActiveCombat,

    #[error("Unknown combatant: {0}")]
    UnknownCombatant(String),
}

fn ensure_fit(combatant: &Combatant) -> Result<(), CombatError> {
    if combatant.is_fit_to_fight() {
        Ok(())
    } else {
        Err(CombatError::UnfitCombatant {
            name: combatant.name.clone(),
        })
    }
}

/// Resolves attacks between combatants and tracks the fight they belong to.
pub struct CombatEngine<D = SeededDice> {
    config: CombatConfig,
    dice: D,
    strategies: StrategyRegistry,
    events: EventBus,
    state: Option<CombatState>,
}

impl CombatEngine<SeededDice> {
    /// Engine with default rules and a seeded generator.
    pub fn seeded(seed: u64) -> Self {
        Self::new(SeededDice::new(seed))
    }
}

impl<D: Randomizer> CombatEngine<D> {
    pub fn new(dice: D) -> Self {
        Self::with_config(CombatConfig::default(), dice)
    }

    /// Build an engine from `config`, rejecting values that fail
    /// [`CombatConfig::validate`].
    pub fn from_config(config: CombatConfig, dice: D) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_config(config, dice))
    }

    /// Build an engine without validating `config`. Arithmetic saturates, so
    /// out-of-range values skew results but never panic.
    pub fn with_config(config: CombatConfig, dice: D) -> Self {
        let events = EventBus::with_history_limit(config.event_history_limit);
        Self {
            config,
            dice,
            strategies: StrategyRegistry::standard(),
            events,
            state: None,
        }
    }

    pub fn with_strategies(mut self, strategies: StrategyRegistry) -> Self {
        self.strategies = strategies;
        self
    }

    /// Use an existing bus, keeping its subscribers.
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn dice_mut(&mut self) -> &mut D {
        &mut self.dice
    }

    pub fn strategies_mut(&mut self) -> &mut StrategyRegistry {
        &mut self.strategies
    }

    pub fn state(&self) -> Option<&CombatState> {
        self.state.as_ref()
    }

    pub fn state_mut(&mut self) -> Option<&mut CombatState> {
        self.state.as_mut()
    }

    /// Drop the current fight and return its final state.
    pub fn end_combat(&mut self) -> Option<CombatState> {
        self.state.take()
    }

    // ========================================================================
    // Combat lifecycle
    // ========================================================================

    /// Start a fight: restore stamina, roll initiative and fix the turn order.
    ///
    /// Initiative is the stamina attribute plus one initiative die. Ties keep
    /// the order in which the combatants were given. Combatants that are not
    /// fit still join the turn order, recorded as dead.
    pub fn initiate_combat(
        &mut self,
        combatants: &mut [Combatant],
    ) -> Result<&CombatState, CombatError> {
        let fit = combatants.iter().filter(|c| c.is_fit_to_fight()).count();
        if fit < 2 {
            return Err(CombatError::NotEnoughCombatants { fit });
        }

        let mut snapshots = Vec::with_capacity(combatants.len());
        for combatant in combatants.iter_mut() {
            combatant.restore_stamina();
            let roll = self.dice.roll_initiative(self.config.initiative_faces);
            let initiative = i32::from(combatant.attributes.stamina).saturating_add(roll.total_i32());
            debug!(combatant = %combatant.name, %roll, initiative, "initiative rolled");

            let mut snapshot = CombatantSnapshot::capture(combatant, initiative);
            if !combatant.is_fit_to_fight() {
                snapshot.alive = false;
            }
            snapshots.push(snapshot);
        }

        // sort_by_key is stable, so equal initiative keeps input order.
        snapshots.sort_by_key(|s| Reverse(s.initiative));
        let state = CombatState::new(snapshots);

        info!(turn_order = ?state.turn_order, "combat started");
        let names: Vec<&str> = combatants.iter().map(|c| c.name.as_str()).collect();
        self.events.publish(
            EventKind::CombatStarted,
            json!({
                "combatants": names,
                "turn_order": state.turn_order,
                "initiative": state.combatants.iter().map(|c| c.initiative).collect::<Vec<_>>(),
            }),
        );

        let state = self.state.insert(state);
        Ok(&*state)
    }

    /// Move to the next combatant in the turn order.
    pub fn advance_turn(&mut self) -> Result<&CombatState, CombatError> {
        let state = self.state.as_mut().ok_or(CombatError::NoActiveCombat)?;
        state.advance_turn();
        self.events.publish(
            EventKind::TurnAdvanced,
            json!({
                "round": state.round,
                "turn_index": state.turn_index,
                "combatant": state.current_name(),
            }),
        );
        Ok(&*state)
    }

    /// Has the fight ended? True when there is no fight at all.
    ///
    /// The first call that observes the end publishes `CombatEnded`.
    pub fn check_termination(&mut self) -> bool {
        let Some(state) = self.state.as_mut() else {
            return true;
        };
        let was_active = state.active;
        let ended = state.check_termination();
        if ended && was_active {
            info!(winner = ?state.winner, rounds = state.round, "combat ended");
            self.events.publish(
                EventKind::CombatEnded,
                json!({
                    "winner": state.winner,
                    "rounds": state.round,
                    "exchanges": state.history.len(),
                }),
            );
        }
        ended
    }

    /// Refresh a combatant's snapshot after changes made outside the engine.
    pub fn sync(&mut self, combatant: &Combatant) -> Result<(), CombatError> {
        let state = self.state.as_mut().ok_or(CombatError::NoActiveCombat)?;
        if state.sync(combatant) {
            Ok(())
        } else {
            Err(CombatError::UnknownCombatant(combatant.name.clone()))
        }
    }

    // ========================================================================
    // Attack resolution
    // ========================================================================

    /// Resolve one attack, including any counterattacks it provokes.
    ///
    /// Both combatants must be fit to fight. Event handler failures never
    /// surface here.
    pub fn resolve_attack(
        &mut self,
        attacker: &mut Combatant,
        defender: &mut Combatant,
    ) -> Result<AttackResult, CombatError> {
        let result = self.resolve_chain(attacker, defender, 0)?;
        self.finish_exchange(attacker, defender, &result);
        Ok(result)
    }

    /// Attack from hiding: stealth against the defender's perception.
    ///
    /// An unseen attacker skips the defense roll and adds the stealth margin
    /// times the configured multiplier to the damage. A detected attacker
    /// gets counterattacked.
    pub fn stealth_attack(
        &mut self,
        attacker: &mut Combatant,
        defender: &mut Combatant,
    ) -> Result<AttackResult, CombatError> {
        ensure_fit(attacker)?;
        ensure_fit(defender)?;

        let margin = i32::from(attacker.skills.stealth) - i32::from(defender.skills.perception);
        let result = if margin > 0 {
            let roll = self.roll_attack_dice();
            let coefficient = self.attack_coefficient(attacker, &roll);
            let bonus = margin.saturating_mul(self.config.stealth_damage_multiplier);
            let damage = defender.take_damage(coefficient.saturating_add(bonus));

            let mut result = AttackResult::new(AttackOutcome::StealthSuccess, attacker, defender);
            result.attack_coefficient = coefficient;
            result.difference = margin;
            result.attack_dice = roll.dice;
            result.damage = damage;
            result.bonus_damage = bonus;
            result.defender_died = !defender.alive;

            debug!(attacker = %attacker.name, defender = %defender.name, margin, damage, "stealth attack landed");
            self.events.publish(
                EventKind::AttackResolved,
                json!({
                    "attacker": attacker.name,
                    "defender": defender.name,
                    "stealth": true,
                    "margin": margin,
                    "attack_coefficient": coefficient,
                    "bonus_damage": bonus,
                    "damage": damage,
                }),
            );
            if result.defender_died {
                self.announce_death(defender, &attacker.name);
            }
            result
        } else {
            debug!(attacker = %attacker.name, defender = %defender.name, margin, "stealth attack detected");
            self.events.publish(
                EventKind::Counterattack,
                json!({
                    "attacker": defender.name,
                    "defender": attacker.name,
                    "reason": "detected",
                    "margin": margin,
                    "chain": 1,
                }),
            );
            self.resolve_chain(defender, attacker, 1)?
        };

        self.finish_exchange(attacker, defender, &result);
        Ok(result)
    }

    /// Run exchanges until one lands or is blocked.
    ///
    /// `chain` counts role reversals so far. Reversals beyond
    /// `max_counter_chain` are refused and the exchange counts as blocked.
    fn resolve_chain<'c>(
        &mut self,
        mut attacker: &'c mut Combatant,
        mut defender: &'c mut Combatant,
        mut chain: u32,
    ) -> Result<AttackResult, CombatError> {
        loop {
            ensure_fit(attacker)?;
            ensure_fit(defender)?;

            let attack_roll = self.roll_attack_dice();
            let attack = self.attack_coefficient(attacker, &attack_roll);
            let defense_roll = self
                .dice
                .roll_defense(self.config.defense_dice, self.config.die_faces);
            let defense = defense_coefficient(defender, &defense_roll.dice);
            let difference = attack.saturating_sub(defense);

            debug!(
                attacker = %attacker.name,
                defender = %defender.name,
                attack,
                defense,
                difference,
                chain,
                "exchange rolled"
            );
            self.events.publish(
                EventKind::AttackResolved,
                json!({
                    "attacker": attacker.name,
                    "defender": defender.name,
                    "attack_coefficient": attack,
                    "defense_coefficient": defense,
                    "difference": difference,
                    "chain": chain,
                }),
            );

            let mut result = AttackResult::new(AttackOutcome::Blocked, attacker, defender);
            result.attack_coefficient = attack;
            result.defense_coefficient = defense;
            result.difference = difference;
            result.attack_dice = attack_roll.dice;
            result.defense_dice = defense_roll.dice;

            if difference > 0 {
                self.apply_hit(attacker, defender, &mut result);
                return Ok(tag_chain(result, chain));
            }

            if difference <= self.config.counter_threshold {
                if chain < self.config.max_counter_chain {
                    chain += 1;
                    self.events.publish(
                        EventKind::Counterattack,
                        json!({
                            "attacker": defender.name,
                            "defender": attacker.name,
                            "difference": difference,
                            "chain": chain,
                        }),
                    );
                    std::mem::swap(&mut attacker, &mut defender);
                    continue;
                }
                warn!(
                    attacker = %attacker.name,
                    defender = %defender.name,
                    chain,
                    "counterattack chain limit reached, treating exchange as blocked"
                );
            }

            self.events.publish(
                EventKind::AttackBlocked,
                json!({
                    "attacker": attacker.name,
                    "defender": defender.name,
                    "difference": difference,
                }),
            );
            return Ok(tag_chain(result, chain));
        }
    }

    /// Drain stamina by the difference, then finish off an exhausted defender.
    fn apply_hit(&mut self, attacker: &Combatant, defender: &mut Combatant, result: &mut AttackResult) {
        let difference = result.difference;
        defender.spend_stamina(difference);
        result.outcome = AttackOutcome::Success;
        result.stamina_lost = difference;
        result.defender_stamina = defender.stamina.current;

        if !defender.is_out_of_stamina() {
            return;
        }

        self.events.publish(
            EventKind::StaminaDepleted,
            json!({ "combatant": defender.name, "by": attacker.name }),
        );

        let roll = self.roll_attack_dice();
        let coefficient = self.attack_coefficient(attacker, &roll);
        let damage = defender.take_damage(coefficient);

        result.outcome = AttackOutcome::FinishingBlow;
        result.was_finishing_blow = true;
        result.finishing_coefficient = Some(coefficient);
        result.damage = damage;
        result.defender_hit_points = defender.hit_points.current;
        result.defender_stamina = defender.stamina.current;
        result.defender_died = !defender.alive;

        info!(attacker = %attacker.name, defender = %defender.name, damage, "finishing blow");
        self.events.publish(
            EventKind::FinishingBlow,
            json!({
                "attacker": attacker.name,
                "defender": defender.name,
                "coefficient": coefficient,
                "damage": damage,
                "remaining_hit_points": defender.hit_points.current,
            }),
        );
        if result.defender_died {
            self.announce_death(defender, &attacker.name);
        }
    }

    fn announce_death(&mut self, combatant: &Combatant, killer: &str) {
        info!(combatant = %combatant.name, killer, "combatant died");
        self.events.publish(
            EventKind::CombatantDied,
            json!({ "combatant": combatant.name, "killer": killer }),
        );
    }

    /// Refresh both snapshots and record the result in the active fight.
    fn finish_exchange(&mut self, a: &Combatant, b: &Combatant, result: &AttackResult) {
        if let Some(state) = self.state.as_mut() {
            state.sync(a);
            state.sync(b);
            state.record(result.clone());
        }
    }

    fn roll_attack_dice(&mut self) -> DiceRoll {
        self.dice
            .roll_attack(self.config.attack_dice, self.config.die_faces)
    }

    fn attack_coefficient(&self, attacker: &Combatant, roll: &DiceRoll) -> i32 {
        self.strategies
            .for_attacker(attacker)
            .attack_coefficient(attacker, attacker.weapon.as_ref(), &roll.dice)
    }
}

impl Default for CombatEngine<SeededDice> {
    fn default() -> Self {
        Self::new(SeededDice::default())
    }
}

/// Mark a result that landed only after the roles were reversed.
fn tag_chain(mut result: AttackResult, chain: u32) -> AttackResult {
    if chain > 0 {
        result.outcome = AttackOutcome::Counterattack;
        result.was_counterattack = true;
        result.counter_chain = chain;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::{Attributes, Skills};
    use crate::events::Event;
    use crate::items::{basic_sword, get_armor};
    use crate::testing::{plain_combatant, sample_goblin, sample_warrior, ScriptedDice};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn engine(faces: impl IntoIterator<Item = u32>) -> CombatEngine<ScriptedDice> {
        CombatEngine::new(ScriptedDice::new(faces))
    }

    fn record_all(engine: &mut CombatEngine<ScriptedDice>) -> Rc<RefCell<Vec<Event>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        for kind in [
            EventKind::CombatStarted,
            EventKind::AttackResolved,
            EventKind::AttackBlocked,
            EventKind::FinishingBlow,
            EventKind::Counterattack,
            EventKind::CombatantDied,
            EventKind::StaminaDepleted,
            EventKind::TurnAdvanced,
            EventKind::CombatEnded,
        ] {
            let sink = Rc::clone(&seen);
            engine.events_mut().subscribe(kind, move |e| {
                sink.borrow_mut().push(e.clone());
                Ok(())
            });
        }
        seen
    }

    fn kinds(seen: &Rc<RefCell<Vec<Event>>>) -> Vec<EventKind> {
        seen.borrow().iter().map(|e| e.kind).collect()
    }

    /// Unarmed, no skills: attack = 10 + dice.
    fn brute() -> Combatant {
        plain_combatant(
            "Brute",
            Attributes {
                strength: 10,
                endurance: 5,
                stamina: 2,
                ..Attributes::default()
            },
            None,
        )
    }

    /// Defense = 3 + dice, 50 HP, 10 max stamina, chain mail.
    fn scout(endurance: u8) -> Combatant {
        let mut scout = plain_combatant(
            "Scout",
            Attributes {
                reflexes: 3,
                endurance,
                stamina: 2,
                ..Attributes::default()
            },
            None,
        );
        scout.armor = get_armor("Chain Mail");
        scout
    }

    fn novice() -> Combatant {
        plain_combatant(
            "Novice",
            Attributes {
                strength: 1,
                reflexes: 1,
                endurance: 3,
                stamina: 1,
                ..Attributes::default()
            },
            None,
        )
    }

    fn veteran() -> Combatant {
        plain_combatant(
            "Veteran",
            Attributes {
                strength: 5,
                reflexes: 6,
                endurance: 6,
                stamina: 2,
                ..Attributes::default()
            },
            None,
        )
    }

    #[test]
    fn test_initiate_requires_two_fit_combatants() {
        let mut dead = sample_goblin("Goblin");
        dead.take_damage(1000);
        let mut fighters = [sample_warrior("Aldric"), dead];

        let mut engine = engine([]);
        let err = engine.initiate_combat(&mut fighters).unwrap_err();
        assert_eq!(err, CombatError::NotEnoughCombatants { fit: 1 });
        assert!(engine.state().is_none());

        let err = engine.initiate_combat(&mut []).unwrap_err();
        assert_eq!(err, CombatError::NotEnoughCombatants { fit: 0 });
    }

    #[test]
    fn test_initiate_orders_by_initiative_and_restores_stamina() {
        let mut fighters = [sample_warrior("Aldric"), sample_goblin("Goblin")];
        fighters[0].spend_stamina(9);

        // Aldric 3 + 2 = 5, Goblin 2 + 9 = 11
        let mut engine = engine([2, 9]);
        let state = engine.initiate_combat(&mut fighters).unwrap();

        assert_eq!(state.turn_order, vec!["Goblin", "Aldric"]);
        assert_eq!(state.combatants[0].initiative, 11);
        assert_eq!(state.combatants[1].initiative, 5);
        assert!(state.active);
        assert_eq!(state.round, 0);
        assert_eq!(fighters[0].stamina.current, 15);
    }

    #[test]
    fn test_initiative_ties_keep_input_order() {
        let mut fighters = [sample_warrior("Aldric"), sample_goblin("Goblin")];
        // Aldric 3 + 5 = 8, Goblin 2 + 6 = 8
        let mut engine = engine([5, 6]);
        let state = engine.initiate_combat(&mut fighters).unwrap();
        assert_eq!(state.turn_order, vec!["Aldric", "Goblin"]);
    }

    #[test]
    fn test_unfit_combatant_joins_as_dead() {
        let mut dead = sample_goblin("Corpse");
        dead.take_damage(1000);
        let mut fighters = [sample_warrior("Aldric"), sample_goblin("Goblin"), dead];

        let mut engine = engine([1, 1, 10]);
        let state = engine.initiate_combat(&mut fighters).unwrap();
        assert_eq!(state.turn_order.len(), 3);
        assert!(!state.snapshot("Corpse").unwrap().alive);
        assert_eq!(state.alive_count(), 2);
    }

    #[test]
    fn test_successful_attack_drains_stamina() {
        let mut aldric = sample_warrior("Aldric");
        let mut goblin = sample_goblin("Goblin");
        // Attack 12 + 3 = 15, defense 7 + 5 = 12
        let mut engine = engine([1, 1, 1, 3, 2]);

        let result = engine.resolve_attack(&mut aldric, &mut goblin).unwrap();
        assert_eq!(result.outcome, AttackOutcome::Success);
        assert_eq!(result.attack_coefficient, 15);
        assert_eq!(result.defense_coefficient, 12);
        assert_eq!(result.difference, 3);
        assert_eq!(result.stamina_lost, 3);
        assert_eq!(goblin.stamina.current, 7);
        assert_eq!(goblin.hit_points.current, 40);
        assert_eq!(result.weapon, "Short Sword");
        assert!(!result.was_counterattack);
    }

    #[test]
    fn test_attack_blocked_in_neutral_band() {
        let mut aldric = sample_warrior("Aldric");
        let mut goblin = sample_goblin("Goblin");
        // Attack 15, defense 7 + 8 = 15
        let mut engine = engine([1, 1, 1, 4, 4]);
        let seen = record_all(&mut engine);

        let result = engine.resolve_attack(&mut aldric, &mut goblin).unwrap();
        assert_eq!(result.outcome, AttackOutcome::Blocked);
        assert_eq!(result.difference, 0);
        assert_eq!(goblin.stamina.current, 10);
        assert_eq!(aldric.stamina.current, 15);
        assert!(!result.landed());
        assert_eq!(
            kinds(&seen),
            vec![EventKind::AttackResolved, EventKind::AttackBlocked]
        );
    }

    #[test]
    fn test_finishing_blow_when_stamina_runs_out() {
        let mut attacker = brute();
        let mut defender = scout(5);
        defender.stamina.current = 8;
        // Attack 10 + 9 = 19, defense 3 + 6 = 9, finishing 10 + 18 = 28
        let mut engine = engine([3, 3, 3, 2, 4, 6, 6, 6]);
        let seen = record_all(&mut engine);

        let result = engine.resolve_attack(&mut attacker, &mut defender).unwrap();
        assert_eq!(result.outcome, AttackOutcome::FinishingBlow);
        assert_eq!(result.difference, 10);
        assert_eq!(result.stamina_lost, 10);
        assert_eq!(result.defender_stamina, 0);
        assert_eq!(result.finishing_coefficient, Some(28));
        // Chain mail absorbs 3.
        assert_eq!(result.damage, 25);
        assert_eq!(defender.hit_points.current, 25);
        assert!(result.was_finishing_blow);
        assert!(!result.defender_died);
        assert_eq!(
            kinds(&seen),
            vec![
                EventKind::AttackResolved,
                EventKind::StaminaDepleted,
                EventKind::FinishingBlow
            ]
        );
    }

    #[test]
    fn test_finishing_blow_can_kill() {
        let mut attacker = brute();
        let mut defender = scout(1);
        let mut engine = engine([3, 3, 3, 2, 4, 6, 6, 6]);
        let seen = record_all(&mut engine);

        let result = engine.resolve_attack(&mut attacker, &mut defender).unwrap();
        assert!(result.defender_died);
        assert_eq!(result.defender_hit_points, 0);
        assert!(!defender.alive);
        assert!(defender.unconscious);
        assert_eq!(seen.borrow().last().map(|e| e.kind), Some(EventKind::CombatantDied));
        assert_eq!(
            seen.borrow().last().and_then(|e| e.get_str("combatant").map(str::to_owned)),
            Some("Scout".to_string())
        );
    }

    #[test]
    fn test_counterattack_swaps_roles() {
        let mut attacker = novice();
        let mut defender = veteran();
        // Novice 1 + 3 = 4 against Veteran 6 + 3 = 9: counter.
        // Veteran 5 + 6 = 11 against Novice 1 + 10 = 11: blocked.
        let mut engine = engine([1, 1, 1, 1, 2, 2, 2, 2, 5, 5]);
        let seen = record_all(&mut engine);

        let result = engine.resolve_attack(&mut attacker, &mut defender).unwrap();
        assert_eq!(result.outcome, AttackOutcome::Counterattack);
        assert!(result.was_counterattack);
        assert_eq!(result.counter_chain, 1);
        assert_eq!(result.attacker, "Veteran");
        assert_eq!(result.defender, "Novice");
        assert_eq!(result.difference, 0);
        assert_eq!(attacker.stamina.current, 5);
        assert_eq!(defender.stamina.current, 10);
        assert_eq!(
            kinds(&seen),
            vec![
                EventKind::AttackResolved,
                EventKind::Counterattack,
                EventKind::AttackResolved,
                EventKind::AttackBlocked
            ]
        );
    }

    #[test]
    fn test_counter_chain_is_capped() {
        let mut attacker = novice();
        let mut defender = veteran();
        // Both exchanges fall well below the threshold.
        let mut engine = CombatEngine::with_config(
            CombatConfig::default().with_max_counter_chain(1),
            ScriptedDice::new([1, 1, 1, 1, 2, 1, 1, 1, 6, 6]),
        );

        let result = engine.resolve_attack(&mut attacker, &mut defender).unwrap();
        assert_eq!(result.outcome, AttackOutcome::Counterattack);
        assert_eq!(result.counter_chain, 1);
        assert_eq!(result.attacker, "Veteran");
        assert!(result.difference <= -3);
        assert!(!result.landed());
        assert_eq!(engine.events().history(Some(EventKind::Counterattack), None).len(), 1);
    }

    #[test]
    fn test_second_counter_returns_the_blow() {
        let mut attacker = novice();
        let mut defender = veteran();
        // Novice 4 against 9: counter. Veteran 8 against 13: counter again.
        // Novice 19 against 8 drains all 10 stamina, then finishes for 7.
        let mut engine = engine([1, 1, 1, 1, 2, 1, 1, 1, 6, 6, 6, 6, 6, 1, 1, 2, 2, 2]);

        let result = engine.resolve_attack(&mut attacker, &mut defender).unwrap();
        assert_eq!(result.outcome, AttackOutcome::Counterattack);
        assert_eq!(result.counter_chain, 2);
        assert_eq!(result.attacker, "Novice");
        assert_eq!(result.defender, "Veteran");
        assert_eq!(result.difference, 11);
        assert!(result.was_finishing_blow);
        assert_eq!(result.damage, 7);
        assert_eq!(defender.hit_points.current, 53);
        assert_eq!(defender.stamina.current, 0);
        assert_eq!(attacker.hit_points.current, 30);

        let counters = engine.events().history(Some(EventKind::Counterattack), None);
        assert_eq!(counters.len(), 2);
        assert_eq!(counters[0].get_i64("chain"), Some(2));
        assert_eq!(counters[0].get_str("attacker"), Some("Novice"));
    }

    #[test]
    fn test_detected_stealth_can_be_turned_around() {
        let mut attacker = novice();
        attacker.skills.stealth = 2;
        let mut defender = veteran();
        defender.skills.perception = 15;
        // Veteran 8 against Novice 13: counter. Novice 19 against 8 lands.
        let mut engine = engine([1, 1, 1, 6, 6, 6, 6, 6, 1, 1, 2, 2, 2]);

        let result = engine.stealth_attack(&mut attacker, &mut defender).unwrap();
        assert_eq!(result.outcome, AttackOutcome::Counterattack);
        assert_eq!(result.counter_chain, 2);
        assert_eq!(result.attacker, "Novice");
        assert!(result.was_finishing_blow);
        assert_eq!(defender.hit_points.current, 53);
        assert_eq!(attacker.stamina.current, 5);
    }

    #[test]
    fn test_huge_config_values_saturate() {
        let config = CombatConfig::default()
            .with_die_faces(u32::MAX)
            .with_stealth_damage_multiplier(i32::MAX);
        assert!(CombatEngine::from_config(config.clone(), SeededDice::new(5)).is_err());

        let mut engine = CombatEngine::with_config(config, SeededDice::new(5));
        let mut aldric = sample_warrior("Aldric");
        let mut goblin = sample_goblin("Goblin");
        engine.resolve_attack(&mut aldric, &mut goblin).unwrap();

        let mut shade = sample_warrior("Shade");
        shade.skills.stealth = 20;
        let mut guard = sample_warrior("Guard");
        let result = engine.stealth_attack(&mut shade, &mut guard).unwrap();
        assert_eq!(result.bonus_damage, i32::MAX);
        assert!(result.defender_died);
        assert_eq!(guard.hit_points.current, 0);
    }

    #[test]
    fn test_from_config_accepts_valid_config() {
        let config = CombatConfig::default().with_max_counter_chain(2);
        let engine = CombatEngine::from_config(config, ScriptedDice::new([])).unwrap();
        assert_eq!(engine.config().max_counter_chain, 2);
    }

    #[test]
    fn test_unfit_participant_is_rejected() {
        let mut aldric = sample_warrior("Aldric");
        let mut goblin = sample_goblin("Goblin");
        goblin.take_damage(1000);
        let mut engine = engine([]);

        let err = engine.resolve_attack(&mut aldric, &mut goblin).unwrap_err();
        assert_eq!(
            err,
            CombatError::UnfitCombatant {
                name: "Goblin".into()
            }
        );
        let err = engine.stealth_attack(&mut goblin, &mut aldric).unwrap_err();
        assert!(matches!(err, CombatError::UnfitCombatant { .. }));
    }

    #[test]
    fn test_stealth_success_adds_bonus_damage() {
        let mut shade = Combatant::new("Shade")
            .with_attributes(Attributes {
                strength: 6,
                endurance: 5,
                stamina: 3,
                ..Attributes::default()
            })
            .with_skills(Skills {
                stealth: 15,
                ..Skills::default()
            })
            .with_weapon(basic_sword());
        let mut guard = Combatant::new("Guard")
            .with_attributes(Attributes {
                endurance: 5,
                stamina: 2,
                ..Attributes::default()
            })
            .with_skills(Skills {
                perception: 2,
                ..Skills::default()
            });
        // 6 strength + 12 dice + 2 sword = 20, bonus (15 - 2) * 2 = 26
        let mut engine = engine([3, 4, 5]);

        let result = engine.stealth_attack(&mut shade, &mut guard).unwrap();
        assert_eq!(result.outcome, AttackOutcome::StealthSuccess);
        assert_eq!(result.attack_coefficient, 20);
        assert_eq!(result.bonus_damage, 26);
        assert_eq!(result.damage, 46);
        assert_eq!(guard.hit_points.current, 4);
        assert_eq!(guard.stamina.current, 10);
        assert!(result.defense_dice.is_empty());
    }

    #[test]
    fn test_stealth_detected_gives_counterattack() {
        let mut attacker = novice();
        attacker.skills.stealth = 2;
        let mut defender = veteran();
        defender.skills.perception = 15;
        // Veteran 5 + 18 = 23 against Novice 1 + 2 = 3, then 5 + 3 = 8 finishing.
        let mut engine = engine([6, 6, 6, 1, 1, 1, 1, 1]);

        let result = engine.stealth_attack(&mut attacker, &mut defender).unwrap();
        assert_eq!(result.outcome, AttackOutcome::Counterattack);
        assert!(result.was_counterattack);
        assert!(result.was_finishing_blow);
        assert_eq!(result.attacker, "Veteran");
        assert_eq!(result.damage, 8);
        assert_eq!(attacker.hit_points.current, 22);
        assert_eq!(attacker.stamina.current, 0);
    }

    #[test]
    fn test_failing_subscriber_does_not_abort_resolution() {
        let mut aldric = sample_warrior("Aldric");
        let mut goblin = sample_goblin("Goblin");
        let mut engine = engine([1, 1, 1, 3, 2]);
        engine
            .events_mut()
            .subscribe(EventKind::AttackResolved, |_| Err("log sink full".into()));

        let result = engine.resolve_attack(&mut aldric, &mut goblin).unwrap();
        assert_eq!(result.outcome, AttackOutcome::Success);
        assert_eq!(goblin.stamina.current, 7);
    }

    #[test]
    fn test_exchange_syncs_state_and_history() {
        let mut fighters = [brute(), scout(1)];
        let mut engine = engine([10, 1, 3, 3, 3, 2, 4, 6, 6, 6]);
        let seen = record_all(&mut engine);
        engine.initiate_combat(&mut fighters).unwrap();

        let (left, right) = fighters.split_at_mut(1);
        let result = engine.resolve_attack(&mut left[0], &mut right[0]).unwrap();
        assert!(result.defender_died);

        let state = engine.state().unwrap();
        assert_eq!(state.history.len(), 1);
        let scout_snapshot = state.snapshot("Scout").unwrap();
        assert!(!scout_snapshot.alive);
        assert_eq!(scout_snapshot.hit_points, 0);

        assert!(engine.check_termination());
        assert!(engine.check_termination());
        let state = engine.state().unwrap();
        assert!(!state.active);
        assert_eq!(state.winner.as_deref(), Some("Brute"));
        assert_eq!(
            engine.events().history(Some(EventKind::CombatEnded), None).len(),
            1
        );
        assert_eq!(seen.borrow()[0].kind, EventKind::CombatStarted);
    }

    #[test]
    fn test_advance_turn() {
        let mut engine = engine([2, 9]);
        assert_eq!(engine.advance_turn().unwrap_err(), CombatError::NoActiveCombat);
        assert!(engine.check_termination());

        let mut fighters = [sample_warrior("Aldric"), sample_goblin("Goblin")];
        engine.initiate_combat(&mut fighters).unwrap();
        assert!(!engine.check_termination());

        let state = engine.advance_turn().unwrap();
        assert_eq!(state.current_name(), Some("Aldric"));
        assert_eq!(state.round, 0);
        let state = engine.advance_turn().unwrap();
        assert_eq!(state.current_name(), Some("Goblin"));
        assert_eq!(state.round, 1);

        let turns = engine.events().history(Some(EventKind::TurnAdvanced), None);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].get_i64("round"), Some(1));
    }

    #[test]
    fn test_sync_unknown_combatant() {
        let mut engine = engine([1, 1]);
        let stranger = sample_goblin("Stranger");
        assert_eq!(engine.sync(&stranger).unwrap_err(), CombatError::NoActiveCombat);

        let mut fighters = [sample_warrior("Aldric"), sample_goblin("Goblin")];
        engine.initiate_combat(&mut fighters).unwrap();
        assert_eq!(
            engine.sync(&stranger).unwrap_err(),
            CombatError::UnknownCombatant("Stranger".into())
        );
        fighters[0].take_damage(5);
        assert!(engine.sync(&fighters[0]).is_ok());
        assert_eq!(engine.state().unwrap().snapshot("Aldric").unwrap().hit_points, 65);
    }

    #[test]
    fn test_seeded_engines_agree() {
        let fighters = [sample_warrior("Aldric"), sample_goblin("Goblin")];
        let run = |seed: u64| {
            let mut engine = CombatEngine::seeded(seed);
            let mut fighters = fighters.clone();
            engine.initiate_combat(&mut fighters).unwrap();
            let mut results = Vec::new();
            for _ in 0..10 {
                let (left, right) = fighters.split_at_mut(1);
                match engine.resolve_attack(&mut left[0], &mut right[0]) {
                    Ok(result) => results.push(result),
                    Err(_) => break,
                }
            }
            results
        };
        assert_eq!(run(42), run(42));
    }
}
