//! Combat state and attack results.

use crate::combatant::{Combatant, CombatantId};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Attack results
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackOutcome {
    /// The defender lost stamina.
    Success,
    /// No effect on either side.
    Blocked,
    /// The defender ran out of stamina and took an unopposed hit.
    FinishingBlow,
    /// The defender turned the exchange around; see the nested flags.
    Counterattack,
    StealthSuccess,
    /// Reserved for callers that record aborted attacks. The engine never
    /// produces it; precondition failures return a `CombatError` instead.
    Failure,
}

impl AttackOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            AttackOutcome::Success => "success",
            AttackOutcome::Blocked => "blocked",
            AttackOutcome::FinishingBlow => "finishing_blow",
            AttackOutcome::Counterattack => "counterattack",
            AttackOutcome::StealthSuccess => "stealth_success",
            AttackOutcome::Failure => "failure",
        }
    }
}

impl fmt::Display for AttackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Everything that happened in one resolved exchange.
///
/// For a counterattack, `attacker` and `defender` describe the exchange that
/// actually landed, so the roles are swapped relative to the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackResult {
    pub outcome: AttackOutcome,
    pub attacker: String,
    pub attacker_id: CombatantId,
    pub defender: String,
    pub defender_id: CombatantId,
    pub attack_coefficient: i32,
    pub defense_coefficient: i32,
    /// `attack_coefficient - defense_coefficient`, or the stealth margin.
    pub difference: i32,
    pub attack_dice: Vec<u32>,
    pub defense_dice: Vec<u32>,
    /// Coefficient of the follow-up strike when a finishing blow landed.
    pub finishing_coefficient: Option<i32>,
    /// Damage that got past the defender's armor.
    pub damage: i32,
    /// Stealth bonus included in `damage` before armor.
    pub bonus_damage: i32,
    pub stamina_lost: i32,
    pub defender_hit_points: i32,
    pub defender_stamina: i32,
    pub defender_died: bool,
    pub was_finishing_blow: bool,
    pub was_counterattack: bool,
    /// Number of role reversals before this exchange landed.
    pub counter_chain: u32,
    pub weapon: String,
}

impl AttackResult {
    /// A result with no effect yet, filled in by the engine.
    pub(crate) fn new(outcome: AttackOutcome, attacker: &Combatant, defender: &Combatant) -> Self {
        Self {
            outcome,
            attacker: attacker.name.clone(),
            attacker_id: attacker.id,
            defender: defender.name.clone(),
            defender_id: defender.id,
            attack_coefficient: 0,
            defense_coefficient: 0,
            difference: 0,
            attack_dice: Vec::new(),
            defense_dice: Vec::new(),
            finishing_coefficient: None,
            damage: 0,
            bonus_damage: 0,
            stamina_lost: 0,
            defender_hit_points: defender.hit_points.current,
            defender_stamina: defender.stamina.current,
            defender_died: false,
            was_finishing_blow: false,
            was_counterattack: false,
            counter_chain: 0,
            weapon: attacker.weapon_name(),
        }
    }

    /// Did the defender lose hit points or stamina?
    pub fn landed(&self) -> bool {
        self.damage > 0 || self.stamina_lost > 0
    }
}

impl fmt::Display for AttackResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            AttackOutcome::Success => write!(
                f,
                "{} drains {} stamina from {}",
                self.attacker, self.stamina_lost, self.defender
            ),
            AttackOutcome::Blocked => write!(f, "{} blocks {}", self.defender, self.attacker),
            AttackOutcome::FinishingBlow => write!(
                f,
                "{} lands a finishing blow on {} for {} damage",
                self.attacker, self.defender, self.damage
            ),
            AttackOutcome::Counterattack => {
                write!(f, "{} counterattacks {}", self.attacker, self.defender)?;
                if self.was_finishing_blow {
                    write!(f, " with a finishing blow for {} damage", self.damage)
                } else if self.stamina_lost > 0 {
                    write!(f, " draining {} stamina", self.stamina_lost)
                } else {
                    write!(f, " but is blocked")
                }
            }
            AttackOutcome::StealthSuccess => write!(
                f,
                "{} strikes {} from the shadows for {} damage",
                self.attacker, self.defender, self.damage
            ),
            AttackOutcome::Failure => write!(f, "{}'s attack fails", self.attacker),
        }
    }
}

// ============================================================================
// Combat state
// ============================================================================

/// Point-in-time copy of a combatant, kept for turn order and win checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantSnapshot {
    pub id: CombatantId,
    pub name: String,
    pub hit_points: i32,
    pub max_hit_points: i32,
    pub stamina: i32,
    pub max_stamina: i32,
    pub alive: bool,
    pub unconscious: bool,
    pub initiative: i32,
}

impl CombatantSnapshot {
    pub fn capture(combatant: &Combatant, initiative: i32) -> Self {
        Self {
            id: combatant.id,
            name: combatant.name.clone(),
            hit_points: combatant.hit_points.current,
            max_hit_points: combatant.hit_points.maximum,
            stamina: combatant.stamina.current,
            max_stamina: combatant.stamina.maximum,
            alive: combatant.alive,
            unconscious: combatant.unconscious,
            initiative,
        }
    }

    /// Copy the live values from `combatant`, keeping the initiative.
    pub fn refresh(&mut self, combatant: &Combatant) {
        *self = Self::capture(combatant, self.initiative);
    }

    pub fn health_percent(&self) -> f32 {
        percent(self.hit_points, self.max_hit_points)
    }

    pub fn stamina_percent(&self) -> f32 {
        percent(self.stamina, self.max_stamina)
    }
}

fn percent(current: i32, maximum: i32) -> f32 {
    if maximum <= 0 {
        return 0.0;
    }
    current as f32 / maximum as f32 * 100.0
}

/// Turn order, snapshots and history for one fight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatState {
    /// Completed passes through the turn order.
    pub round: u32,
    /// Snapshots in initiative order.
    pub combatants: Vec<CombatantSnapshot>,
    pub turn_order: Vec<String>,
    pub turn_index: usize,
    pub active: bool,
    pub winner: Option<String>,
    pub history: Vec<AttackResult>,
}

impl CombatState {
    /// Build the state from snapshots already sorted by initiative.
    pub fn new(combatants: Vec<CombatantSnapshot>) -> Self {
        let turn_order = combatants.iter().map(|c| c.name.clone()).collect();
        Self {
            round: 0,
            combatants,
            turn_order,
            turn_index: 0,
            active: true,
            winner: None,
            history: Vec::new(),
        }
    }

    pub fn current_combatant(&self) -> Option<&CombatantSnapshot> {
        self.combatants.get(self.turn_index)
    }

    pub fn current_name(&self) -> Option<&str> {
        self.turn_order.get(self.turn_index).map(String::as_str)
    }

    /// Move to the next combatant, starting a new round after the last one.
    pub fn advance_turn(&mut self) {
        if self.turn_order.is_empty() {
            return;
        }
        self.turn_index = (self.turn_index + 1) % self.turn_order.len();
        if self.turn_index == 0 {
            self.round += 1;
        }
    }

    pub fn snapshot(&self, name: &str) -> Option<&CombatantSnapshot> {
        self.combatants.iter().find(|c| c.name == name)
    }

    pub fn snapshot_by_id(&self, id: CombatantId) -> Option<&CombatantSnapshot> {
        self.combatants.iter().find(|c| c.id == id)
    }

    /// Refresh the snapshot of `combatant` from its live values.
    ///
    /// Returns `false` if the combatant is not part of this fight.
    pub fn sync(&mut self, combatant: &Combatant) -> bool {
        match self.combatants.iter_mut().find(|c| c.id == combatant.id) {
            Some(snapshot) => {
                snapshot.refresh(combatant);
                true
            }
            None => false,
        }
    }

    pub fn record(&mut self, result: AttackResult) {
        self.history.push(result);
    }

    pub fn alive_count(&self) -> usize {
        self.combatants.iter().filter(|c| c.alive).count()
    }

    /// End the fight once at most one combatant is alive.
    ///
    /// Sets the winner to the sole survivor, if any. Calling it again after
    /// the fight ended returns `true` and changes nothing.
    pub fn check_termination(&mut self) -> bool {
        let mut survivors = self.combatants.iter().filter(|c| c.alive);
        let first = survivors.next();
        if survivors.next().is_some() {
            return false;
        }
        self.active = false;
        self.winner = first.map(|c| c.name.clone());
        true
    }
}

impl fmt::Display for CombatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Round {} - turn of {}",
            self.round,
            self.current_name().unwrap_or("nobody")
        )?;
        for c in &self.combatants {
            if c.alive {
                writeln!(
                    f,
                    "  {}: {}/{} HP, {}/{} stamina",
                    c.name, c.hit_points, c.max_hit_points, c.stamina, c.max_stamina
                )?;
            } else {
                writeln!(f, "  {}: dead", c.name)?;
            }
        }
        Ok(())
    }
}
