//! Combat notifications.
//!
//! The engine announces what happens through an [`EventBus`] without knowing
//! who listens. Subscribers register a handler per [`EventKind`]; `publish`
//! invokes them in subscription order. A failing handler is logged and
//! skipped, it never stops delivery to the remaining handlers or the
//! operation that published the event.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// Free-form event payload. Consumers must not assume optional keys exist.
pub type Payload = Map<String, Value>;

/// Error a handler may return.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

type Handler = Box<dyn FnMut(&Event) -> Result<(), HandlerError>>;

/// Default number of events kept in the history.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    CombatStarted,
    AttackResolved,
    AttackBlocked,
    FinishingBlow,
    Counterattack,
    CombatantDied,
    StaminaDepleted,
    TurnAdvanced,
    CombatEnded,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::CombatStarted => "combat_started",
            EventKind::AttackResolved => "attack_resolved",
            EventKind::AttackBlocked => "attack_blocked",
            EventKind::FinishingBlow => "finishing_blow",
            EventKind::Counterattack => "counterattack",
            EventKind::CombatantDied => "combatant_died",
            EventKind::StaminaDepleted => "stamina_depleted",
            EventKind::TurnAdvanced => "turn_advanced",
            EventKind::CombatEnded => "combat_ended",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A published notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub payload: Payload,
    /// Position in the bus's publish order, starting at 1.
    pub sequence: u64,
}

impl Event {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.payload.get(key).and_then(Value::as_i64)
    }
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Outcome of one `publish` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub failed: usize,
    /// The bus was paused and dropped the event.
    pub dropped: bool,
}

struct Subscriber {
    id: SubscriptionId,
    handler: Handler,
}

/// Subscription registry mapping event kinds to ordered handlers.
pub struct EventBus {
    subscribers: HashMap<EventKind, Vec<Subscriber>>,
    history: VecDeque<Event>,
    history_limit: usize,
    next_subscription: u64,
    next_sequence: u64,
    paused: bool,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(history_limit: usize) -> Self {
        Self {
            subscribers: HashMap::new(),
            history: VecDeque::new(),
            history_limit,
            next_subscription: 0,
            next_sequence: 0,
            paused: false,
        }
    }

    /// Register `handler` for `kind`. Handlers run in subscription order.
    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&Event) -> Result<(), HandlerError> + 'static,
    {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.subscribers.entry(kind).or_default().push(Subscriber {
            id,
            handler: Box::new(handler),
        });
        id
    }

    /// Remove a subscription. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        for subscribers in self.subscribers.values_mut() {
            if let Some(pos) = subscribers.iter().position(|s| s.id == id) {
                subscribers.remove(pos);
                return true;
            }
        }
        false
    }

    /// Publish an event to every handler subscribed to `kind`.
    ///
    /// `data` is normally a JSON object; any other value is stored under the
    /// `"value"` key, and `null` becomes an empty payload.
    pub fn publish(&mut self, kind: EventKind, data: Value) -> PublishReport {
        if self.paused {
            tracing::debug!(event = %kind, "event bus paused, dropping event");
            return PublishReport {
                dropped: true,
                ..PublishReport::default()
            };
        }

        self.next_sequence += 1;
        let event = Event {
            kind,
            payload: into_payload(data),
            sequence: self.next_sequence,
        };

        let mut report = PublishReport::default();
        if let Some(subscribers) = self.subscribers.get_mut(&kind) {
            for subscriber in subscribers.iter_mut() {
                match (subscriber.handler)(&event) {
                    Ok(()) => report.delivered += 1,
                    Err(e) => {
                        report.failed += 1;
                        tracing::warn!(
                            event = %kind,
                            subscription = subscriber.id.0,
                            error = %e,
                            "event handler failed"
                        );
                    }
                }
            }
        }

        self.record(event);
        report
    }

    fn record(&mut self, event: Event) {
        if self.history_limit == 0 {
            return;
        }
        self.history.push_back(event);
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
    }

    /// Recorded events, most recent first, optionally filtered by kind.
    pub fn history(&self, kind: Option<EventKind>, limit: Option<usize>) -> Vec<&Event> {
        self.history
            .iter()
            .rev()
            .filter(|e| kind.map_or(true, |k| e.kind == k))
            .take(limit.unwrap_or(usize::MAX))
            .collect()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Stop delivering events. Published events are dropped while paused.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Number of handlers for `kind`, or for all kinds when `None`.
    pub fn subscriber_count(&self, kind: Option<EventKind>) -> usize {
        match kind {
            Some(kind) => self.subscribers.get(&kind).map_or(0, Vec::len),
            None => self.subscribers.values().map(Vec::len).sum(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count(None))
            .field("history", &self.history.len())
            .field("paused", &self.paused)
            .finish()
    }
}

fn into_payload(data: Value) -> Payload {
    match data {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder(bus: &mut EventBus, kind: EventKind) -> Rc<RefCell<Vec<Event>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.subscribe(kind, move |event| {
            sink.borrow_mut().push(event.clone());
            Ok(())
        });
        seen
    }

    #[test]
    fn test_subscribe_and_publish() {
        let mut bus = EventBus::new();
        let seen = recorder(&mut bus, EventKind::Counterattack);

        let report = bus.publish(EventKind::Counterattack, json!({"attacker": "Goblin"}));
        bus.publish(EventKind::AttackBlocked, json!({}));

        assert_eq!(report.delivered, 1);
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].get_str("attacker"), Some("Goblin"));
        assert_eq!(seen[0].sequence, 1);
    }

    #[test]
    fn test_handlers_run_in_order() {
        let mut bus = EventBus::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for n in 0..3 {
            let order = Rc::clone(&order);
            bus.subscribe(EventKind::TurnAdvanced, move |_| {
                order.borrow_mut().push(n);
                Ok(())
            });
        }
        bus.publish(EventKind::TurnAdvanced, Value::Null);
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_failing_handler_does_not_stop_delivery() {
        let mut bus = EventBus::new();
        bus.subscribe(EventKind::CombatantDied, |_| Err("narrator offline".into()));
        let seen = recorder(&mut bus, EventKind::CombatantDied);

        let report = bus.publish(EventKind::CombatantDied, json!({"name": "Goblin"}));

        assert_eq!(report.failed, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let mut bus = EventBus::new();
        let id = bus.subscribe(EventKind::CombatStarted, |_| Ok(()));
        assert_eq!(bus.subscriber_count(Some(EventKind::CombatStarted)), 1);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.subscriber_count(None), 0);
    }

    #[test]
    fn test_history_newest_first_and_bounded() {
        let mut bus = EventBus::with_history_limit(3);
        for n in 0..5 {
            bus.publish(EventKind::TurnAdvanced, json!({ "n": n }));
        }
        bus.publish(EventKind::CombatEnded, json!({}));

        let all = bus.history(None, None);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].kind, EventKind::CombatEnded);
        assert_eq!(all[1].get_i64("n"), Some(4));

        let turns = bus.history(Some(EventKind::TurnAdvanced), Some(1));
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].get_i64("n"), Some(4));

        bus.clear_history();
        assert!(bus.history(None, None).is_empty());
    }

    #[test]
    fn test_pause_drops_events() {
        let mut bus = EventBus::new();
        let seen = recorder(&mut bus, EventKind::AttackResolved);

        bus.pause();
        let report = bus.publish(EventKind::AttackResolved, json!({}));
        assert!(report.dropped);
        assert!(seen.borrow().is_empty());
        assert!(bus.history(None, None).is_empty());

        bus.resume();
        bus.publish(EventKind::AttackResolved, json!({}));
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_non_object_payload() {
        let mut bus = EventBus::new();
        bus.publish(EventKind::CombatEnded, json!("Aldric"));
        let history = bus.history(None, None);
        assert_eq!(history[0].get_str("value"), Some("Aldric"));
    }
}
