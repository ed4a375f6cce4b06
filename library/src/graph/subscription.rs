//! Explicit observer registry replacing ad-hoc signal/slot wiring.
//!
//! Subscriptions are keyed by (emitter, event kind, subscriber), so
//! subscribing twice is a no-op and unsubscribing something never
//! subscribed is harmless. Connection-state machines rely on that
//! idempotence to stay symmetric.

use std::collections::HashSet;

use uuid::Uuid;

/// Event categories an emitter can publish.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A cache finished computing a range.
    CacheValidated,
    /// A viewer's marker list changed (add/remove/update).
    MarkerChanged,
}

#[derive(Default)]
pub struct SubscriptionRegistry {
    subs: HashSet<(Uuid, EventKind, Uuid)>,
}

impl SubscriptionRegistry {
    pub fn new() -> SubscriptionRegistry {
        SubscriptionRegistry::default()
    }

    /// Returns false if the subscription already existed.
    pub fn subscribe(&mut self, emitter: Uuid, kind: EventKind, subscriber: Uuid) -> bool {
        self.subs.insert((emitter, kind, subscriber))
    }

    /// Returns false if there was nothing to remove.
    pub fn unsubscribe(&mut self, emitter: Uuid, kind: EventKind, subscriber: Uuid) -> bool {
        self.subs.remove(&(emitter, kind, subscriber))
    }

    pub fn is_subscribed(&self, emitter: Uuid, kind: EventKind, subscriber: Uuid) -> bool {
        self.subs.contains(&(emitter, kind, subscriber))
    }

    pub fn subscribers(&self, emitter: Uuid, kind: EventKind) -> Vec<Uuid> {
        let mut out: Vec<Uuid> = self
            .subs
            .iter()
            .filter(|(e, k, _)| *e == emitter && *k == kind)
            .map(|(_, _, s)| *s)
            .collect();
        out.sort_unstable();
        out
    }

    /// Drop every subscription held by `subscriber`, whatever the emitter.
    pub fn remove_subscriber(&mut self, subscriber: Uuid) {
        self.subs.retain(|(_, _, s)| *s != subscriber);
    }

    /// Drop every subscription published by `emitter` (e.g. when the node
    /// owning it is removed from the graph).
    pub fn remove_emitter(&mut self, emitter: Uuid) {
        self.subs.retain(|(e, _, _)| *e != emitter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_is_idempotent() {
        let mut registry = SubscriptionRegistry::new();
        let (emitter, subscriber) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(registry.subscribe(emitter, EventKind::CacheValidated, subscriber));
        assert!(!registry.subscribe(emitter, EventKind::CacheValidated, subscriber));
        assert_eq!(
            registry.subscribers(emitter, EventKind::CacheValidated),
            vec![subscriber]
        );
    }

    #[test]
    fn unsubscribe_is_symmetric() {
        let mut registry = SubscriptionRegistry::new();
        let (emitter, subscriber) = (Uuid::new_v4(), Uuid::new_v4());
        registry.subscribe(emitter, EventKind::MarkerChanged, subscriber);
        assert!(registry.unsubscribe(emitter, EventKind::MarkerChanged, subscriber));
        assert!(!registry.unsubscribe(emitter, EventKind::MarkerChanged, subscriber));
        assert!(registry.subscribers(emitter, EventKind::MarkerChanged).is_empty());
    }

    #[test]
    fn kinds_are_independent() {
        let mut registry = SubscriptionRegistry::new();
        let (emitter, subscriber) = (Uuid::new_v4(), Uuid::new_v4());
        registry.subscribe(emitter, EventKind::CacheValidated, subscriber);
        assert!(!registry.is_subscribed(emitter, EventKind::MarkerChanged, subscriber));
    }
}
