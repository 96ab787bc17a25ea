//! Mediator: the single authority over bulb state
//!
//! The mediator listens for `BULB_SET_REQUEST` messages, applies them to the
//! canonical [`BulbState`], and answers every request with exactly one
//! `BULB_STATE_CHANGED` broadcast carrying the request's correlation id.
//! It never touches presentation; participants (the host included) update
//! their own views from the broadcast.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};

use crate::event_bus::{EventBus, Subscription};
use crate::message::{
    is_compatible_version, BulbSetRequest, BulbStateChanged, Message, MessageKind,
    CONTRACT_VERSION,
};
use crate::participant::{BulbState, ParticipantId, ParticipantRegistry};

/// Owner of the canonical bulb state
pub struct Mediator {
    state: Mutex<BulbState>,
    bus: EventBus,
}

impl Mediator {
    /// Create a mediator with every bulb off
    ///
    /// The mediator does not react to the bus until [`Mediator::connect`] is
    /// called.
    pub fn new(registry: ParticipantRegistry, bus: EventBus) -> Arc<Self> {
        tracing::info!(
            participants = registry.len(),
            "Mediator created for [{}]",
            registry
                .ids()
                .iter()
                .map(ParticipantId::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        );
        Arc::new(Self {
            state: Mutex::new(BulbState::new(registry)),
            bus,
        })
    }

    /// Subscribe the mediator to set requests on its bus
    ///
    /// The handler only holds a weak reference, so dropping the last `Arc`
    /// turns it into a no-op.
    pub fn connect(self: &Arc<Self>) -> Subscription {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.bus
            .subscribe(MessageKind::BulbSetRequest, move |message| {
                let Some(mediator) = weak.upgrade() else {
                    return;
                };
                if let Message::BulbSetRequest(request) = message {
                    mediator.handle_set_request(request);
                }
            })
    }

    /// Apply a set request and publish the resulting broadcast
    ///
    /// Unknown and repeated targets are dropped. An empty surviving set still
    /// produces a broadcast. The state lock is released before publishing, so
    /// subscribers always observe the mutation and may query the mediator.
    pub fn handle_set_request(&self, request: &BulbSetRequest) -> BulbStateChanged {
        if !is_compatible_version(&request.version) {
            tracing::warn!(
                source = %request.source,
                version = %request.version,
                expected = CONTRACT_VERSION,
                "Set request uses an incompatible contract version; applying anyway"
            );
        }

        let on = request.payload.state;
        let targets = {
            let mut state = self.state.lock();
            let targets = state.registry().filter_targets(&request.targets);
            for id in &targets {
                state.set(id, on);
            }
            targets
        };

        let dropped = request.targets.len() - targets.len();
        if dropped > 0 {
            tracing::debug!(
                correlation_id = %request.correlation_id,
                dropped,
                "Ignored unknown or repeated targets"
            );
        }

        tracing::info!(
            source = %request.source,
            correlation_id = %request.correlation_id,
            "Bulb {} for [{}]",
            if on { "on" } else { "off" },
            targets
                .iter()
                .map(ParticipantId::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        );

        let changed = BulbStateChanged {
            version: CONTRACT_VERSION.to_string(),
            targets,
            state: on,
            correlation_id: request.correlation_id.clone(),
        };
        self.bus.publish(Message::BulbStateChanged(changed.clone()));
        changed
    }

    /// Current state of one participant, `None` if unregistered
    pub fn state_of(&self, id: &ParticipantId) -> Option<bool> {
        self.state.lock().get(id)
    }

    /// All participant states in registry order
    pub fn snapshot(&self) -> Vec<(ParticipantId, bool)> {
        self.state.lock().snapshot()
    }

    pub fn registry(&self) -> ParticipantRegistry {
        self.state.lock().registry().clone()
    }

    /// The bus this mediator publishes on
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }
}

impl std::fmt::Debug for Mediator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mediator")
            .field("state", &self.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::CorrelationId;
    use crate::participant::participant_ids;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn setup() -> (EventBus, Arc<Mediator>) {
        let bus = EventBus::new();
        let registry = ParticipantRegistry::new(["host", "mfe1", "mfe2"]).unwrap();
        let mediator = Mediator::new(registry, bus.clone());
        (bus, mediator)
    }

    /// Record every broadcast published on `bus`
    fn capture(bus: &EventBus) -> Arc<Mutex<Vec<BulbStateChanged>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let _ = bus.subscribe(MessageKind::BulbStateChanged, move |m| {
            if let Message::BulbStateChanged(c) = m {
                s.lock().push(c.clone());
            }
        });
        seen
    }

    fn request(targets: &[&str], state: bool, id: &str) -> BulbSetRequest {
        BulbSetRequest::new("host", participant_ids(targets.iter().copied()), state)
            .with_correlation_id(id)
    }

    #[test]
    fn test_valid_targets_are_switched() {
        let (bus, mediator) = setup();
        let seen = capture(&bus);

        mediator.handle_set_request(&request(&["host", "mfe1"], true, "c1"));

        let expected: Vec<(ParticipantId, bool)> = vec![
            ("host".into(), true),
            ("mfe1".into(), true),
            ("mfe2".into(), false),
        ];
        assert_eq!(mediator.snapshot(), expected);
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].targets, participant_ids(["host", "mfe1"]));
        assert!(seen[0].state);
        assert_eq!(seen[0].correlation_id, CorrelationId::from("c1"));
    }

    #[test]
    fn test_unknown_targets_are_dropped() {
        let (bus, mediator) = setup();
        let seen = capture(&bus);

        let changed = mediator.handle_set_request(&request(&["host", "ghost"], true, "c2"));

        assert_eq!(changed.targets, participant_ids(["host"]));
        assert_eq!(mediator.state_of(&"host".into()), Some(true));
        assert_eq!(mediator.state_of(&"mfe1".into()), Some(false));
        assert_eq!(mediator.state_of(&"mfe2".into()), Some(false));
        assert_eq!(mediator.state_of(&"ghost".into()), None);
        assert!(!seen.lock()[0].includes(&"ghost".into()));
    }

    #[test]
    fn test_empty_targets_still_broadcast() {
        let (bus, mediator) = setup();
        let seen = capture(&bus);
        let before = mediator.snapshot();

        mediator.handle_set_request(&request(&[], true, "c3"));

        assert_eq!(mediator.snapshot(), before);
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].targets.is_empty());
        assert!(seen[0].state);
    }

    #[test]
    fn test_only_unknown_targets_still_broadcast() {
        let (bus, mediator) = setup();
        let seen = capture(&bus);

        mediator.handle_set_request(&request(&["ghost", "phantom"], true, "c4"));

        assert!(seen.lock()[0].targets.is_empty());
        assert!(mediator.snapshot().iter().all(|(_, on)| !on));
    }

    #[test]
    fn test_duplicates_collapse_in_first_seen_order() {
        let (_bus, mediator) = setup();
        let changed =
            mediator.handle_set_request(&request(&["mfe2", "host", "mfe2", "host"], true, "c5"));
        assert_eq!(changed.targets, participant_ids(["mfe2", "host"]));
    }

    #[test]
    fn test_handling_is_idempotent() {
        let (_bus, mediator) = setup();
        let req = request(&["mfe1", "mfe2"], true, "c6");

        mediator.handle_set_request(&req);
        let once = mediator.snapshot();
        mediator.handle_set_request(&req);

        assert_eq!(mediator.snapshot(), once);
    }

    #[test]
    fn test_switching_off_leaves_others_alone() {
        let (_bus, mediator) = setup();
        mediator.handle_set_request(&request(&["host", "mfe1", "mfe2"], true, "a"));
        mediator.handle_set_request(&request(&["mfe1"], false, "b"));

        assert_eq!(mediator.state_of(&"host".into()), Some(true));
        assert_eq!(mediator.state_of(&"mfe1".into()), Some(false));
        assert_eq!(mediator.state_of(&"mfe2".into()), Some(true));
    }

    #[test]
    fn test_connected_mediator_reacts_to_bus() {
        let (bus, mediator) = setup();
        let seen = capture(&bus);
        let _sub = mediator.connect();

        bus.emit(request(&["mfe2"], true, "via-bus"));

        assert_eq!(mediator.state_of(&"mfe2".into()), Some(true));
        assert_eq!(seen.lock()[0].correlation_id.as_str(), "via-bus");
    }

    #[test]
    fn test_subscribers_see_state_already_applied() {
        let (bus, mediator) = setup();
        let _sub = mediator.connect();
        let observed = Arc::new(AtomicUsize::new(0));

        let m = mediator.clone();
        let o = observed.clone();
        let _probe = bus.subscribe(MessageKind::BulbStateChanged, move |_| {
            if m.state_of(&"mfe1".into()) == Some(true) {
                o.fetch_add(1, Ordering::SeqCst);
            }
        });

        bus.emit(request(&["mfe1"], true, "causal"));
        assert_eq!(observed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_incompatible_version_is_still_applied() {
        let (_bus, mediator) = setup();
        let req = request(&["host"], true, "v2").with_version("2.0.0");
        mediator.handle_set_request(&req);
        assert_eq!(mediator.state_of(&"host".into()), Some(true));
    }

    #[test]
    fn test_dropped_mediator_stops_reacting() {
        let (bus, mediator) = setup();
        let seen = capture(&bus);
        let sub = mediator.connect();
        drop(mediator);

        bus.emit(request(&["host"], true, "late"));

        assert!(seen.lock().is_empty());
        assert!(sub.unsubscribe());
    }
}
