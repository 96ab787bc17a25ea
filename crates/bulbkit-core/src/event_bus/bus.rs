//! Event Bus implementation.
//!
//! Provides the core EventBus handle and global instance used by the
//! mediator, the host shell, and every mounted fragment.

use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock, Weak};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::{EventBusError, MessageError};
use crate::message::{Message, MessageKind};

/// Unique id of a single handler registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", &self.0.to_string()[..8])
    }
}

/// Type alias for message handler functions
pub type MessageHandler = Arc<dyn Fn(&Message) + Send + Sync>;

/// Configuration for the event bus
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Channel capacity for async receivers.
    pub channel_capacity: usize,
    /// Whether to keep message history.
    pub enable_history: bool,
    /// Maximum number of messages to retain in history.
    pub max_history_size: usize,
    /// How long to retain messages in history.
    pub history_retention: Duration,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            enable_history: false,
            max_history_size: 1000,
            history_retention: Duration::from_secs(300),
        }
    }
}

/// Outcome of one `publish` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Handlers that returned normally.
    pub delivered: usize,
    /// Handlers that panicked and were skipped over.
    pub failed: usize,
}

impl DeliveryReport {
    /// Number of handlers that were invoked
    pub fn invoked(&self) -> usize {
        self.delivered + self.failed
    }
}

#[derive(Debug, Clone)]
struct TimestampedMessage {
    message: Message,
    timestamp: Instant,
}

struct Registration {
    id: SubscriptionId,
    handler: MessageHandler,
}

struct BusInner {
    /// Broadcast channel sender for async observers
    sender: broadcast::Sender<Message>,
    /// Synchronous handlers per kind, in registration order
    handlers: RwLock<HashMap<MessageKind, Vec<Registration>>>,
    history: RwLock<VecDeque<TimestampedMessage>>,
    config: EventBusConfig,
}

impl BusInner {
    fn remove(&self, kind: MessageKind, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write();
        let Some(list) = handlers.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|r| r.id != id);
        let removed = list.len() != before;
        if removed {
            tracing::debug!("Subscription {} to {} removed", id, kind);
        }
        removed
    }

    fn is_registered(&self, kind: MessageKind, id: SubscriptionId) -> bool {
        self.handlers
            .read()
            .get(&kind)
            .is_some_and(|list| list.iter().any(|r| r.id == id))
    }
}

/// Handle returned by `subscribe`; call [`Subscription::unsubscribe`] on teardown
///
/// Dropping the handle does not unsubscribe.
#[must_use = "keep the subscription to be able to unsubscribe later"]
#[derive(Clone)]
pub struct Subscription {
    id: SubscriptionId,
    kind: MessageKind,
    bus: Weak<BusInner>,
}

impl Subscription {
    /// Remove exactly this registration
    ///
    /// Returns true the first time; later calls, or calls after the bus is
    /// gone, are no-ops returning false.
    pub fn unsubscribe(&self) -> bool {
        self.bus
            .upgrade()
            .is_some_and(|bus| bus.remove(self.kind, self.id))
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Whether this registration still receives messages
    pub fn is_active(&self) -> bool {
        self.bus
            .upgrade()
            .is_some_and(|bus| bus.is_registered(self.kind, self.id))
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Shared publish/subscribe bus
///
/// Cloning is cheap and every clone refers to the same set of handlers.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Create a new event bus with default configuration
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// Create a new event bus with custom configuration
    pub fn with_config(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            inner: Arc::new(BusInner {
                sender,
                handlers: RwLock::new(HashMap::new()),
                history: RwLock::new(VecDeque::new()),
                config,
            }),
        }
    }

    /// Deliver a message to every handler registered for its kind
    ///
    /// Handlers run synchronously on the caller's stack, in registration
    /// order. A panicking handler is logged and counted in the report; the
    /// remaining handlers still run. Handlers may publish, subscribe, or
    /// unsubscribe from inside the callback.
    pub fn publish(&self, message: Message) -> DeliveryReport {
        if self.inner.config.enable_history {
            self.add_to_history(&message);
        }

        // Async observers see the message before anything its handlers publish.
        // No async receivers is not an error.
        let _ = self.inner.sender.send(message.clone());

        let kind = message.kind();
        let snapshot: Vec<(SubscriptionId, MessageHandler)> = self
            .inner
            .handlers
            .read()
            .get(&kind)
            .map(|list| {
                list.iter()
                    .map(|r| (r.id, Arc::clone(&r.handler)))
                    .collect()
            })
            .unwrap_or_default();

        let mut report = DeliveryReport::default();
        for (id, handler) in snapshot {
            // An earlier handler in this same dispatch may have removed it.
            if !self.inner.is_registered(kind, id) {
                continue;
            }
            match catch_unwind(AssertUnwindSafe(|| handler(&message))) {
                Ok(()) => report.delivered += 1,
                Err(panic) => {
                    report.failed += 1;
                    tracing::error!(
                        subscription = %id,
                        message_type = %kind,
                        correlation_id = %message.correlation_id(),
                        "Message handler panicked: {}",
                        panic_message(panic.as_ref())
                    );
                }
            }
        }

        tracing::debug!(
            message_type = %kind,
            delivered = report.delivered,
            failed = report.failed,
            "Published {}",
            message.description()
        );

        report
    }

    /// Decode a wire message and publish it
    ///
    /// Nothing is delivered if the JSON is not a contract message.
    pub fn publish_json(&self, json: &str) -> crate::error::Result<DeliveryReport> {
        let message = Message::from_json(json)?;
        Ok(self.publish(message))
    }

    /// Fragment-facing alias for [`EventBus::publish`]
    pub fn emit(&self, message: impl Into<Message>) -> DeliveryReport {
        self.publish(message.into())
    }

    /// Register a synchronous handler for one message kind
    ///
    /// The handler is called on the publishing thread, so it should return
    /// quickly.
    pub fn subscribe<F>(&self, kind: MessageKind, handler: F) -> Subscription
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        self.inner
            .handlers
            .write()
            .entry(kind)
            .or_default()
            .push(Registration {
                id,
                handler: Arc::new(handler),
            });
        tracing::debug!("Subscription {} to {} added", id, kind);
        Subscription {
            id,
            kind,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Register a handler by wire type name
    ///
    /// Fails for an empty name or a name the contract does not define.
    pub fn subscribe_named<F>(&self, message_type: &str, handler: F) -> Result<Subscription, EventBusError>
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        let kind = message_type.parse::<MessageKind>().map_err(|e| match e {
            MessageError::EmptyType => EventBusError::EmptyMessageType,
            _ => EventBusError::UnknownMessageType(message_type.to_string()),
        })?;
        Ok(self.subscribe(kind, handler))
    }

    /// Fragment-facing alias for [`EventBus::subscribe`]
    pub fn on<F>(&self, kind: MessageKind, handler: F) -> Subscription
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.subscribe(kind, handler)
    }

    /// Remove a registration by handle
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        self.inner.remove(subscription.kind, subscription.id)
    }

    /// Get a receiver that observes every published message
    ///
    /// Useful for async contexts that want to watch traffic in a tokio task.
    pub fn receiver(&self) -> broadcast::Receiver<Message> {
        self.inner.sender.subscribe()
    }

    /// Get the number of active subscriptions across all kinds
    pub fn subscriber_count(&self) -> usize {
        self.inner.handlers.read().values().map(Vec::len).sum()
    }

    /// Get the number of active subscriptions for one kind
    pub fn subscriber_count_for(&self, kind: MessageKind) -> usize {
        self.inner.handlers.read().get(&kind).map_or(0, Vec::len)
    }

    /// Get recent message history (if enabled)
    ///
    /// Returns messages since the given instant, or all history if None.
    pub fn history(&self, since: Option<Instant>) -> Vec<Message> {
        if !self.inner.config.enable_history {
            return Vec::new();
        }

        let history = self.inner.history.read();
        match since {
            Some(since) => history
                .iter()
                .filter(|e| e.timestamp >= since)
                .map(|e| e.message.clone())
                .collect(),
            None => history.iter().map(|e| e.message.clone()).collect(),
        }
    }

    /// Clear message history
    pub fn clear_history(&self) {
        self.inner.history.write().clear();
    }

    /// Get the current configuration
    pub fn config(&self) -> &EventBusConfig {
        &self.inner.config
    }

    /// Whether two handles refer to the same bus
    pub fn same_bus(&self, other: &EventBus) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Add a message to history, maintaining size and age limits
    fn add_to_history(&self, message: &Message) {
        let mut history = self.inner.history.write();
        let now = Instant::now();

        history.push_back(TimestampedMessage {
            message: message.clone(),
            timestamp: now,
        });

        let retention = self.inner.config.history_retention;
        while history
            .front()
            .is_some_and(|e| now.duration_since(e.timestamp) > retention)
        {
            history.pop_front();
        }

        while history.len() > self.inner.config.max_history_size {
            history.pop_front();
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .field("config", &self.inner.config)
            .finish()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Global event bus instance
static EVENT_BUS: OnceLock<EventBus> = OnceLock::new();

/// Get or initialize the global event bus
///
/// Lives for the whole process; there is no teardown.
pub fn event_bus() -> &'static EventBus {
    EVENT_BUS.get_or_init(EventBus::new)
}

/// Initialize the global event bus with custom configuration
///
/// Must be called before any calls to `event_bus()`.
pub fn init_event_bus(config: EventBusConfig) -> Result<(), EventBusError> {
    EVENT_BUS
        .set(EventBus::with_config(config))
        .map_err(|_| EventBusError::AlreadyInitialized)
}

/// Convenience macro to publish a message on the global event bus
#[macro_export]
macro_rules! emit {
    ($message:expr) => {
        $crate::event_bus::event_bus().emit($message)
    };
}

/// Convenience macro to subscribe on the global event bus
#[macro_export]
macro_rules! on_message {
    ($kind:expr, $handler:expr) => {
        $crate::event_bus::event_bus().subscribe($kind, $handler)
    };
}
