//! # Bulbkit Core
//!
//! The messaging core shared by the host shell and every fragment:
//! the message contract, the in-process event bus, the participant
//! registry, and the mediator that owns bulb state.

pub mod error;
pub mod event_bus;
pub mod mediator;
pub mod message;
pub mod participant;

pub use error::{Error, EventBusError, MessageError, RegistryError, Result};

// Re-export event bus for convenience
pub use event_bus::{
    event_bus, init_event_bus, DeliveryReport, EventBus, EventBusConfig, MessageHandler,
    Subscription, SubscriptionId,
};

pub use mediator::Mediator;
pub use message::{
    is_compatible_version, BulbPayload, BulbSetRequest, BulbStateChanged, CorrelationId, Message,
    MessageKind, CONTRACT_VERSION,
};
pub use participant::{participant_ids, BulbState, ParticipantId, ParticipantRegistry};
