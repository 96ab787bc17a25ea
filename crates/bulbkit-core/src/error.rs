//! Error handling for Bulbkit core
//!
//! Provides error types for each layer of the messaging core:
//! - Registry errors (participant id validation)
//! - Message errors (wire decoding/encoding)
//! - Event bus errors (subscription validation)
//!
//! Note that most runtime failures in the protocol are *not* errors: unknown
//! targets are filtered and malformed payloads are coerced. These types cover
//! construction and decoding only.

use thiserror::Error;

/// Participant registry error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Participant id is empty
    #[error("Participant id must not be empty")]
    EmptyId,

    /// Participant id registered twice
    #[error("Duplicate participant id: {id}")]
    DuplicateId {
        /// The id that appeared more than once.
        id: String,
    },

    /// Registry has no participants
    #[error("Participant registry is empty")]
    Empty,
}

/// Message contract error type
#[derive(Error, Debug)]
pub enum MessageError {
    /// Message could not be decoded from or encoded to JSON
    #[error("Invalid message JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Message type name is empty
    #[error("Message type must not be empty")]
    EmptyType,

    /// Message type name is not part of the contract
    #[error("Unknown message type: {name}")]
    UnknownType {
        /// The unrecognized type name.
        name: String,
    },
}

/// Error types for event bus operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EventBusError {
    /// Subscription requested for an empty message type
    #[error("Cannot subscribe to an empty message type")]
    EmptyMessageType,

    /// Subscription requested for a type the contract does not define
    #[error("Cannot subscribe to unknown message type: {0}")]
    UnknownMessageType(String),

    /// The global bus was already initialized
    #[error("Event bus already initialized")]
    AlreadyInitialized,
}

/// Main error type for Bulbkit core
///
/// A unified error type that can represent any error from the core crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Registry error
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Message error
    #[error(transparent)]
    Message(#[from] MessageError),

    /// Event bus error
    #[error(transparent)]
    EventBus(#[from] EventBusError),
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_display() {
        assert_eq!(
            RegistryError::EmptyId.to_string(),
            "Participant id must not be empty"
        );
        let err = RegistryError::DuplicateId {
            id: "mfe1".to_string(),
        };
        assert_eq!(err.to_string(), "Duplicate participant id: mfe1");
    }

    #[test]
    fn test_event_bus_error_display() {
        let err = EventBusError::UnknownMessageType("TARGETS_CHANGED".to_string());
        assert_eq!(
            err.to_string(),
            "Cannot subscribe to unknown message type: TARGETS_CHANGED"
        );
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = RegistryError::Empty.into();
        assert!(matches!(err, Error::Registry(_)));

        let err: Error = MessageError::EmptyType.into();
        assert!(matches!(err, Error::Message(_)));

        let err: Error = EventBusError::EmptyMessageType.into();
        assert!(matches!(err, Error::EventBus(_)));
    }
}
