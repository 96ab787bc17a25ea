//! Error types for the fragments crate.
//!
//! Load and mount failures are reported here and, at the same time, shown
//! inline in the fragment's container. They never reach the message protocol.

use bulbkit_core::ParticipantId;
use thiserror::Error;

use crate::props::FragmentKind;

/// Errors that can occur while loading or mounting a fragment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FragmentError {
    /// No loader is registered for this hosting technology.
    #[error("No loader registered for {0} fragments")]
    NoLoader(FragmentKind),

    /// The fragment was given an empty app id.
    #[error("Fragment app id must not be empty")]
    EmptyAppId,

    /// The fragment speaks a contract version this host cannot understand.
    #[error("Fragment {app_id} uses incompatible contract version {version}")]
    IncompatibleVersion {
        app_id: ParticipantId,
        version: String,
    },

    /// The loader itself failed.
    #[error("Failed to mount {app_id}: {reason}")]
    MountFailed {
        app_id: ParticipantId,
        reason: String,
    },
}

/// Result type alias for fragment operations.
pub type FragmentResult<T> = Result<T, FragmentError>;
