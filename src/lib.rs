//! # Bulbkit
//!
//! A host shell for micro-frontend fragments that share one boolean "bulb"
//! through an in-process message bus.
//!
//! ## Architecture
//!
//! Bulbkit is organized as a workspace with multiple crates:
//!
//! 1. **bulbkit-core** - Message contract, event bus, participant registry, mediator
//! 2. **bulbkit-fragments** - Fragment adapter contract, mount adapters, loaders
//! 3. **bulbkit-settings** - Configuration files and validation
//! 4. **bulbkit** - Host shell and console binary that integrate all crates
//!
//! ## Flow
//!
//! A fragment emits a `BULB_SET_REQUEST` naming its selected targets. The
//! mediator drops unknown ids, updates its state, and publishes one
//! `BULB_STATE_CHANGED` broadcast. Every fragment named in it, the host
//! included, updates its own view.

pub mod console;
pub mod shell;

pub use bulbkit_core::{
    CorrelationId, EventBus, Mediator, Message, MessageKind, ParticipantId, CONTRACT_VERSION,
};
pub use bulbkit_fragments::{BulbView, Fragment, FragmentKind};
pub use bulbkit_settings::{Config, LogFormat, LoggingSettings};
pub use shell::{HostShell, ShellError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging from the logging settings
///
/// Sets up structured logging with:
/// - `RUST_LOG` support, falling back to the configured level
/// - Pretty or JSON output on stderr, keeping stdout for the console
pub fn init_logging(settings: &LoggingSettings) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(settings.level.to_ascii_lowercase()))?;

    match settings.format {
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .with_line_number(true)
                .pretty();

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()?;
        }
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .json()
                .flatten_event(true);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()?;
        }
    }

    Ok(())
}
