//! # Event Bus Module
//!
//! In-process publish/subscribe bus shared by the host shell, the mediator,
//! and every mounted fragment.
//!
//! ## Overview
//!
//! - Publishers emit contract messages without knowing who listens
//! - Subscribers register per message kind and get a handle back
//! - Dispatch is synchronous, in registration order, with per-handler
//!   panic isolation
//! - Async observers can additionally tap all traffic through a broadcast
//!   receiver
//!
//! ## Usage
//!
//! ```rust
//! use bulbkit_core::event_bus::EventBus;
//! use bulbkit_core::message::{BulbSetRequest, MessageKind};
//! use bulbkit_core::participant::participant_ids;
//!
//! let bus = EventBus::new();
//!
//! let subscription = bus.subscribe(MessageKind::BulbSetRequest, |message| {
//!     println!("got {}", message.description());
//! });
//!
//! bus.emit(BulbSetRequest::new("host", participant_ids(["host", "mfe1"]), true));
//!
//! // Unsubscribe when done
//! subscription.unsubscribe();
//! ```

mod bus;

pub use bus::*;
