//! # Bulbkit Fragments
//!
//! How a UI fragment joins the bulb protocol. Fragments are hosted through
//! one of two adapters: a DOM-mount style `mount(container, props)` entry
//! point, or a custom element configured through property setters. Both share
//! [`FragmentCore`] and are driven through the [`Fragment`] trait.

pub mod adapter;
pub mod container;
pub mod element;
pub mod error;
pub mod loader;
pub mod mount;
pub mod props;

pub use adapter::{Fragment, FragmentCore};
pub use container::{BulbView, Container, MemoryContainer};
pub use element::CustomElementFragment;
pub use error::{FragmentError, FragmentResult};
pub use loader::{CustomElementLoader, DomMountLoader, FragmentLoader, LoaderRegistry};
pub use mount::{mount, MountHandle, MountTable, MountedFragment};
pub use props::{FragmentKind, InitialState, MountProps};
