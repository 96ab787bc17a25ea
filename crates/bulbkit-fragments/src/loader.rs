//! Fragment loaders
//!
//! A loader knows how to bring up one hosting technology. The
//! [`LoaderRegistry`] picks the loader for a [`FragmentKind`], checks the props
//! against the contract, and records the result in its [`MountTable`]. Any
//! failure is shown inline in the target container instead of the fragment.

use bulbkit_core::is_compatible_version;
use std::collections::HashMap;
use std::sync::Arc;

use crate::adapter::Fragment;
use crate::container::Container;
use crate::element::CustomElementFragment;
use crate::error::{FragmentError, FragmentResult};
use crate::mount::{MountHandle, MountTable, MountedFragment};
use crate::props::{FragmentKind, MountProps};

/// Brings a fragment up inside a container
pub trait FragmentLoader: Send + Sync {
    /// Short name used in log output
    fn name(&self) -> &'static str;

    /// Create and attach the fragment
    fn load(&self, container: Arc<dyn Container>, props: MountProps) -> FragmentResult<Arc<dyn Fragment>>;
}

/// Loads fragments through their `mount(container, props)` entry point
#[derive(Debug, Default, Clone, Copy)]
pub struct DomMountLoader;

impl FragmentLoader for DomMountLoader {
    fn name(&self) -> &'static str {
        "dom-mount"
    }

    fn load(&self, container: Arc<dyn Container>, props: MountProps) -> FragmentResult<Arc<dyn Fragment>> {
        Ok(Arc::new(MountedFragment::new(container, props)))
    }
}

/// Creates the element, connects it, then sets its properties
#[derive(Debug, Default, Clone, Copy)]
pub struct CustomElementLoader;

impl FragmentLoader for CustomElementLoader {
    fn name(&self) -> &'static str {
        "custom-element"
    }

    fn load(&self, container: Arc<dyn Container>, props: MountProps) -> FragmentResult<Arc<dyn Fragment>> {
        Ok(Arc::new(CustomElementFragment::from_props(container, props)))
    }
}

/// Maps each fragment kind to its loader and tracks what is mounted
pub struct LoaderRegistry {
    loaders: HashMap<FragmentKind, Arc<dyn FragmentLoader>>,
    table: MountTable,
}

impl LoaderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            loaders: HashMap::new(),
            table: MountTable::new(),
        }
    }

    /// Registry with the built-in loaders
    ///
    /// The host's own bulb is mounted the same way as a DOM-mount fragment.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register(FragmentKind::Host, DomMountLoader)
            .register(FragmentKind::DomMount, DomMountLoader)
            .register(FragmentKind::CustomElement, CustomElementLoader);
        registry
    }

    /// Register (or replace) the loader for `kind`
    pub fn register<L>(&mut self, kind: FragmentKind, loader: L) -> &mut Self
    where
        L: FragmentLoader + 'static,
    {
        self.loaders.insert(kind, Arc::new(loader));
        self
    }

    pub fn has_loader(&self, kind: FragmentKind) -> bool {
        self.loaders.contains_key(&kind)
    }

    pub fn mounts(&self) -> &MountTable {
        &self.table
    }

    /// Load a fragment of `kind` into `container`
    ///
    /// Whatever already occupies the container is unmounted first. On failure
    /// the error is rendered in the container and returned.
    pub fn load_into(
        &self,
        kind: FragmentKind,
        container: Arc<dyn Container>,
        props: MountProps,
    ) -> FragmentResult<MountHandle> {
        let container_id = container.id().to_string();
        let app_id = props.app_id.clone();

        match self.try_load(kind, Arc::clone(&container), props) {
            Ok(fragment) => {
                tracing::info!(%app_id, %kind, container = %container_id, "Fragment loaded");
                Ok(self.table.insert(&container_id, fragment))
            }
            Err(err) => {
                tracing::error!(%app_id, %kind, container = %container_id, "Fragment load failed: {}", err);
                container.show_error(&err.to_string());
                Err(err)
            }
        }
    }

    fn try_load(
        &self,
        kind: FragmentKind,
        container: Arc<dyn Container>,
        props: MountProps,
    ) -> FragmentResult<Arc<dyn Fragment>> {
        let loader = self
            .loaders
            .get(&kind)
            .cloned()
            .ok_or(FragmentError::NoLoader(kind))?;

        if props.app_id.as_str().is_empty() {
            return Err(FragmentError::EmptyAppId);
        }
        if !is_compatible_version(&props.version) {
            return Err(FragmentError::IncompatibleVersion {
                app_id: props.app_id,
                version: props.version,
            });
        }

        self.table.unmount(container.id());
        tracing::debug!(loader = loader.name(), app_id = %props.app_id, "Loading fragment");
        loader.load(container, props)
    }
}

/// Same as [`LoaderRegistry::new`]; use [`LoaderRegistry::with_defaults`] for the built-in loaders
impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<String> = self.loaders.keys().map(|k| k.to_string()).collect();
        kinds.sort();
        f.debug_struct("LoaderRegistry")
            .field("kinds", &kinds)
            .field("table", &self.table)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::MemoryContainer;
    use bulbkit_core::{EventBus, MessageKind};

    struct BrokenLoader;

    impl FragmentLoader for BrokenLoader {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn load(&self, _container: Arc<dyn Container>, props: MountProps) -> FragmentResult<Arc<dyn Fragment>> {
            Err(FragmentError::MountFailed {
                app_id: props.app_id,
                reason: "remote entry unreachable".to_string(),
            })
        }
    }

    #[test]
    fn test_default_loaders_cover_every_kind() {
        let registry = LoaderRegistry::with_defaults();
        assert!(registry.has_loader(FragmentKind::Host));
        assert!(registry.has_loader(FragmentKind::DomMount));
        assert!(registry.has_loader(FragmentKind::CustomElement));
    }

    #[test]
    fn test_default_registry_is_empty() {
        let registry = LoaderRegistry::default();
        assert!(!registry.has_loader(FragmentKind::Host));
        assert!(!registry.has_loader(FragmentKind::DomMount));
        assert!(!registry.has_loader(FragmentKind::CustomElement));
        assert!(registry.mounts().is_empty());
    }

    #[test]
    fn test_load_custom_element_subscribes() {
        let bus = EventBus::new();
        let registry = LoaderRegistry::with_defaults();
        let container = Arc::new(MemoryContainer::new("mfe3-slot"));

        let handle = registry
            .load_into(
                FragmentKind::CustomElement,
                container.clone(),
                MountProps::new("mfe3").with_bus(bus.clone()),
            )
            .unwrap();

        assert_eq!(handle.fragment().app_id(), "mfe3");
        assert_eq!(bus.subscriber_count_for(MessageKind::BulbStateChanged), 1);
        assert!(container.current().is_some());
        assert_eq!(registry.mounts().len(), 1);
    }

    #[test]
    fn test_missing_loader_is_shown_inline() {
        let registry = LoaderRegistry::new();
        let container = Arc::new(MemoryContainer::new("slot"));

        let err = registry
            .load_into(FragmentKind::DomMount, container.clone(), MountProps::new("mfe1"))
            .unwrap_err();

        assert_eq!(err, FragmentError::NoLoader(FragmentKind::DomMount));
        assert_eq!(
            container.last_error().as_deref(),
            Some("No loader registered for dom-mount fragments")
        );
        assert!(registry.mounts().is_empty());
    }

    #[test]
    fn test_incompatible_version_rejected() {
        let registry = LoaderRegistry::with_defaults();
        let container = Arc::new(MemoryContainer::new("slot"));

        let err = registry
            .load_into(
                FragmentKind::DomMount,
                container.clone(),
                MountProps::new("mfe2").with_version("2.0.0"),
            )
            .unwrap_err();

        assert!(matches!(err, FragmentError::IncompatibleVersion { .. }));
        assert!(container.current().is_none());
        assert_eq!(container.errors().len(), 1);
    }

    #[test]
    fn test_empty_app_id_rejected() {
        let registry = LoaderRegistry::with_defaults();
        let container = Arc::new(MemoryContainer::new("slot"));
        let err = registry
            .load_into(FragmentKind::DomMount, container, MountProps::new(""))
            .unwrap_err();
        assert_eq!(err, FragmentError::EmptyAppId);
    }

    #[test]
    fn test_failed_reload_unmounts_previous() {
        let bus = EventBus::new();
        let mut registry = LoaderRegistry::with_defaults();
        let container = Arc::new(MemoryContainer::new("slot"));

        let first = registry
            .load_into(
                FragmentKind::DomMount,
                container.clone(),
                MountProps::new("mfe1").with_bus(bus.clone()),
            )
            .unwrap();

        registry.register(FragmentKind::DomMount, BrokenLoader);
        let err = registry
            .load_into(
                FragmentKind::DomMount,
                container.clone(),
                MountProps::new("mfe1").with_bus(bus.clone()),
            )
            .unwrap_err();

        assert_eq!(err.to_string(), "Failed to mount mfe1: remote entry unreachable");
        assert!(!first.is_mounted());
        assert_eq!(bus.subscriber_count(), 0);
        assert!(registry.mounts().is_empty());
        assert!(container.current().is_none());
    }
}
