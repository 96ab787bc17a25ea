//! DOM-mount adapter and the table of live mounts.
//!
//! A DOM-mount fragment exposes a single `mount(container, props)` entry
//! point returning a teardown handle. Mounting again into a container that
//! already holds a fragment unmounts the old one first.

use bulbkit_core::{CorrelationId, ParticipantId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use crate::adapter::{Fragment, FragmentCore};
use crate::container::{BulbView, Container};
use crate::props::MountProps;

/// Fragment attached through a `mount(container, props)` call
#[derive(Debug)]
pub struct MountedFragment {
    core: FragmentCore,
}

impl MountedFragment {
    /// Build the fragment from its props, subscribe, and render once
    pub fn new(container: Arc<dyn Container>, props: MountProps) -> Self {
        let core = FragmentCore::new(container, props.app_id.clone(), props.version, false);
        core.set_bulb_on(props.initial_state.bulb_on);
        core.set_selected_targets(props.initial_targets);
        if let Some(bus) = props.event_bus {
            core.attach_bus(bus);
        }
        core.render();
        tracing::info!(app_id = %props.app_id, "Fragment mounted");
        Self { core }
    }

    pub fn core(&self) -> &FragmentCore {
        &self.core
    }
}

impl Fragment for MountedFragment {
    fn app_id(&self) -> ParticipantId {
        self.core.view().app_id
    }

    fn view(&self) -> BulbView {
        self.core.view()
    }

    fn set_selected_targets(&self, targets: Vec<ParticipantId>) {
        self.core.set_selected_targets(targets);
        self.core.render();
    }

    fn toggle(&self) -> Option<CorrelationId> {
        self.core.toggle()
    }

    fn unmount(&self) {
        if self.core.teardown() {
            tracing::info!(app_id = %self.app_id(), "Fragment unmounted");
        }
    }

    fn is_mounted(&self) -> bool {
        self.core.is_mounted()
    }
}

type Mounts = Mutex<HashMap<String, Arc<dyn Fragment>>>;

/// Live fragments keyed by container id
#[derive(Clone, Default)]
pub struct MountTable {
    mounts: Arc<Mounts>,
}

impl MountTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `fragment` as the occupant of `container_id`
    ///
    /// Any previous occupant is unmounted.
    pub fn insert(&self, container_id: &str, fragment: Arc<dyn Fragment>) -> MountHandle {
        let previous = self
            .mounts
            .lock()
            .insert(container_id.to_string(), Arc::clone(&fragment));
        if let Some(previous) = previous {
            if !Arc::ptr_eq(&previous, &fragment) {
                previous.unmount();
            }
        }
        MountHandle {
            fragment,
            container_id: container_id.to_string(),
            table: Arc::downgrade(&self.mounts),
        }
    }

    /// Unmount whatever occupies `container_id`; false if it was empty
    pub fn unmount(&self, container_id: &str) -> bool {
        let removed = self.mounts.lock().remove(container_id);
        match removed {
            Some(fragment) => {
                fragment.unmount();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, container_id: &str) -> Option<Arc<dyn Fragment>> {
        self.mounts.lock().get(container_id).cloned()
    }

    /// Find the live fragment for a participant
    pub fn find(&self, app_id: &ParticipantId) -> Option<Arc<dyn Fragment>> {
        self.mounts
            .lock()
            .values()
            .find(|f| &f.app_id() == app_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.mounts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.lock().is_empty()
    }

    /// Unmount everything
    pub fn clear(&self) {
        let drained: Vec<_> = self.mounts.lock().drain().map(|(_, f)| f).collect();
        for fragment in drained {
            fragment.unmount();
        }
    }
}

impl std::fmt::Debug for MountTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountTable")
            .field("mounts", &self.len())
            .finish()
    }
}

/// Teardown handle returned by every mount
#[must_use = "keep the handle to unmount the fragment later"]
#[derive(Clone)]
pub struct MountHandle {
    fragment: Arc<dyn Fragment>,
    container_id: String,
    table: Weak<Mounts>,
}

impl MountHandle {
    /// Tear the fragment down and free its container; repeat calls are no-ops
    pub fn unmount(&self) {
        if let Some(mounts) = self.table.upgrade() {
            let mut mounts = mounts.lock();
            let occupied_by_us = mounts
                .get(&self.container_id)
                .is_some_and(|f| Arc::ptr_eq(f, &self.fragment));
            if occupied_by_us {
                mounts.remove(&self.container_id);
            }
        }
        self.fragment.unmount();
    }

    pub fn fragment(&self) -> &Arc<dyn Fragment> {
        &self.fragment
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn is_mounted(&self) -> bool {
        self.fragment.is_mounted()
    }
}

impl std::fmt::Debug for MountHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountHandle")
            .field("app_id", &self.fragment.app_id())
            .field("container_id", &self.container_id)
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

/// Mount a DOM-mount fragment into `container`
///
/// An existing mount in the same container is torn down before the new one
/// renders.
pub fn mount(table: &MountTable, container: Arc<dyn Container>, props: MountProps) -> MountHandle {
    let container_id = container.id().to_string();
    table.unmount(&container_id);
    let fragment: Arc<dyn Fragment> = Arc::new(MountedFragment::new(container, props));
    table.insert(&container_id, fragment)
}
