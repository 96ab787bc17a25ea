//! Custom-element adapter.
//!
//! A custom-element fragment is created empty, attached to the page, and then
//! configured one property at a time. Setting the event bus (re)subscribes;
//! detaching the element drops the subscription. The target selection is kept
//! sorted, matching how the element lists its checkboxes.

use bulbkit_core::{CorrelationId, EventBus, ParticipantId, CONTRACT_VERSION};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::adapter::{Fragment, FragmentCore};
use crate::container::{BulbView, Container};
use crate::props::{InitialState, MountProps};

/// Fragment configured through property setters
#[derive(Debug)]
pub struct CustomElementFragment {
    core: FragmentCore,
    connected: AtomicBool,
}

impl CustomElementFragment {
    /// Create the element with its built-in defaults
    pub fn new(container: Arc<dyn Container>, default_app_id: impl Into<ParticipantId>) -> Self {
        Self {
            core: FragmentCore::new(
                container,
                default_app_id.into(),
                CONTRACT_VERSION.to_string(),
                true,
            ),
            connected: AtomicBool::new(false),
        }
    }

    /// Create, attach, and configure an element from mount props
    pub fn from_props(container: Arc<dyn Container>, props: MountProps) -> Self {
        let element = Self::new(container, props.app_id.clone());
        element.connected();
        element.set_app_id(props.app_id);
        element.set_version(props.version);
        element.set_initial_state(props.initial_state);
        element.set_initial_targets(props.initial_targets);
        if let Some(bus) = props.event_bus {
            element.set_event_bus(bus);
        }
        element
    }

    /// Element inserted into the page: build the UI once
    pub fn connected(&self) {
        if !self.connected.swap(true, Ordering::SeqCst) {
            self.core.render();
        }
    }

    /// Element removed from the page: stop listening
    pub fn disconnected(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.core.detach();
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Replaces any earlier bus subscription
    pub fn set_event_bus(&self, bus: EventBus) {
        self.core.attach_bus(bus);
        self.rerender();
    }

    /// An empty id falls back to the element's default
    pub fn set_app_id(&self, app_id: ParticipantId) {
        if !app_id.as_str().is_empty() {
            self.core.set_app_id(app_id);
        }
    }

    /// Contract version stamped on emitted requests
    pub fn set_version(&self, version: String) {
        self.core.set_version(version);
    }

    pub fn set_initial_state(&self, state: InitialState) {
        self.core.set_bulb_on(state.bulb_on);
        self.rerender();
    }

    pub fn set_initial_targets(&self, targets: Vec<ParticipantId>) {
        self.core.set_selected_targets(targets);
        self.rerender();
    }

    /// Checkbox change for one target
    pub fn set_target_checked(&self, id: ParticipantId, checked: bool) {
        if checked {
            self.core.select_target(id);
        } else {
            self.core.deselect_target(&id);
        }
    }

    pub fn core(&self) -> &FragmentCore {
        &self.core
    }

    fn rerender(&self) {
        if self.is_connected() {
            self.core.render();
        }
    }
}

impl Fragment for CustomElementFragment {
    fn app_id(&self) -> ParticipantId {
        self.core.view().app_id
    }

    fn view(&self) -> BulbView {
        self.core.view()
    }

    fn set_selected_targets(&self, targets: Vec<ParticipantId>) {
        self.set_initial_targets(targets);
    }

    /// Does nothing until an event bus is set
    fn toggle(&self) -> Option<CorrelationId> {
        if !self.core.has_bus() {
            return None;
        }
        self.core.toggle()
    }

    fn unmount(&self) {
        self.disconnected();
        if self.core.teardown() {
            tracing::info!(app_id = %self.app_id(), "Custom element removed");
        }
    }

    fn is_mounted(&self) -> bool {
        self.core.is_mounted()
    }
}
