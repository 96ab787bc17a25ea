//! Fragment adapter contract
//!
//! Every fragment, whatever technology renders it, joins the protocol the same
//! way: it emits a `BULB_SET_REQUEST` when toggled and follows
//! `BULB_STATE_CHANGED` broadcasts that name it. [`FragmentCore`] implements
//! that behaviour once; the adapter variants only differ in how they are
//! configured and attached.

use bulbkit_core::{
    BulbSetRequest, BulbStateChanged, CorrelationId, EventBus, Message, MessageKind,
    ParticipantId, Subscription,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::container::{BulbView, Container};

/// Behaviour shared by every mounted fragment
pub trait Fragment: Send + Sync {
    fn app_id(&self) -> ParticipantId;

    /// Current local view
    fn view(&self) -> BulbView;

    fn bulb_on(&self) -> bool {
        self.view().bulb_on
    }

    fn selected_targets(&self) -> Vec<ParticipantId> {
        self.view().selected_targets
    }

    /// Replace the broadcast target selection
    fn set_selected_targets(&self, targets: Vec<ParticipantId>);

    /// User toggle: request the negated state for the selected targets
    ///
    /// Returns the request's correlation id, or `None` if nothing was emitted.
    fn toggle(&self) -> Option<CorrelationId>;

    /// Tear the fragment down; safe to call repeatedly
    fn unmount(&self);

    fn is_mounted(&self) -> bool;
}

struct Shared {
    view: Mutex<BulbView>,
    container: Arc<dyn Container>,
    sort_selection: bool,
}

impl Shared {
    fn render(&self) {
        let view = self.view.lock().clone();
        self.container.render(&view);
    }

    fn apply(&self, changed: &BulbStateChanged) {
        {
            let mut view = self.view.lock();
            if !changed.includes(&view.app_id) {
                return;
            }
            view.bulb_on = changed.state;
        }
        tracing::debug!(
            correlation_id = %changed.correlation_id,
            "Fragment bulb set to {}",
            changed.state
        );
        self.render();
    }
}

/// Protocol logic shared by all adapter variants
pub struct FragmentCore {
    shared: Arc<Shared>,
    bus: Mutex<Option<EventBus>>,
    subscription: Mutex<Option<Subscription>>,
    mounted: AtomicBool,
}

impl FragmentCore {
    /// Create a detached core targeting only itself with the bulb off
    ///
    /// With `sort_selection` the target selection is kept in sorted order.
    pub fn new(container: Arc<dyn Container>, app_id: ParticipantId, version: String, sort_selection: bool) -> Self {
        let view = BulbView {
            selected_targets: vec![app_id.clone()],
            app_id,
            version,
            bulb_on: false,
            standalone: true,
        };
        Self {
            shared: Arc::new(Shared {
                view: Mutex::new(view),
                container,
                sort_selection,
            }),
            bus: Mutex::new(None),
            subscription: Mutex::new(None),
            mounted: AtomicBool::new(true),
        }
    }

    /// Subscribe to broadcasts on `bus`, dropping any previous subscription
    pub fn attach_bus(&self, bus: EventBus) {
        self.release_subscription();

        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        let subscription = bus.on(MessageKind::BulbStateChanged, move |message| {
            let Some(shared) = shared.upgrade() else {
                return;
            };
            if let Message::BulbStateChanged(changed) = message {
                shared.apply(changed);
            }
        });

        *self.subscription.lock() = Some(subscription);
        *self.bus.lock() = Some(bus);
        self.shared.view.lock().standalone = false;
    }

    pub fn has_bus(&self) -> bool {
        self.bus.lock().is_some()
    }

    pub fn set_app_id(&self, app_id: ParticipantId) {
        self.shared.view.lock().app_id = app_id;
    }

    pub fn set_version(&self, version: String) {
        self.shared.view.lock().version = version;
    }

    pub fn set_bulb_on(&self, on: bool) {
        self.shared.view.lock().bulb_on = on;
    }

    pub fn set_selected_targets(&self, mut targets: Vec<ParticipantId>) {
        if self.shared.sort_selection {
            targets.sort();
        }
        let mut seen = HashSet::new();
        targets.retain(|t| seen.insert(t.clone()));
        self.shared.view.lock().selected_targets = targets;
    }

    /// Add one target to the selection if missing
    pub fn select_target(&self, id: ParticipantId) {
        let mut view = self.shared.view.lock();
        if !view.selected_targets.contains(&id) {
            view.selected_targets.push(id);
            if self.shared.sort_selection {
                view.selected_targets.sort();
            }
        }
    }

    pub fn deselect_target(&self, id: &ParticipantId) {
        self.shared
            .view
            .lock()
            .selected_targets
            .retain(|t| t != id);
    }

    pub fn view(&self) -> BulbView {
        self.shared.view.lock().clone()
    }

    pub fn render(&self) {
        if self.is_mounted() {
            self.shared.render();
        }
    }

    /// Emit a request for the negated state
    ///
    /// Without a bus the fragment runs standalone and flips its own bulb.
    /// The local bulb otherwise only changes when the broadcast names it.
    pub fn toggle(&self) -> Option<CorrelationId> {
        if !self.is_mounted() {
            return None;
        }

        let (app_id, version, next, targets) = {
            let view = self.shared.view.lock();
            (
                view.app_id.clone(),
                view.version.clone(),
                !view.bulb_on,
                view.selected_targets.clone(),
            )
        };

        let bus = self.bus.lock().clone();
        match bus {
            Some(bus) => {
                let request = BulbSetRequest::new(app_id, targets, next).with_version(version);
                let correlation_id = request.correlation_id.clone();
                bus.emit(request);
                Some(correlation_id)
            }
            None => {
                self.set_bulb_on(next);
                self.shared.render();
                None
            }
        }
    }

    /// Unsubscribe and clear the container; only the first call has an effect
    pub fn teardown(&self) -> bool {
        if !self.mounted.swap(false, Ordering::SeqCst) {
            return false;
        }
        self.release_subscription();
        self.shared.container.clear();
        true
    }

    /// Drop the bus subscription but stay mounted
    pub fn detach(&self) {
        self.release_subscription();
        *self.bus.lock() = None;
        self.shared.view.lock().standalone = true;
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    pub fn container(&self) -> &Arc<dyn Container> {
        &self.shared.container
    }

    fn release_subscription(&self) {
        if let Some(subscription) = self.subscription.lock().take() {
            subscription.unsubscribe();
        }
    }
}

impl std::fmt::Debug for FragmentCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentCore")
            .field("view", &self.view())
            .field("mounted", &self.is_mounted())
            .finish()
    }
}
