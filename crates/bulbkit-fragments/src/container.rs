//! Rendering boundary between a fragment and whatever displays it.
//!
//! The adapters never draw anything themselves. They hand a [`BulbView`] to a
//! [`Container`], which may be a DOM node, a terminal pane, or the in-memory
//! recorder used by the host shell and tests.

use bulbkit_core::ParticipantId;
use parking_lot::Mutex;

/// What a fragment currently shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulbView {
    pub app_id: ParticipantId,
    pub version: String,
    pub bulb_on: bool,
    pub selected_targets: Vec<ParticipantId>,
    /// True when the fragment has no event bus
    pub standalone: bool,
}

impl BulbView {
    /// One-line label, e.g. `mfe1 [ON] -> host, mfe1`
    pub fn label(&self) -> String {
        format!(
            "{} [{}] -> {}{}",
            self.app_id,
            if self.bulb_on { "ON" } else { "off" },
            self.selected_targets
                .iter()
                .map(ParticipantId::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            if self.standalone { " (standalone)" } else { "" }
        )
    }
}

/// Surface a fragment is mounted into
pub trait Container: Send + Sync {
    /// Stable identifier; mounting twice into the same id replaces the first mount
    fn id(&self) -> &str;

    /// Show the given view
    fn render(&self, view: &BulbView);

    /// Show an inline error instead of the fragment
    fn show_error(&self, message: &str);

    /// Remove whatever is shown
    fn clear(&self);
}

#[derive(Debug, Default)]
struct Recorded {
    renders: Vec<BulbView>,
    visible: Option<BulbView>,
    errors: Vec<String>,
    cleared: usize,
}

/// Container that keeps everything it is asked to show
#[derive(Debug)]
pub struct MemoryContainer {
    id: String,
    recorded: Mutex<Recorded>,
}

impl MemoryContainer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            recorded: Mutex::new(Recorded::default()),
        }
    }

    /// Most recent view, unless the container was cleared or errored since
    pub fn current(&self) -> Option<BulbView> {
        self.recorded.lock().visible.clone()
    }

    /// Every render since creation, including cleared ones
    pub fn render_count(&self) -> usize {
        self.recorded.lock().renders.len()
    }

    pub fn errors(&self) -> Vec<String> {
        self.recorded.lock().errors.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.recorded.lock().errors.last().cloned()
    }

    /// How many times the container was cleared
    pub fn clear_count(&self) -> usize {
        self.recorded.lock().cleared
    }
}

impl Container for MemoryContainer {
    fn id(&self) -> &str {
        &self.id
    }

    fn render(&self, view: &BulbView) {
        let mut recorded = self.recorded.lock();
        recorded.renders.push(view.clone());
        recorded.visible = Some(view.clone());
    }

    fn show_error(&self, message: &str) {
        let mut recorded = self.recorded.lock();
        recorded.visible = None;
        recorded.errors.push(message.to_string());
    }

    fn clear(&self) {
        let mut recorded = self.recorded.lock();
        recorded.visible = None;
        recorded.cleared += 1;
    }
}
