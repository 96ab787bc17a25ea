//! Mount properties handed to a fragment when it is attached.

use bulbkit_core::{EventBus, ParticipantId, CONTRACT_VERSION};
use serde::{Deserialize, Serialize};

/// Hosting technology of a fragment, used to pick its loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FragmentKind {
    /// The host shell's own bulb
    Host,
    /// A fragment exposing a `mount(container, props)` function
    DomMount,
    /// A fragment registered as a custom element and configured via properties
    CustomElement,
}

impl std::fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::DomMount => write!(f, "dom-mount"),
            Self::CustomElement => write!(f, "custom-element"),
        }
    }
}

/// Snapshot of the bulb at mount time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialState {
    pub bulb_on: bool,
}

/// Everything a fragment needs to join the protocol
///
/// A fragment mounted without an event bus runs standalone: toggling only
/// changes its own bulb.
#[derive(Debug, Clone)]
pub struct MountProps {
    pub app_id: ParticipantId,
    pub version: String,
    pub initial_state: InitialState,
    /// Preselected broadcast targets
    pub initial_targets: Vec<ParticipantId>,
    pub event_bus: Option<EventBus>,
}

impl MountProps {
    /// Props for `app_id` with the bulb off, targeting only itself, and no bus
    pub fn new(app_id: impl Into<ParticipantId>) -> Self {
        let app_id = app_id.into();
        Self {
            initial_targets: vec![app_id.clone()],
            app_id,
            version: CONTRACT_VERSION.to_string(),
            initial_state: InitialState::default(),
            event_bus: None,
        }
    }

    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn with_initial_targets(mut self, targets: Vec<ParticipantId>) -> Self {
        self.initial_targets = targets;
        self
    }

    pub fn with_bulb_on(mut self, on: bool) -> Self {
        self.initial_state.bulb_on = on;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_props_target_self() {
        let props = MountProps::new("mfe3");
        assert_eq!(props.initial_targets, vec![ParticipantId::new("mfe3")]);
        assert!(!props.initial_state.bulb_on);
        assert!(props.event_bus.is_none());
        assert_eq!(props.version, CONTRACT_VERSION);
    }

    #[test]
    fn test_kind_serde_names() {
        assert_eq!(
            serde_json::to_string(&FragmentKind::CustomElement).unwrap(),
            "\"custom-element\""
        );
        let kind: FragmentKind = serde_json::from_str("\"dom-mount\"").unwrap();
        assert_eq!(kind, FragmentKind::DomMount);
    }
}
