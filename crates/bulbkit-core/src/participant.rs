//! Participants and the canonical bulb state
//!
//! A participant is anything that shows a bulb: the host shell itself or one
//! of the mounted fragments. The set of participants is closed: it is fixed
//! when the registry is built and never grows at runtime.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::RegistryError;

/// Opaque identifier of a participant ("host", "mfe1", ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    /// Create a participant id from any string-like value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The reserved id of the host shell
    pub fn host() -> Self {
        Self::new("host")
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ParticipantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl PartialEq<str> for ParticipantId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ParticipantId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Build a `Vec<ParticipantId>` from string literals
pub fn participant_ids<I, S>(ids: I) -> Vec<ParticipantId>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    ids.into_iter().map(ParticipantId::new).collect()
}

/// Closed, ordered set of valid participant ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantRegistry {
    ids: Vec<ParticipantId>,
    index: HashSet<ParticipantId>,
}

impl ParticipantRegistry {
    /// Build a registry, rejecting empty and duplicate ids
    pub fn new<I, S>(ids: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<ParticipantId>,
    {
        let mut ordered = Vec::new();
        let mut index = HashSet::new();

        for id in ids {
            let id = id.into();
            if id.as_str().is_empty() {
                return Err(RegistryError::EmptyId);
            }
            if !index.insert(id.clone()) {
                return Err(RegistryError::DuplicateId { id: id.0 });
            }
            ordered.push(id);
        }

        if ordered.is_empty() {
            return Err(RegistryError::Empty);
        }

        Ok(Self {
            ids: ordered,
            index,
        })
    }

    /// Check whether an id is a registered participant
    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.index.contains(id)
    }

    /// Registered ids in registration order
    pub fn ids(&self) -> &[ParticipantId] {
        &self.ids
    }

    /// Number of registered participants
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True when no participants are registered
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Keep only registered ids, dropping duplicates but keeping first-seen order
    pub fn filter_targets<'a, I>(&self, targets: I) -> Vec<ParticipantId>
    where
        I: IntoIterator<Item = &'a ParticipantId>,
    {
        let mut seen = HashSet::new();
        targets
            .into_iter()
            .filter(|id| self.contains(id))
            .filter(|id| seen.insert((*id).clone()))
            .cloned()
            .collect()
    }
}

/// Canonical on/off state of every participant's bulb
///
/// Every registry member has exactly one entry and no other keys exist.
#[derive(Debug, Clone)]
pub struct BulbState {
    registry: ParticipantRegistry,
    states: HashMap<ParticipantId, bool>,
}

impl BulbState {
    /// Create the state with every bulb off
    pub fn new(registry: ParticipantRegistry) -> Self {
        let states = registry
            .ids()
            .iter()
            .map(|id| (id.clone(), false))
            .collect();
        Self { registry, states }
    }

    /// Current state of one participant, `None` if unregistered
    pub fn get(&self, id: &ParticipantId) -> Option<bool> {
        self.states.get(id).copied()
    }

    /// Set one participant's state
    ///
    /// Returns false and leaves the map untouched when `id` is not registered.
    pub fn set(&mut self, id: &ParticipantId, on: bool) -> bool {
        match self.states.get_mut(id) {
            Some(slot) => {
                *slot = on;
                true
            }
            None => false,
        }
    }

    /// The registry this state was built from
    pub fn registry(&self) -> &ParticipantRegistry {
        &self.registry
    }

    /// All entries in registry order
    pub fn snapshot(&self) -> Vec<(ParticipantId, bool)> {
        self.registry
            .ids()
            .iter()
            .map(|id| (id.clone(), self.states.get(id).copied().unwrap_or(false)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ParticipantRegistry {
        ParticipantRegistry::new(["host", "mfe1", "mfe2"]).unwrap()
    }

    #[test]
    fn test_registry_rejects_bad_ids() {
        assert_eq!(
            ParticipantRegistry::new([""]).unwrap_err(),
            RegistryError::EmptyId
        );
        assert_eq!(
            ParticipantRegistry::new(["host", "host"]).unwrap_err(),
            RegistryError::DuplicateId {
                id: "host".to_string()
            }
        );
        assert_eq!(
            ParticipantRegistry::new(Vec::<String>::new()).unwrap_err(),
            RegistryError::Empty
        );

        let reg = registry();
        assert_eq!(reg.len(), 3);
        assert!(!reg.is_empty());
    }

    #[test]
    fn test_filter_targets_drops_unknown_and_duplicates() {
        let reg = registry();
        let targets = participant_ids(["mfe2", "ghost", "host", "mfe2", "host"]);
        assert_eq!(
            reg.filter_targets(&targets),
            participant_ids(["mfe2", "host"])
        );
    }

    #[test]
    fn test_bulb_state_starts_off_and_is_closed() {
        let mut state = BulbState::new(registry());
        assert!(state.snapshot().iter().all(|(_, on)| !on));

        assert!(state.set(&"mfe1".into(), true));
        assert_eq!(state.get(&"mfe1".into()), Some(true));

        assert!(!state.set(&"ghost".into(), true));
        assert_eq!(state.get(&"ghost".into()), None);
        assert_eq!(state.snapshot().len(), 3);
    }

    #[test]
    fn test_snapshot_follows_registry_order() {
        let state = BulbState::new(ParticipantRegistry::new(["mfe3", "host", "mfe1"]).unwrap());
        let ids: Vec<_> = state.snapshot().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, participant_ids(["mfe3", "host", "mfe1"]));
    }
}
