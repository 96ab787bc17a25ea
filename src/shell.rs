//! Host shell
//!
//! Wires one bus, one mediator, and every configured participant together.
//! The host's own bulb is mounted through the same adapter contract as the
//! fragments, so it follows broadcasts exactly like they do.

use bulbkit_core::{
    CorrelationId, DeliveryReport, EventBus, Mediator, Message, ParticipantId, Subscription,
};
use bulbkit_fragments::{
    BulbView, Fragment, FragmentError, LoaderRegistry, MemoryContainer, MountHandle,
};
use bulbkit_settings::{Config, ConfigError, SettingsError};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors reported by host shell operations
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Unknown participant: {0}")]
    UnknownParticipant(ParticipantId),

    #[error("Participant {0} is not mounted")]
    NotMounted(ParticipantId),

    #[error("Participant {0} has no event bus, nothing was sent")]
    NothingSent(ParticipantId),

    #[error("{0}")]
    Core(#[from] bulbkit_core::Error),
}

/// A participant's slot on the page
#[derive(Debug)]
struct Slot {
    id: ParticipantId,
    label: String,
    container: Arc<MemoryContainer>,
    handle: Option<MountHandle>,
}

/// The host page: bus, mediator, and mounted participants
pub struct HostShell {
    bus: EventBus,
    mediator: Arc<Mediator>,
    link: Subscription,
    loaders: LoaderRegistry,
    slots: Vec<Slot>,
    load_errors: HashMap<ParticipantId, FragmentError>,
}

impl HostShell {
    /// Build the page described by `config` and mount every participant
    ///
    /// A participant that fails to load shows the error in its container and
    /// the rest of the page keeps running.
    pub fn from_config(config: &Config) -> Result<Self, ShellError> {
        config.validate()?;

        let registry = config.registry()?;
        let bus = EventBus::with_config(config.bus.to_bus_config());
        let mediator = Mediator::new(registry, bus.clone());
        let link = mediator.connect();
        let loaders = LoaderRegistry::with_defaults();

        let mut slots = Vec::with_capacity(config.participants.len());
        let mut load_errors = HashMap::new();
        for participant in &config.participants {
            let container = Arc::new(MemoryContainer::new(format!("{}-root", participant.id)));
            let props = config.mount_props(&participant.id, Some(bus.clone()))?;

            let handle = match loaders.load_into(participant.kind, container.clone(), props) {
                Ok(handle) => Some(handle),
                Err(err) => {
                    load_errors.insert(participant.id.clone(), err);
                    None
                }
            };

            slots.push(Slot {
                id: participant.id.clone(),
                label: participant.label.clone(),
                container,
                handle,
            });
        }

        tracing::info!(
            mounted = slots.iter().filter(|s| s.handle.is_some()).count(),
            failed = load_errors.len(),
            "Host shell ready"
        );

        Ok(Self {
            bus,
            mediator,
            link,
            loaders,
            slots,
            load_errors,
        })
    }

    /// Press the toggle of participant `id`
    pub fn toggle(&self, id: &ParticipantId) -> Result<CorrelationId, ShellError> {
        self.fragment(id)?
            .toggle()
            .ok_or_else(|| ShellError::NothingSent(id.clone()))
    }

    /// Publish a wire-format message as if a fragment had sent it
    pub fn send_json(&self, json: &str) -> Result<DeliveryReport, ShellError> {
        Ok(self.bus.publish_json(json)?)
    }

    /// Replace the target selection of participant `id`
    pub fn select_targets(&self, id: &ParticipantId, targets: Vec<ParticipantId>) -> Result<(), ShellError> {
        self.fragment(id)?.set_selected_targets(targets);
        Ok(())
    }

    /// Canonical state held by the mediator
    pub fn snapshot(&self) -> Vec<(ParticipantId, bool)> {
        self.mediator.snapshot()
    }

    /// What participant `id` currently shows
    pub fn view(&self, id: &ParticipantId) -> Result<BulbView, ShellError> {
        Ok(self.fragment(id)?.view())
    }

    /// Views of every mounted participant in configuration order
    pub fn views(&self) -> Vec<BulbView> {
        self.slots
            .iter()
            .filter_map(|slot| slot.handle.as_ref())
            .filter(|handle| handle.is_mounted())
            .map(|handle| handle.fragment().view())
            .collect()
    }

    /// Tear participant `id` down; its canonical state is kept
    pub fn unmount(&mut self, id: &ParticipantId) -> Result<(), ShellError> {
        let slot = self.slot_mut(id)?;
        let handle = slot
            .handle
            .take()
            .ok_or_else(|| ShellError::NotMounted(id.clone()))?;
        handle.unmount();
        Ok(())
    }

    /// Messages kept by the bus, oldest first
    pub fn history(&self) -> Vec<Message> {
        self.bus.history(None)
    }

    /// Participant ids with their display labels
    pub fn participants(&self) -> Vec<(ParticipantId, String)> {
        self.slots
            .iter()
            .map(|slot| (slot.id.clone(), slot.label.clone()))
            .collect()
    }

    pub fn load_error(&self, id: &ParticipantId) -> Option<&FragmentError> {
        self.load_errors.get(id)
    }

    pub fn container(&self, id: &ParticipantId) -> Option<&Arc<MemoryContainer>> {
        self.slots.iter().find(|s| &s.id == id).map(|s| &s.container)
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn mediator(&self) -> &Arc<Mediator> {
        &self.mediator
    }

    /// Unmount everything and disconnect the mediator
    pub fn shutdown(self) {
        self.loaders.mounts().clear();
        self.link.unsubscribe();
        tracing::info!("Host shell shut down");
    }

    fn fragment(&self, id: &ParticipantId) -> Result<Arc<dyn Fragment>, ShellError> {
        let slot = self
            .slots
            .iter()
            .find(|s| &s.id == id)
            .ok_or_else(|| ShellError::UnknownParticipant(id.clone()))?;
        match &slot.handle {
            Some(handle) if handle.is_mounted() => Ok(Arc::clone(handle.fragment())),
            _ => Err(ShellError::NotMounted(id.clone())),
        }
    }

    fn slot_mut(&mut self, id: &ParticipantId) -> Result<&mut Slot, ShellError> {
        self.slots
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| ShellError::UnknownParticipant(id.clone()))
    }
}

impl std::fmt::Debug for HostShell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostShell")
            .field("mediator", &self.mediator)
            .field("slots", &self.slots)
            .field("load_errors", &self.load_errors)
            .finish()
    }
}
