//! Host-facing entities. Each one projects part of a [`Coordinator`]'s state
//! and republishes it whenever one of its facets changes.

use std::sync::Arc;

use color_eyre::Result;
use log::error;
use serde::Serialize;

use crate::pixie::coordinator::{Coordinator, Facet, Lifecycle};

pub mod light;
pub mod select;
pub mod sensor;
pub mod update;

/// An entity whose state can be read from a coordinator.
pub trait Readable: Send + Sync {
    type State: Serialize;

    fn unique_id(&self) -> String;

    /// Facets whose changes trigger a republish.
    fn facets(&self) -> &'static [Facet];

    fn read(&self, coordinator: &Coordinator) -> Self::State;
}

/// An entity that accepts JSON commands from the host.
pub trait Commandable: Send + Sync {
    fn command(&self, coordinator: &Coordinator, payload: &[u8]) -> Result<()>;
}

/// Receives serialized entity state.
pub trait EntitySink: Send + Sync {
    fn publish_entity(&self, unique_id: &str, json: String) -> Result<()>;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub identifiers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<(&'static str, String)>,
    pub name: &'static str,
    pub manufacturer: &'static str,
    pub model: &'static str,
    pub sw_version: Option<String>,
    pub configuration_url: String,
}

impl DeviceInfo {
    pub fn read(coordinator: &Coordinator) -> Self {
        DeviceInfo {
            identifiers: vec![format!("pixie_{}", coordinator.device_id())],
            connections: coordinator
                .mac_address()
                .map(|mac| vec![("mac", mac)])
                .unwrap_or_default(),
            name: "Pixie",
            manufacturer: "iothus14",
            model: "Pixie",
            sw_version: coordinator.firmware_version(),
            configuration_url: format!("http://pixie-{}.local", coordinator.device_id()),
        }
    }
}

/// Default display name of a per-channel entity.
pub fn channel_entity_name(coordinator: &Coordinator, name: Option<&str>) -> String {
    match name {
        Some(name) => name.to_string(),
        None => format!("Pixie {} {}", coordinator.device_id(), coordinator.channel()),
    }
}

pub fn publish_entity_state<E: Readable + ?Sized>(
    entity: &E,
    coordinator: &Coordinator,
    sink: &dyn EntitySink,
) {
    let unique_id = entity.unique_id();

    let result = serde_json::to_string(&entity.read(coordinator))
        .map_err(eyre::Report::from)
        .and_then(|json| sink.publish_entity(&unique_id, json));

    if let Err(e) = result {
        error!(
            "[{}] Failed to publish state of {}: {:?}",
            coordinator.device_id(),
            unique_id,
            e
        );
    }
}

/// Hooks `entity` up to `coordinator`: registers its facets, publishes its
/// current state and starts the coordinator if nobody did yet.
pub fn attach<E>(entity: Arc<E>, coordinator: &Coordinator, sink: Arc<dyn EntitySink>)
where
    E: Readable + 'static,
{
    for facet in entity.facets() {
        let entity = entity.clone();
        let sink = sink.clone();

        coordinator.register_observer(*facet, move |coordinator| {
            publish_entity_state(&*entity, coordinator, &*sink)
        });
    }

    publish_entity_state(&*entity, coordinator, &*sink);

    if coordinator.lifecycle() == Lifecycle::Unattached {
        coordinator.start();
    }
}

#[cfg(test)]
pub mod mock {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct RecordingSink {
        published: Mutex<Vec<(String, serde_json::Value)>>,
    }

    impl RecordingSink {
        pub fn published_for(&self, unique_id: &str) -> Vec<serde_json::Value> {
            self.published
                .lock()
                .unwrap()
                .iter()
                .filter(|(id, _)| id == unique_id)
                .map(|(_, state)| state.clone())
                .collect()
        }

        pub fn last_for(&self, unique_id: &str) -> Option<serde_json::Value> {
            self.published_for(unique_id).pop()
        }
    }

    impl EntitySink for RecordingSink {
        fn publish_entity(&self, unique_id: &str, json: String) -> Result<()> {
            let state = serde_json::from_str(&json)?;
            self.published
                .lock()
                .unwrap()
                .push((unique_id.to_string(), state));
            Ok(())
        }
    }
}
