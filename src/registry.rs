use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use color_eyre::Result;
use eyre::eyre;
use log::{error, info};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    entities::{
        attach,
        light::Light,
        select::{Select, SelectKind},
        sensor::{BoardTemperatureSensor, UptimeSensor},
        update::FirmwareUpdate,
        Commandable, EntitySink, Readable,
    },
    pixie::{coordinator::Coordinator, identity::DeviceIdentity},
    protocols::Transport,
};

type Message = (String, Vec<u8>);

struct DeviceEntry {
    coordinator: Arc<Coordinator>,
    sender: mpsc::UnboundedSender<Message>,
    task: JoinHandle<()>,
    entity_ids: Vec<String>,
}

#[derive(Clone)]
struct CommandTarget {
    entity: Arc<dyn Commandable>,
    coordinator: Arc<Coordinator>,
}

type Commands = HashMap<String, CommandTarget>;

/// Owns every coordinator together with its entities, and feeds each
/// coordinator from its own task so that its messages are handled in
/// arrival order.
pub struct Registry {
    transport: Arc<dyn Transport>,
    sink: Arc<dyn EntitySink>,
    devices: Mutex<HashMap<DeviceIdentity, DeviceEntry>>,
    commands: Mutex<Commands>,
}

impl Registry {
    pub fn new(transport: Arc<dyn Transport>, sink: Arc<dyn EntitySink>) -> Self {
        Registry {
            transport,
            sink,
            devices: Default::default(),
            commands: Default::default(),
        }
    }

    fn devices(&self) -> MutexGuard<'_, HashMap<DeviceIdentity, DeviceEntry>> {
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn commands(&self) -> MutexGuard<'_, Commands> {
        self.commands.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates the coordinator for `identity`, spawns its message task and
    /// attaches its entities. Must be called from within a tokio runtime.
    pub fn add_device(
        &self,
        identity: DeviceIdentity,
        name: Option<&str>,
    ) -> Result<Arc<Coordinator>> {
        let mut devices = self.devices();

        if devices.contains_key(&identity) {
            return Err(eyre!("Pixie device {} is already registered", identity));
        }

        let coordinator = Arc::new(Coordinator::new(
            identity.clone(),
            self.transport.clone(),
        ));

        let (sender, mut receiver) = mpsc::unbounded_channel::<Message>();
        let task = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                while let Some((topic, payload)) = receiver.recv().await {
                    coordinator.handle_message(&topic, &payload);
                }
            })
        };

        let mut commands = self.commands();
        let mut entity_ids = vec![];

        let light = Arc::new(Light::new(&coordinator, name));
        self.attach_commandable(light, &coordinator, &mut commands, &mut entity_ids);

        for kind in [SelectKind::Picture, SelectKind::Effect] {
            let select = Arc::new(Select::new(kind, &coordinator, name));
            self.attach_commandable(select, &coordinator, &mut commands, &mut entity_ids);
        }

        let temperature = Arc::new(BoardTemperatureSensor::new(&coordinator, name));
        entity_ids.push(temperature.unique_id());
        attach(temperature, &coordinator, self.sink.clone());

        let uptime = Arc::new(UptimeSensor::new(&coordinator, name));
        entity_ids.push(uptime.unique_id());
        attach(uptime, &coordinator, self.sink.clone());

        // One update entity per controller, held by one of its channels
        let update_id = FirmwareUpdate::unique_id_for(identity.device_id());
        if !commands.contains_key(&update_id) {
            let update = Arc::new(FirmwareUpdate::new(&coordinator));
            self.attach_commandable(update, &coordinator, &mut commands, &mut entity_ids);
        }

        info!("Registered Pixie device {}", identity);

        devices.insert(
            identity,
            DeviceEntry {
                coordinator: coordinator.clone(),
                sender,
                task,
                entity_ids,
            },
        );

        Ok(coordinator)
    }

    fn attach_commandable<E>(
        &self,
        entity: Arc<E>,
        coordinator: &Arc<Coordinator>,
        commands: &mut Commands,
        entity_ids: &mut Vec<String>,
    ) where
        E: Readable + Commandable + 'static,
    {
        let unique_id = entity.unique_id();
        attach(entity.clone(), coordinator, self.sink.clone());

        entity_ids.push(unique_id.clone());
        commands.insert(
            unique_id,
            CommandTarget {
                entity,
                coordinator: coordinator.clone(),
            },
        );
    }

    /// Stops the coordinator's task, releases its subscriptions and forgets its
    /// entities. A firmware update entity held by this channel moves to a
    /// remaining channel of the same controller. Returns whether the device
    /// was registered.
    pub fn remove_device(&self, identity: &DeviceIdentity) -> bool {
        let mut devices = self.devices();

        let Some(entry) = devices.remove(identity) else {
            return false;
        };

        entry.task.abort();
        entry.coordinator.stop();

        let mut commands = self.commands();
        for unique_id in &entry.entity_ids {
            commands.remove(unique_id);
        }

        let update_id = FirmwareUpdate::unique_id_for(identity.device_id());
        if entry.entity_ids.contains(&update_id) {
            let sibling = devices
                .values_mut()
                .filter(|other| other.coordinator.device_id() == identity.device_id())
                .min_by_key(|other| other.coordinator.channel());

            if let Some(sibling) = sibling {
                let coordinator = sibling.coordinator.clone();
                let update = Arc::new(FirmwareUpdate::new(&coordinator));

                info!(
                    "Firmware update of {} moves to {}",
                    identity.device_id(),
                    coordinator.identity()
                );
                self.attach_commandable(update, &coordinator, &mut commands, &mut sibling.entity_ids);
            }
        }

        info!("Removed Pixie device {}", identity);
        true
    }

    /// Removes every device, releasing all of their subscriptions.
    pub fn unload(&self) {
        let identities: Vec<DeviceIdentity> = self.devices().keys().cloned().collect();

        for identity in identities {
            self.remove_device(&identity);
        }
    }

    /// Queues a device message for every coordinator listening on `topic` and
    /// returns how many there were.
    pub fn route(&self, topic: &str, payload: &[u8]) -> usize {
        let mut routed = 0;

        for (identity, entry) in self.devices().iter() {
            if entry.coordinator.topics().classify(topic).is_none() {
                continue;
            }

            match entry.sender.send((topic.to_string(), payload.to_vec())) {
                Ok(()) => routed += 1,
                Err(_) => error!("[{}] Message task has stopped", identity.device_id()),
            }
        }

        routed
    }

    /// Runs a host command against the entity with the given unique id.
    pub fn dispatch_command(&self, unique_id: &str, payload: &[u8]) -> Result<()> {
        let target = self
            .commands()
            .get(unique_id)
            .cloned()
            .ok_or_else(|| eyre!("No Pixie entity with id {}", unique_id))?;

        target.entity.command(&target.coordinator, payload)
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        for entry in self.devices().values() {
            entry.task.abort();
        }
    }
}
