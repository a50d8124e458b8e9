use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use log::{debug, error, info, warn};

use crate::protocols::Transport;

use super::{
    codec::{
        decode_attributes, decode_availability, decode_channel_update, decode_ota_reply,
        encode_command, LightIntent,
    },
    identity::DeviceIdentity,
    state::{Color, DeviceState, OtaOutcome},
    topics::{InboundTopic, Topics, REQUEST_PAYLOAD},
};

pub use super::state::Facet;

type Callback = Arc<dyn Fn(&Coordinator) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Unattached,
    Subscribing,
    Live,
}

/// Mirrors one device channel: owns its [`DeviceState`], applies every
/// inbound message to it and tells the registered observers which facets
/// changed.
///
/// Messages must be delivered one at a time (see
/// [`Registry`](crate::registry::Registry)); handlers never wait on the
/// transport.
pub struct Coordinator {
    identity: DeviceIdentity,
    topics: Topics,
    transport: Arc<dyn Transport>,
    state: RwLock<DeviceState>,
    observers: RwLock<HashMap<Facet, Callback>>,
    lifecycle: Mutex<Lifecycle>,
}

impl Coordinator {
    pub fn new(identity: DeviceIdentity, transport: Arc<dyn Transport>) -> Self {
        info!(
            "Set up a coordinator for the device {}; channel {}",
            identity.device_id(),
            identity.channel()
        );

        Coordinator {
            topics: Topics::new(&identity),
            identity,
            transport,
            state: RwLock::new(DeviceState::default()),
            observers: Default::default(),
            lifecycle: Mutex::new(Lifecycle::Unattached),
        }
    }

    /// Subscribes to the device topics and asks the device for its current
    /// state. Only the first call has any effect.
    pub fn start(&self) {
        let mut lifecycle = self
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if *lifecycle != Lifecycle::Unattached {
            return;
        }
        *lifecycle = Lifecycle::Subscribing;

        for (topic, _) in self.topics.subscriptions() {
            info!("Subscribe to the topic {}", topic);
            if let Err(e) = self.transport.subscribe(topic) {
                error!("[{}] {:?}", self.device_id(), e);
            }
        }

        info!(
            "Request the current state over the topic {}",
            self.topics.channel_request
        );
        self.publish(&self.topics.channel_request, REQUEST_PAYLOAD.to_string());

        info!(
            "Request the attributes over the topic {}",
            self.topics.attributes_request
        );
        self.publish(&self.topics.attributes_request, REQUEST_PAYLOAD.to_string());

        *lifecycle = Lifecycle::Live;
    }

    /// Releases the subscriptions taken by [`start`](Self::start). A stopped
    /// coordinator can be started again.
    pub fn stop(&self) {
        let mut lifecycle = self
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if *lifecycle != Lifecycle::Live {
            return;
        }

        for (topic, _) in self.topics.subscriptions() {
            info!("Unsubscribe from the topic {}", topic);
            if let Err(e) = self.transport.unsubscribe(topic) {
                error!("[{}] {:?}", self.device_id(), e);
            }
        }

        *lifecycle = Lifecycle::Unattached;
    }

    /// Registers the single callback for `facet`, replacing any previous one.
    pub fn register_observer<F>(&self, facet: Facet, callback: F)
    where
        F: Fn(&Coordinator) + Send + Sync + 'static,
    {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(facet, Arc::new(callback));
    }

    /// Applies one message received on one of this coordinator's topics.
    /// Malformed payloads are logged and dropped without notifying anyone.
    pub fn handle_message(&self, topic: &str, payload: &[u8]) {
        match self.topics.classify(topic) {
            Some(InboundTopic::Status) => self.handle_availability(payload),
            Some(InboundTopic::Attributes) => self.handle_attributes(payload),
            Some(InboundTopic::ChannelState) => self.handle_channel_state(payload),
            Some(InboundTopic::OtaReply) => self.handle_ota_reply(payload),
            None => debug!("[{}] Ignoring message on {}", self.device_id(), topic),
        }
    }

    fn handle_availability(&self, payload: &[u8]) {
        debug!(
            "[{}] MQTT availability message received: {}",
            self.device_id(),
            String::from_utf8_lossy(payload)
        );

        self.state_mut().set_available(decode_availability(payload));

        for facet in Facet::AVAILABILITY_LINKED {
            self.notify(facet);
        }
    }

    fn handle_attributes(&self, payload: &[u8]) {
        debug!(
            "[{}] MQTT attribute message received: {}",
            self.device_id(),
            String::from_utf8_lossy(payload)
        );

        let update = match decode_attributes(payload) {
            Ok(update) => update,
            Err(e) => {
                self.skip_malformed(e);
                return;
            }
        };

        let facets = self.state_mut().apply_attributes(&update);
        for facet in facets {
            self.notify(facet);
        }
    }

    fn handle_channel_state(&self, payload: &[u8]) {
        debug!(
            "[{}] MQTT message received: {}",
            self.device_id(),
            String::from_utf8_lossy(payload)
        );

        let update = match decode_channel_update(payload) {
            Ok(update) => update,
            Err(e) => {
                self.skip_malformed(e);
                return;
            }
        };

        self.state_mut().apply_channel_update(&update);

        for facet in Facet::CHANNEL_STATE {
            self.notify(facet);
        }
    }

    fn handle_ota_reply(&self, payload: &[u8]) {
        debug!(
            "[{}] MQTT OTA message received: {}",
            self.device_id(),
            String::from_utf8_lossy(payload)
        );

        let reply = match decode_ota_reply(payload) {
            Ok(reply) => reply,
            Err(e) => {
                self.skip_malformed(e);
                return;
            }
        };

        let outcome = self.state_mut().apply_ota_reply(&reply);

        match outcome {
            OtaOutcome::UpdateStarted => info!("[{}] OTA update has started", self.device_id()),
            OtaOutcome::UpdateFinished => {
                info!("[{}] OTA update has finished", self.device_id())
            }
            OtaOutcome::UpdateFailed => warn!("[{}] OTA update has failed", self.device_id()),
            OtaOutcome::CheckFailed => warn!("[{}] OTA check update has failed", self.device_id()),
            OtaOutcome::CheckFinished => debug!(
                "[{}] Available firmware version: {:?}, running firmware version: {:?}",
                self.device_id(),
                self.available_version(),
                self.firmware_version()
            ),
            OtaOutcome::Ignored => debug!("[{}] Ignoring OTA message {:?}", self.device_id(), reply),
        }

        self.notify(Facet::Ota);
    }

    fn skip_malformed(&self, e: eyre::Report) {
        warn!(
            "[{}] Skipping update because of malformed data: {}",
            self.device_id(),
            e
        );
    }

    /// Runs the callback outside of any lock so that it can read accessors.
    fn notify(&self, facet: Facet) {
        let callback = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&facet)
            .cloned();

        if let Some(callback) = callback {
            callback(self);
        }
    }

    fn publish(&self, topic: &str, payload: String) {
        if let Err(e) = self.transport.publish(topic, payload) {
            error!("[{}] {:?}", self.device_id(), e);
        }
    }

    /// Sends a command to the device. Local state only changes once the
    /// device echoes its new state back.
    pub fn publish_command(&self, intent: &LightIntent) {
        let message = match encode_command(intent) {
            Ok(message) => message,
            Err(e) => {
                error!("[{}] {:?}", self.device_id(), e);
                return;
            }
        };

        info!(
            "Publish a command {} to the topic {}",
            message, self.topics.command
        );
        self.publish(&self.topics.command, message);
    }

    pub fn request_ota_check(&self) {
        info!(
            "Check OTA availability: publish a request to the topic {}",
            self.topics.ota_check
        );
        self.publish(&self.topics.ota_check, REQUEST_PAYLOAD.to_string());
    }

    pub fn request_ota_install(&self) {
        info!(
            "Perform OTA update: publish a request to the topic {}",
            self.topics.ota_perform
        );
        self.publish(&self.topics.ota_perform, REQUEST_PAYLOAD.to_string());
    }

    fn state(&self) -> RwLockReadGuard<'_, DeviceState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&self) -> RwLockWriteGuard<'_, DeviceState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn device_id(&self) -> &str {
        self.identity.device_id()
    }

    pub fn channel(&self) -> u8 {
        self.identity.channel()
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> DeviceState {
        self.state().clone()
    }

    pub fn available(&self) -> bool {
        self.state().available
    }

    pub fn is_on(&self) -> bool {
        self.state().power
    }

    pub fn color(&self) -> Color {
        self.state().color
    }

    pub fn brightness(&self) -> u8 {
        self.state().brightness
    }

    pub fn parameter1(&self) -> u8 {
        self.state().parameter1
    }

    pub fn parameter2(&self) -> u8 {
        self.state().parameter2
    }

    pub fn picture(&self) -> Option<String> {
        self.state().active_picture.clone()
    }

    pub fn effect(&self) -> Option<String> {
        self.state().active_effect.clone()
    }

    pub fn board_temperature(&self) -> Option<f64> {
        self.state().board_temperature
    }

    pub fn uptime(&self) -> Option<f64> {
        self.state().uptime
    }

    pub fn firmware_version(&self) -> Option<String> {
        self.state().firmware_version.clone()
    }

    pub fn firmware_version_ordinal(&self) -> u32 {
        self.state().firmware_version_ordinal
    }

    pub fn available_version(&self) -> Option<String> {
        self.state().available_version.clone()
    }

    pub fn available_version_ordinal(&self) -> u32 {
        self.state().available_version_ordinal
    }

    pub fn update_available(&self) -> bool {
        self.state().update_available()
    }

    pub fn ota_in_progress(&self) -> bool {
        self.state().ota_in_progress
    }

    pub fn mac_address(&self) -> Option<String> {
        self.state().mac_address.clone()
    }

    pub fn ip_address(&self) -> Option<String> {
        self.state().ip_address.clone()
    }

    pub fn local_url(&self) -> Option<String> {
        self.state().local_url.clone()
    }
}
