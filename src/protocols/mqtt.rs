use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use color_eyre::Result;
use eyre::WrapErr;
use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};

use crate::settings::Settings;

use super::Transport;

const DEFAULT_KEEP_ALIVE_SECONDS: u64 = 5;

/// Every coordinator queues four subscriptions and two requests on start, and
/// every entity publishes its initial state before the event loop drains the
/// queue.
const DEFAULT_REQUEST_CAPACITY: usize = 1000;

#[derive(Clone)]
pub struct MqttClient {
    pub client: AsyncClient,

    /// Subscribed topics and how many coordinators hold each of them.
    subscriptions: Arc<Mutex<HashMap<String, usize>>>,
}

pub fn mk_mqtt_client(settings: &Settings) -> (MqttClient, EventLoop) {
    let mut options = MqttOptions::new(
        settings.mqtt.id.clone(),
        settings.mqtt.host.clone(),
        settings.mqtt.port,
    );
    options.set_keep_alive(Duration::from_secs(
        settings
            .mqtt
            .keep_alive_seconds
            .unwrap_or(DEFAULT_KEEP_ALIVE_SECONDS),
    ));

    if let (Some(username), Some(password)) = (&settings.mqtt.username, &settings.mqtt.password) {
        options.set_credentials(username, password);
    }

    let (client, eventloop) = AsyncClient::new(
        options,
        settings
            .mqtt
            .request_capacity
            .unwrap_or(DEFAULT_REQUEST_CAPACITY),
    );

    let mqtt_client = MqttClient {
        client,
        subscriptions: Default::default(),
    };

    (mqtt_client, eventloop)
}

impl MqttClient {
    pub fn subscribed_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();

        topics.sort();
        topics
    }

    /// Re-issues every subscription still held. The broker forgets them when
    /// a clean session reconnects.
    pub fn resubscribe(&self) -> Result<()> {
        for topic in self.subscribed_topics() {
            self.client
                .try_subscribe(topic.as_str(), QoS::AtMostOnce)
                .wrap_err_with(|| format!("Failed to resubscribe to {}", topic))?;
        }

        Ok(())
    }

    /// Publishes retained state for consumers that connect later.
    pub fn publish_retained(&self, topic: &str, payload: String) -> Result<()> {
        self.client
            .try_publish(topic, QoS::AtLeastOnce, true, payload)
            .wrap_err_with(|| format!("Failed to publish to {}", topic))
    }
}

impl Transport for MqttClient {
    /// Always sent to the broker, so that a late subscriber still gets the
    /// retained messages of a shared topic.
    fn subscribe(&self, topic: &str) -> Result<()> {
        *self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(topic.to_string())
            .or_insert(0) += 1;

        self.client
            .try_subscribe(topic, QoS::AtMostOnce)
            .wrap_err_with(|| format!("Failed to subscribe to {}", topic))
    }

    fn unsubscribe(&self, topic: &str) -> Result<()> {
        {
            let mut subscriptions = self
                .subscriptions
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            match subscriptions.get_mut(topic) {
                Some(count) if *count > 1 => {
                    *count -= 1;
                    return Ok(());
                }
                Some(_) => {
                    subscriptions.remove(topic);
                }
                None => return Ok(()),
            }
        }

        self.client
            .try_unsubscribe(topic)
            .wrap_err_with(|| format!("Failed to unsubscribe from {}", topic))
    }

    fn publish(&self, topic: &str, payload: String) -> Result<()> {
        self.client
            .try_publish(topic, QoS::AtMostOnce, false, payload)
            .wrap_err_with(|| format!("Failed to publish to {}", topic))
    }
}
