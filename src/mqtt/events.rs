use std::{sync::Arc, time::Duration};

use color_eyre::Result;
use log::{debug, error, info};
use rumqttc::{Event, EventLoop, Packet};

use crate::{protocols::mqtt::MqttClient, registry::Registry, settings::Settings};

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Returns the `{id}` part of `topic` if it matches the entity command topic
/// template.
pub fn extract_entity_id<'a>(template: &str, topic: &'a str) -> Option<&'a str> {
    let (prefix, suffix) = template.split_once("{id}")?;

    let id = topic.strip_prefix(prefix)?.strip_suffix(suffix)?;

    if id.is_empty() || id.contains('/') {
        None
    } else {
        Some(id)
    }
}

pub fn handle_incoming_mqtt_event(
    event: Event,
    mqtt_client: &MqttClient,
    settings: &Settings,
    registry: &Registry,
    reconnecting: &mut bool,
) -> Result<()> {
    match event {
        Event::Incoming(Packet::ConnAck(_)) => {
            info!("Connected to MQTT broker at {}", settings.mqtt.host);

            // Requests queued before the first connection go out on their own
            if *reconnecting {
                mqtt_client.resubscribe()?;
            }
            *reconnecting = true;
        }
        Event::Incoming(Packet::Publish(msg)) => {
            if let Some(unique_id) = extract_entity_id(&settings.mqtt.entity_topic_set, &msg.topic)
            {
                debug!("Command for {}: {:?}", unique_id, msg.payload);
                registry.dispatch_command(unique_id, &msg.payload)?;
            } else if registry.route(&msg.topic, &msg.payload) == 0 {
                debug!("No Pixie device listens on {}", msg.topic);
            }
        }
        _ => {}
    }

    Ok(())
}

pub fn start_mqtt_events_loop(
    mut eventloop: EventLoop,
    mqtt_client: &MqttClient,
    settings: &Settings,
    registry: Arc<Registry>,
) {
    let mqtt_client = mqtt_client.clone();
    let settings = settings.clone();

    tokio::spawn(async move {
        let mut reconnecting = false;

        loop {
            match eventloop.poll().await {
                Ok(event) => {
                    let result = handle_incoming_mqtt_event(
                        event,
                        &mqtt_client,
                        &settings,
                        &registry,
                        &mut reconnecting,
                    );

                    if let Err(e) = result {
                        error!("Error while processing MQTT message: {:?}", e);
                    }
                }
                Err(e) => {
                    error!(
                        "MQTT connection error: {}. Reconnecting in {} seconds...",
                        e,
                        RECONNECT_DELAY.as_secs()
                    );
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    });
}
