use color_eyre::Result;

use crate::{entities::EntitySink, protocols::mqtt::MqttClient, settings::Settings};

/// Fills `{id}` in an entity topic template.
pub fn entity_topic(template: &str, unique_id: &str) -> String {
    template.replace("{id}", unique_id)
}

/// Publishes entity state as retained JSON under `entity_topic`.
pub struct MqttEntitySink {
    mqtt_client: MqttClient,
    topic_template: String,
}

impl MqttEntitySink {
    pub fn new(mqtt_client: &MqttClient, settings: &Settings) -> Self {
        MqttEntitySink {
            mqtt_client: mqtt_client.clone(),
            topic_template: settings.mqtt.entity_topic.clone(),
        }
    }
}

impl EntitySink for MqttEntitySink {
    fn publish_entity(&self, unique_id: &str, json: String) -> Result<()> {
        let topic = entity_topic(&self.topic_template, unique_id);
        self.mqtt_client.publish_retained(&topic, json)
    }
}
