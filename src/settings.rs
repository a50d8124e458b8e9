use serde::Deserialize;

#[derive(Clone, Deserialize, Debug)]
pub struct MqttSettings {
    pub id: String,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_seconds: Option<u64>,

    /// Capacity of the outgoing request queue shared by all coordinators.
    pub request_capacity: Option<usize>,

    /// Topic template for published entity state, `{id}` is replaced with the
    /// entity's unique id.
    pub entity_topic: String,

    /// Topic template for incoming entity commands.
    pub entity_topic_set: String,
}

#[derive(Clone, Deserialize, Debug)]
pub struct DeviceSettings {
    pub device_id: String,
    pub channel: u8,
    pub name: Option<String>,
}

#[derive(Clone, Deserialize, Debug)]
pub struct Settings {
    pub mqtt: MqttSettings,
    pub devices: Vec<DeviceSettings>,
}

pub fn read_settings() -> Result<Settings, config::ConfigError> {
    config::Config::builder()
        .add_source(config::File::with_name("Settings"))
        .add_source(config::Environment::with_prefix("PIXIE_MQTT").separator("__"))
        .build()?
        .try_deserialize::<Settings>()
}
