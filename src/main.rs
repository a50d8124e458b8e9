use std::sync::Arc;

use color_eyre::Result;
use log::info;
use mqtt::{entity_sink::MqttEntitySink, events::start_mqtt_events_loop};
use pixie::identity::DeviceIdentity;
use protocols::{mqtt::mk_mqtt_client, Transport};
use registry::Registry;

use crate::settings::read_settings;

mod entities;
mod mqtt;
mod pixie;
mod protocols;
mod registry;
mod settings;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    pretty_env_logger::init();

    let settings = read_settings()?;
    let (mqtt_client, eventloop) = mk_mqtt_client(&settings);
    let sink = Arc::new(MqttEntitySink::new(&mqtt_client, &settings));

    let registry = Arc::new(Registry::new(Arc::new(mqtt_client.clone()), sink));
    for device in &settings.devices {
        let identity = DeviceIdentity::new(device.device_id.clone(), device.channel)?;
        registry.add_device(identity, device.name.as_deref())?;
    }

    mqtt_client.subscribe(&settings.mqtt.entity_topic_set.replace("{id}", "+"))?;

    start_mqtt_events_loop(eventloop, &mqtt_client, &settings, registry.clone());

    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    registry.unload();

    Ok(())
}
