//! Host binding over MQTT: entity state publishing and the broker event loop.

pub mod entity_sink;
pub mod events;
