use serde::Serialize;

use crate::pixie::coordinator::{Coordinator, Facet};

use super::{channel_entity_name, Readable};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SensorState {
    pub id: String,
    pub name: String,
    pub available: bool,
    pub state: Option<f64>,
    pub unit_of_measurement: Option<&'static str>,
    pub device_class: Option<&'static str>,
    pub icon: &'static str,
}

pub struct BoardTemperatureSensor {
    id: String,
    name: String,
}

impl BoardTemperatureSensor {
    pub fn new(coordinator: &Coordinator, name: Option<&str>) -> Self {
        BoardTemperatureSensor {
            id: format!(
                "pixie_{}_{}_board_temperature",
                coordinator.device_id(),
                coordinator.channel()
            ),
            name: format!("{} Board Temperature", channel_entity_name(coordinator, name)),
        }
    }
}

impl Readable for BoardTemperatureSensor {
    type State = SensorState;

    fn unique_id(&self) -> String {
        self.id.clone()
    }

    fn facets(&self) -> &'static [Facet] {
        &[Facet::BoardTemperature]
    }

    fn read(&self, coordinator: &Coordinator) -> SensorState {
        SensorState {
            id: self.id.clone(),
            name: self.name.clone(),
            available: coordinator.available(),
            state: coordinator.board_temperature(),
            unit_of_measurement: Some("°C"),
            device_class: Some("temperature"),
            icon: "mdi:thermometer",
        }
    }
}

pub struct UptimeSensor {
    id: String,
    name: String,
}

impl UptimeSensor {
    pub fn new(coordinator: &Coordinator, name: Option<&str>) -> Self {
        UptimeSensor {
            id: format!(
                "pixie_{}_{}_uptime",
                coordinator.device_id(),
                coordinator.channel()
            ),
            name: format!("{} Uptime", channel_entity_name(coordinator, name)),
        }
    }
}

impl Readable for UptimeSensor {
    type State = SensorState;

    fn unique_id(&self) -> String {
        self.id.clone()
    }

    fn facets(&self) -> &'static [Facet] {
        &[Facet::Uptime]
    }

    fn read(&self, coordinator: &Coordinator) -> SensorState {
        SensorState {
            id: self.id.clone(),
            name: self.name.clone(),
            available: coordinator.available(),
            state: coordinator.uptime(),
            unit_of_measurement: Some("s"),
            device_class: None,
            icon: "mdi:clock-outline",
        }
    }
}
