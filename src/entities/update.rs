use color_eyre::Result;
use serde::{Deserialize, Serialize};

use crate::pixie::coordinator::{Coordinator, Facet};

use super::{Commandable, Readable};

pub const RELEASE_URL: &str = "https://github.com/iothus14/Pixie/releases/";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UpdateState {
    pub id: String,
    pub name: String,
    pub title: &'static str,
    pub installed_version: Option<String>,
    pub latest_version: Option<String>,
    pub in_progress: bool,
    pub update_available: bool,
    pub release_url: &'static str,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpdateAction {
    Install,
    Check,
}

#[derive(Clone, Debug, Deserialize)]
struct UpdateCommand {
    action: UpdateAction,
}

/// Firmware of a whole controller, shared by all of its channels.
pub struct FirmwareUpdate {
    id: String,
    name: String,
}

impl FirmwareUpdate {
    pub fn new(coordinator: &Coordinator) -> Self {
        FirmwareUpdate {
            id: Self::unique_id_for(coordinator.device_id()),
            name: format!("Pixie {} Firmware Update", coordinator.device_id()),
        }
    }

    pub fn unique_id_for(device_id: &str) -> String {
        format!("pixie_{}_firmware_update", device_id)
    }
}

impl Readable for FirmwareUpdate {
    type State = UpdateState;

    fn unique_id(&self) -> String {
        self.id.clone()
    }

    fn facets(&self) -> &'static [Facet] {
        &[Facet::Ota]
    }

    fn read(&self, coordinator: &Coordinator) -> UpdateState {
        UpdateState {
            id: self.id.clone(),
            name: self.name.clone(),
            title: "Pixie",
            installed_version: coordinator.firmware_version(),
            latest_version: coordinator.available_version(),
            in_progress: coordinator.ota_in_progress(),
            update_available: coordinator.update_available(),
            release_url: RELEASE_URL,
        }
    }
}

impl Commandable for FirmwareUpdate {
    fn command(&self, coordinator: &Coordinator, payload: &[u8]) -> Result<()> {
        let command: UpdateCommand = serde_json::from_slice(payload)?;

        match command.action {
            UpdateAction::Install => coordinator.request_ota_install(),
            UpdateAction::Check => coordinator.request_ota_check(),
        }

        Ok(())
    }
}
