use color_eyre::Result;
use eyre::eyre;

/// Highest channel index a Pixie controller exposes.
pub const MAX_CHANNEL: u8 = 3;

/// One controllable LED output on one physical Pixie unit.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
    device_id: String,
    channel: u8,
}

impl DeviceIdentity {
    /// Device ids are the last six hex digits of the controller's MAC address.
    pub fn new(device_id: impl Into<String>, channel: u8) -> Result<Self> {
        let device_id = device_id.into();

        if device_id.len() != 6 || !device_id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(eyre!(
                "Invalid Pixie device id {:?}: expected 6 hexadecimal characters",
                device_id
            ));
        }

        if channel > MAX_CHANNEL {
            return Err(eyre!(
                "Invalid channel {} for Pixie device {}: expected 0 to {}",
                channel,
                device_id,
                MAX_CHANNEL
            ));
        }

        Ok(DeviceIdentity { device_id, channel })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }
}

impl std::fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.device_id, self.channel)
    }
}
