use serde::Serialize;

use super::codec::{AttributesUpdate, ChannelUpdate, OtaKind, OtaPhase, OtaReply};

/// A named slice of [`DeviceState`] that observers are notified about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Facet {
    LightState,
    Uptime,
    BoardTemperature,
    PictureSelection,
    EffectSelection,
    Attributes,
    Ota,
}

impl Facet {
    /// Facets whose observers report availability and must be refreshed when
    /// the controller goes online or offline.
    pub const AVAILABILITY_LINKED: [Facet; 5] = [
        Facet::LightState,
        Facet::Uptime,
        Facet::BoardTemperature,
        Facet::PictureSelection,
        Facet::EffectSelection,
    ];

    /// Facets touched by a channel state message, in notification order.
    pub const CHANNEL_STATE: [Facet; 3] = [
        Facet::EffectSelection,
        Facet::PictureSelection,
        Facet::LightState,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub w: Option<u8>,
}

impl Default for Color {
    fn default() -> Self {
        Color {
            r: 255,
            g: 255,
            b: 255,
            w: None,
        }
    }
}

impl Color {
    pub fn rgb(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    pub fn rgbw(&self) -> Option<[u8; 4]> {
        self.w.map(|w| [self.r, self.g, self.b, w])
    }
}

/// Encodes `X.Y.Z` as `100 * X + 10 * Y + Z`. Anything that is not exactly
/// three unsigned integers yields `None`.
pub fn version_ordinal(version: &str) -> Option<u32> {
    let parts: Vec<&str> = version.split('.').collect();
    let [major, minor, patch] = parts.as_slice() else {
        return None;
    };

    let major: u32 = major.trim().parse().ok()?;
    let minor: u32 = minor.trim().parse().ok()?;
    let patch: u32 = patch.trim().parse().ok()?;

    major
        .checked_mul(100)?
        .checked_add(minor.checked_mul(10)?)?
        .checked_add(patch)
}

/// How an OTA reply was interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OtaOutcome {
    UpdateStarted,
    UpdateFinished,
    UpdateFailed,
    CheckFinished,
    CheckFailed,
    Ignored,
}

/// Last known state of one device channel.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DeviceState {
    pub available: bool,
    pub power: bool,
    pub color: Color,
    pub brightness: u8,
    pub white_value: u8,
    pub parameter1: u8,
    pub parameter2: u8,
    pub active_picture: Option<String>,
    pub active_effect: Option<String>,

    pub board_temperature: Option<f64>,
    pub uptime: Option<f64>,

    pub firmware_version: Option<String>,
    pub firmware_version_ordinal: u32,
    pub available_version: Option<String>,
    pub available_version_ordinal: u32,
    pub ota_in_progress: bool,

    pub mac_address: Option<String>,
    pub ip_address: Option<String>,
    pub local_url: Option<String>,
}

impl Default for DeviceState {
    fn default() -> Self {
        DeviceState {
            available: false,
            power: false,
            color: Color::default(),
            brightness: 255,
            white_value: 0,
            parameter1: 0,
            parameter2: 0,
            active_picture: None,
            active_effect: None,
            board_temperature: None,
            uptime: None,
            firmware_version: None,
            firmware_version_ordinal: 0,
            available_version: None,
            available_version_ordinal: 0,
            ota_in_progress: false,
            mac_address: None,
            ip_address: None,
            local_url: None,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|value| !value.is_empty())
}

impl DeviceState {
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    /// The controller restates picture and effect on every channel message,
    /// so a missing key clears them. Numeric fields are only sent when they
    /// matter for the current mode and keep their previous value otherwise.
    pub fn apply_channel_update(&mut self, update: &ChannelUpdate) {
        self.active_picture = non_empty(&update.picture);
        self.active_effect = non_empty(&update.effect);

        if let Some(power) = update.power() {
            self.power = power;
        }

        if let Some(color) = update.color {
            self.color = Color {
                r: color.r,
                g: color.g,
                b: color.b,
                w: color.w,
            };
        }

        if let Some(parameter1) = update.parameter1 {
            self.parameter1 = parameter1;
        }

        if let Some(parameter2) = update.parameter2 {
            self.parameter2 = parameter2;
        }

        if let Some(brightness) = update.brightness {
            self.brightness = brightness;
        }

        if let Some(white_value) = update.white_value {
            self.white_value = white_value;
        }
    }

    /// Applies every attribute present in the message and returns the facet to
    /// notify for each of them. The order is fixed: board temperature, uptime,
    /// firmware version, ip address, mac address, url.
    pub fn apply_attributes(&mut self, update: &AttributesUpdate) -> Vec<Facet> {
        let mut facets = vec![];

        if let Some(board_temperature) = update.board_temperature {
            self.board_temperature = board_temperature;
            facets.push(Facet::BoardTemperature);
        }

        if let Some(uptime) = update.uptime {
            self.uptime = uptime;
            facets.push(Facet::Uptime);
        }

        if let Some(firmware_version) = &update.firmware_version {
            self.set_reported_firmware_version(firmware_version.clone());
            if self.firmware_version.is_some() {
                facets.push(Facet::Attributes);
            }
        }

        if let Some(ip_addr) = &update.ip_addr {
            self.ip_address = ip_addr.clone();
            if self.ip_address.is_some() {
                facets.push(Facet::Attributes);
            }
        }

        if let Some(mac) = &update.mac {
            self.mac_address = mac.clone();
            if self.mac_address.is_some() {
                facets.push(Facet::Attributes);
            }
        }

        if let Some(url) = &update.url {
            self.local_url = url.clone();
            if self.local_url.is_some() {
                facets.push(Facet::Attributes);
            }
        }

        facets
    }

    /// The attributes message carries the firmware's own version label, which
    /// is stored as is. Its ordinal only follows when the label is well formed.
    fn set_reported_firmware_version(&mut self, version: Option<String>) {
        if let Some(ordinal) = version.as_deref().and_then(version_ordinal) {
            self.firmware_version_ordinal = ordinal;
        }

        self.firmware_version = version;
    }

    pub fn apply_ota_reply(&mut self, reply: &OtaReply) -> OtaOutcome {
        match (reply.ota_state, reply.ota_type, reply.succeeded()) {
            (OtaPhase::Start, OtaKind::Update, true) => {
                self.ota_in_progress = true;
                OtaOutcome::UpdateStarted
            }
            (OtaPhase::End, OtaKind::Update, true) => {
                self.ota_in_progress = false;
                if self.available_version.is_some() {
                    self.firmware_version = self.available_version.clone();
                    self.firmware_version_ordinal = self.available_version_ordinal;
                }
                OtaOutcome::UpdateFinished
            }
            (OtaPhase::End, OtaKind::Update, false) => {
                self.ota_in_progress = false;
                OtaOutcome::UpdateFailed
            }
            (OtaPhase::End, OtaKind::Check, false) => OtaOutcome::CheckFailed,
            (OtaPhase::End, OtaKind::Check, true) => {
                if let Some(remote_version) = &reply.remote_version {
                    if let Some(ordinal) = version_ordinal(remote_version) {
                        self.available_version = Some(remote_version.clone());
                        self.available_version_ordinal = ordinal;
                    }
                }

                if let Some(running_version) = &reply.running_version {
                    if let Some(ordinal) = version_ordinal(running_version) {
                        self.firmware_version = Some(running_version.clone());
                        self.firmware_version_ordinal = ordinal;
                    }
                }

                OtaOutcome::CheckFinished
            }
            _ => OtaOutcome::Ignored,
        }
    }

    pub fn update_available(&self) -> bool {
        self.available_version.is_some()
            && self.available_version_ordinal > self.firmware_version_ordinal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixie::codec::{decode_attributes, decode_channel_update, decode_ota_reply};

    fn apply_channel(state: &mut DeviceState, payload: &str) {
        state.apply_channel_update(&decode_channel_update(payload.as_bytes()).unwrap());
    }

    fn apply_ota(state: &mut DeviceState, payload: &str) -> OtaOutcome {
        state.apply_ota_reply(&decode_ota_reply(payload.as_bytes()).unwrap())
    }

    #[test]
    fn test_defaults() {
        let state = DeviceState::default();

        assert!(!state.available);
        assert!(!state.power);
        assert_eq!(state.color.rgb(), [255, 255, 255]);
        assert_eq!(state.color.rgbw(), None);
        assert_eq!(state.brightness, 255);
        assert_eq!(state.parameter1, 0);
        assert_eq!(state.parameter2, 0);
        assert!(!state.ota_in_progress);
    }

    #[test]
    fn test_version_ordinal() {
        assert_eq!(version_ordinal("1.2.3"), Some(123));
        assert_eq!(version_ordinal("2.0.10"), Some(210));
        assert_eq!(version_ordinal("0.0.0"), Some(0));
        assert_eq!(version_ordinal("1.2"), None);
        assert_eq!(version_ordinal("1.2.3.4"), None);
        assert_eq!(version_ordinal("1.x.3"), None);
        assert_eq!(version_ordinal(""), None);
    }

    #[test]
    fn test_channel_update_is_idempotent() {
        let payload = r#"{"state":"on","color":{"r":1,"g":2,"b":3},"brightness":90,"effect":"Comet"}"#;

        let mut once = DeviceState::default();
        apply_channel(&mut once, payload);

        let mut twice = once.clone();
        apply_channel(&mut twice, payload);

        assert_eq!(once, twice);
        assert!(once.power);
        assert_eq!(once.color.rgb(), [1, 2, 3]);
        assert_eq!(once.brightness, 90);
        assert_eq!(once.active_effect.as_deref(), Some("Comet"));
    }

    #[test]
    fn test_missing_picture_and_effect_reset() {
        let mut state = DeviceState::default();
        apply_channel(&mut state, r#"{"state":"ON","picture":"Dots","parameter1":5}"#);
        assert_eq!(state.active_picture.as_deref(), Some("Dots"));

        apply_channel(&mut state, r#"{"state":"ON","effect":"Rainbow"}"#);
        assert_eq!(state.active_picture, None);
        assert_eq!(state.active_effect.as_deref(), Some("Rainbow"));

        apply_channel(&mut state, r#"{"state":"ON"}"#);
        assert_eq!(state.active_picture, None);
        assert_eq!(state.active_effect, None);

        // numeric fields survive messages that omit them
        assert_eq!(state.parameter1, 5);
    }

    #[test]
    fn test_empty_picture_counts_as_absent() {
        let mut state = DeviceState::default();
        apply_channel(&mut state, r#"{"state":"ON","picture":"","effect":null}"#);

        assert_eq!(state.active_picture, None);
        assert_eq!(state.active_effect, None);
    }

    #[test]
    fn test_unknown_power_state_keeps_power() {
        let mut state = DeviceState::default();
        apply_channel(&mut state, r#"{"state":"ON"}"#);
        apply_channel(&mut state, r#"{"state":"unknown","brightness":3}"#);

        assert!(state.power);
        assert_eq!(state.brightness, 3);
    }

    #[test]
    fn test_white_component_follows_device() {
        let mut state = DeviceState::default();
        apply_channel(&mut state, r#"{"state":"ON","color":{"r":1,"g":2,"b":3,"w":4}}"#);
        assert_eq!(state.color.rgbw(), Some([1, 2, 3, 4]));

        apply_channel(&mut state, r#"{"state":"ON","color":{"r":1,"g":2,"b":3}}"#);
        assert_eq!(state.color.rgbw(), None);
    }

    #[test]
    fn test_attributes_report_one_facet_per_key() {
        let mut state = DeviceState::default();
        let update = decode_attributes(
            br#"{"board_temperature":40,"uptime":12,"firmware_version":"1.2.3","mac":"aa","ip_addr":null}"#,
        )
        .unwrap();

        let facets = state.apply_attributes(&update);

        assert_eq!(
            facets,
            vec![
                Facet::BoardTemperature,
                Facet::Uptime,
                Facet::Attributes,
                Facet::Attributes
            ]
        );
        assert_eq!(state.board_temperature, Some(40.0));
        assert_eq!(state.uptime, Some(12.0));
        assert_eq!(state.firmware_version.as_deref(), Some("1.2.3"));
        assert_eq!(state.firmware_version_ordinal, 123);
        assert_eq!(state.mac_address.as_deref(), Some("aa"));
        assert_eq!(state.ip_address, None);
    }

    #[test]
    fn test_attribute_facets_follow_fixed_order() {
        let mut state = DeviceState::default();
        let update = decode_attributes(br#"{"url":"http://x","uptime":5,"board_temperature":30}"#)
            .unwrap();

        assert_eq!(
            state.apply_attributes(&update),
            vec![Facet::BoardTemperature, Facet::Uptime, Facet::Attributes]
        );
    }

    #[test]
    fn test_attributes_replay_is_idempotent() {
        let update = decode_attributes(
            br#"{"board_temperature":40,"uptime":12,"firmware_version":"1.2.3","mac":"aa","ip_addr":"10.0.0.1","url":null}"#,
        )
        .unwrap();

        let mut once = DeviceState::default();
        let first = once.apply_attributes(&update);

        let mut twice = once.clone();
        let second = twice.apply_attributes(&update);

        assert_eq!(once, twice);
        assert_eq!(first, second);
    }

    #[test]
    fn test_update_end_replay_is_idempotent() {
        let mut state = DeviceState::default();
        apply_ota(
            &mut state,
            r#"{"ota_state":"end","ota_type":"check","result":1,"remote_version":"1.3.0","running_version":"1.2.9"}"#,
        );
        apply_ota(&mut state, r#"{"ota_state":"start","ota_type":"update","result":1}"#);

        let end = r#"{"ota_state":"end","ota_type":"update","result":1}"#;
        assert_eq!(apply_ota(&mut state, end), OtaOutcome::UpdateFinished);
        let once = state.clone();
        assert_eq!(apply_ota(&mut state, end), OtaOutcome::UpdateFinished);

        assert_eq!(state, once);
        assert_eq!(state.firmware_version_ordinal, 130);
        assert!(!state.ota_in_progress);
    }

    #[test]
    fn test_attribute_firmware_label_keeps_ordinal_when_malformed() {
        let mut state = DeviceState::default();
        state.apply_attributes(&decode_attributes(br#"{"firmware_version":"1.2.3"}"#).unwrap());
        state.apply_attributes(&decode_attributes(br#"{"firmware_version":"dev"}"#).unwrap());

        assert_eq!(state.firmware_version.as_deref(), Some("dev"));
        assert_eq!(state.firmware_version_ordinal, 123);
    }

    #[test]
    fn test_ota_update_sequence() {
        let mut state = DeviceState::default();

        assert_eq!(
            apply_ota(
                &mut state,
                r#"{"ota_state":"end","ota_type":"check","result":1,"remote_version":"1.3.0","running_version":"1.2.9"}"#
            ),
            OtaOutcome::CheckFinished
        );
        assert_eq!(state.available_version.as_deref(), Some("1.3.0"));
        assert_eq!(state.available_version_ordinal, 130);
        assert_eq!(state.firmware_version.as_deref(), Some("1.2.9"));
        assert_eq!(state.firmware_version_ordinal, 129);
        assert!(state.update_available());

        assert_eq!(
            apply_ota(&mut state, r#"{"ota_state":"start","ota_type":"update","result":1}"#),
            OtaOutcome::UpdateStarted
        );
        assert!(state.ota_in_progress);

        assert_eq!(
            apply_ota(&mut state, r#"{"ota_state":"end","ota_type":"update","result":1}"#),
            OtaOutcome::UpdateFinished
        );
        assert!(!state.ota_in_progress);
        assert_eq!(state.firmware_version.as_deref(), Some("1.3.0"));
        assert_eq!(state.firmware_version_ordinal, 130);
        assert!(!state.update_available());
    }

    #[test]
    fn test_ota_update_failure_clears_progress() {
        let mut state = DeviceState::default();
        apply_ota(&mut state, r#"{"ota_state":"start","ota_type":"update","result":1}"#);

        assert_eq!(
            apply_ota(&mut state, r#"{"ota_state":"end","ota_type":"update","result":0}"#),
            OtaOutcome::UpdateFailed
        );
        assert!(!state.ota_in_progress);
        assert_eq!(state.firmware_version, None);
    }

    #[test]
    fn test_ota_check_failure_leaves_progress() {
        let mut state = DeviceState::default();
        apply_ota(&mut state, r#"{"ota_state":"start","ota_type":"update","result":1}"#);

        assert_eq!(
            apply_ota(&mut state, r#"{"ota_state":"end","ota_type":"check","result":2}"#),
            OtaOutcome::CheckFailed
        );
        assert!(state.ota_in_progress);
    }

    #[test]
    fn test_ota_check_ignores_malformed_versions() {
        let mut state = DeviceState::default();
        apply_ota(
            &mut state,
            r#"{"ota_state":"end","ota_type":"check","result":1,"remote_version":"1.2.3"}"#,
        );
        apply_ota(
            &mut state,
            r#"{"ota_state":"end","ota_type":"check","result":1,"remote_version":"1.2","running_version":"1.2.3.4"}"#,
        );

        assert_eq!(state.available_version.as_deref(), Some("1.2.3"));
        assert_eq!(state.available_version_ordinal, 123);
        assert_eq!(state.firmware_version, None);
        assert_eq!(state.firmware_version_ordinal, 0);
    }

    #[test]
    fn test_ota_unknown_phase_is_ignored() {
        let mut state = DeviceState::default();
        let before = state.clone();

        assert_eq!(
            apply_ota(&mut state, r#"{"ota_state":"start","ota_type":"check","result":1}"#),
            OtaOutcome::Ignored
        );
        assert_eq!(state, before);
    }
}
