use color_eyre::Result;
use derive_builder::Builder;
use eyre::WrapErr;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

use super::catalog::{is_effect, is_picture, is_transition, strip_quotes};

/// Availability payload published by a connected controller.
pub const ONLINE: &str = "online";

/// Longest transition the firmware accepts, in its own time units.
pub const MAX_TRANSITION: i64 = 4096;

pub fn decode_availability(payload: &[u8]) -> bool {
    payload == ONLINE.as_bytes()
}

fn decode_json<T: DeserializeOwned>(payload: &[u8]) -> Result<T> {
    let mut de = serde_json::Deserializer::from_slice(payload);
    let value: T = serde_path_to_error::deserialize(&mut de)?;
    de.end()?;

    Ok(value)
}

fn clamp_to_byte(value: f64) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

fn lenient_u8<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    f64::deserialize(deserializer).map(clamp_to_byte)
}

fn lenient_opt_u8<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u8>, D::Error> {
    Option::<f64>::deserialize(deserializer).map(|value| value.map(clamp_to_byte))
}

/// Distinguishes a key sent as `null` (`Some(None)`) from a missing key (`None`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorData {
    #[serde(deserialize_with = "lenient_u8")]
    pub r: u8,
    #[serde(deserialize_with = "lenient_u8")]
    pub g: u8,
    #[serde(deserialize_with = "lenient_u8")]
    pub b: u8,
    #[serde(default, deserialize_with = "lenient_opt_u8")]
    pub w: Option<u8>,
}

/// Partial state of one channel, as echoed by the controller on its channel
/// topic.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ChannelUpdate {
    pub state: String,
    pub color: Option<ColorData>,
    #[serde(default, deserialize_with = "lenient_opt_u8")]
    pub brightness: Option<u8>,
    #[serde(default, deserialize_with = "lenient_opt_u8")]
    pub white_value: Option<u8>,
    #[serde(default, deserialize_with = "lenient_opt_u8")]
    pub parameter1: Option<u8>,
    #[serde(default, deserialize_with = "lenient_opt_u8")]
    pub parameter2: Option<u8>,
    pub picture: Option<String>,
    pub effect: Option<String>,
}

impl ChannelUpdate {
    /// `None` when the reported state is neither on nor off.
    pub fn power(&self) -> Option<bool> {
        if self.state.eq_ignore_ascii_case("on") {
            Some(true)
        } else if self.state.eq_ignore_ascii_case("off") {
            Some(false)
        } else {
            None
        }
    }
}

pub fn decode_channel_update(payload: &[u8]) -> Result<ChannelUpdate> {
    decode_json(payload)
}

/// Controller attributes. Every field is `None` when the key is missing and
/// `Some(None)` when it was sent as `null`.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct AttributesUpdate {
    #[serde(default, deserialize_with = "present")]
    pub board_temperature: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub uptime: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub firmware_version: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub mac: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub ip_addr: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub url: Option<Option<String>>,
}

pub fn decode_attributes(payload: &[u8]) -> Result<AttributesUpdate> {
    decode_json(payload)
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OtaPhase {
    Start,
    End,
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OtaKind {
    Update,
    Check,
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct OtaReply {
    pub ota_state: OtaPhase,
    pub ota_type: OtaKind,
    pub result: i64,
    pub remote_version: Option<String>,
    pub running_version: Option<String>,
}

impl OtaReply {
    pub fn succeeded(&self) -> bool {
        self.result == 1
    }
}

pub fn decode_ota_reply(payload: &[u8]) -> Result<OtaReply> {
    decode_json(payload)
}

/// What the light should show once it is on. The controller runs at most one
/// of these at a time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Effect(String),
    Picture(String),
    Transition { name: Option<String>, duration: i64 },
}

impl Mode {
    pub fn effect(name: &str) -> Mode {
        Mode::Effect(strip_quotes(name).to_string())
    }

    pub fn picture(name: &str) -> Mode {
        Mode::Picture(strip_quotes(name).to_string())
    }

    pub fn transition(name: Option<&str>, duration: i64) -> Mode {
        Mode::Transition {
            name: name.map(|name| strip_quotes(name).to_string()),
            duration,
        }
    }

    /// Whether the named effect, picture or transition exists in the firmware.
    pub fn is_known(&self) -> bool {
        match self {
            Mode::Effect(name) => is_effect(name),
            Mode::Picture(name) => is_picture(name),
            Mode::Transition { name: Some(name), .. } => is_transition(name),
            Mode::Transition { name: None, .. } => true,
        }
    }
}

/// Requested color. Components are kept wide so that out-of-range input is
/// clamped at encoding time instead of wrapping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ColorIntent {
    pub r: i64,
    pub g: i64,
    pub b: i64,
    pub w: Option<i64>,
}

impl ColorIntent {
    pub fn rgb(r: i64, g: i64, b: i64) -> Self {
        ColorIntent { r, g, b, w: None }
    }

    pub fn rgbw(r: i64, g: i64, b: i64, w: i64) -> Self {
        ColorIntent { r, g, b, w: Some(w) }
    }
}

/// A command for one channel, built from user input before encoding.
#[derive(Builder, Clone, Debug, Default, PartialEq)]
#[builder(setter(into, strip_option), default)]
pub struct LightIntent {
    pub power: bool,
    pub brightness: Option<i64>,
    pub white_value: Option<i64>,
    pub parameter1: Option<i64>,
    pub parameter2: Option<i64>,
    pub color: Option<ColorIntent>,
    pub mode: Option<Mode>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
struct ColorPayload {
    r: u8,
    g: u8,
    b: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    w: Option<u8>,
}

#[derive(Serialize, Debug)]
struct CommandPayload<'a> {
    state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<ColorPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    brightness: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameter1: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameter2: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    white_value: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    effect: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    picture: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transition: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transition_name: Option<&'a str>,
}

fn clamp_byte(value: i64) -> u8 {
    value.clamp(0, 255) as u8
}

pub fn encode_command(intent: &LightIntent) -> Result<String> {
    // 0 would be read back as "on at zero brightness"
    let brightness = intent.brightness.map(|brightness| {
        if intent.power {
            brightness.clamp(1, 255) as u8
        } else {
            clamp_byte(brightness)
        }
    });

    let color = intent.color.map(|color| ColorPayload {
        r: clamp_byte(color.r),
        g: clamp_byte(color.g),
        b: clamp_byte(color.b),
        w: color.w.map(clamp_byte),
    });

    let mut payload = CommandPayload {
        state: if intent.power { "ON" } else { "OFF" },
        color,
        brightness,
        parameter1: intent.parameter1.map(clamp_byte),
        parameter2: intent.parameter2.map(clamp_byte),
        white_value: intent.white_value.map(clamp_byte),
        effect: None,
        picture: None,
        transition: None,
        transition_name: None,
    };

    match &intent.mode {
        Some(Mode::Effect(name)) => payload.effect = Some(name.as_str()),
        Some(Mode::Picture(name)) => payload.picture = Some(name.as_str()),
        Some(Mode::Transition { name, duration }) => {
            payload.transition = Some((*duration).clamp(0, MAX_TRANSITION) as u16);
            payload.transition_name = name.as_deref();
        }
        None => {}
    }

    serde_json::to_string(&payload).wrap_err("Failed to encode Pixie command")
}
