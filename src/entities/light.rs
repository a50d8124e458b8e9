use color_eyre::Result;
use log::warn;
use palette::{FromColor, Hsv, Srgb};
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

use crate::pixie::{
    catalog::EFFECTS,
    codec::{ColorIntent, LightIntent, Mode},
    coordinator::{Coordinator, Facet},
};

use super::{channel_entity_name, Commandable, DeviceInfo, Readable};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    Rgb,
    Rgbw,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LightAttributes {
    pub url: Option<String>,
    pub ip_addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter1: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter2: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LightState {
    pub id: String,
    pub name: String,
    pub available: bool,
    pub power: bool,
    pub brightness: u8,
    pub color_mode: ColorMode,
    pub rgb_color: [u8; 3],
    pub rgbw_color: Option<[u8; 4]>,
    pub white_value: u8,
    pub effect: Option<String>,
    pub effect_list: &'static [&'static str],
    pub attributes: LightAttributes,
    pub device: DeviceInfo,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LightService {
    TurnOn,
    TurnOff,
    SetEffect,
    SetRandomEffect,
    SetPicture,
    TurnOnTransition,
    TurnOffTransition,
    CheckOta,
}

/// A host service call, e.g. `{"service":"set_effect","effect":"Rainbow"}`.
/// Which of the optional fields are used depends on the service.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LightCall {
    pub service: LightService,
    pub brightness: Option<i64>,
    pub white_value: Option<i64>,
    pub parameter1: Option<i64>,
    pub parameter2: Option<i64>,
    pub rgb_color: Option<[i64; 3]>,
    pub rgbw_color: Option<[i64; 4]>,
    pub effect: Option<String>,
    pub picture: Option<String>,
    pub transition: Option<i64>,
    pub transition_name: Option<String>,
}

impl LightCall {
    fn color(&self) -> Option<ColorIntent> {
        match (self.rgbw_color, self.rgb_color) {
            (Some([r, g, b, w]), _) => Some(ColorIntent::rgbw(r, g, b, w)),
            (None, Some([r, g, b])) => Some(ColorIntent::rgb(r, g, b)),
            (None, None) => None,
        }
    }

    /// Intent carrying the tuning fields every "on" service accepts.
    fn tuned(&self, power: bool) -> LightIntent {
        LightIntent {
            power,
            brightness: self.brightness,
            parameter1: self.parameter1,
            parameter2: self.parameter2,
            color: self.color(),
            ..Default::default()
        }
    }
}

fn random_color<R: Rng>(rng: &mut R) -> ColorIntent {
    let hue: f32 = rng.gen_range(0.0..360.0);
    let hsv: Hsv = Hsv::new(hue, 1.0, 1.0);
    let rgb: Srgb = Srgb::from_color(hsv);
    let rgb: Srgb<u8> = rgb.into_format();

    ColorIntent::rgb(rgb.red.into(), rgb.green.into(), rgb.blue.into())
}

fn required<'a>(
    device_id: &str,
    call: &LightCall,
    value: Option<&'a str>,
    field: &str,
) -> Option<&'a str> {
    if value.is_none() {
        warn!(
            "[{}] A {} must be specified to run the service {:?}",
            device_id, field, call.service
        );
    }
    value
}

/// One light per device channel.
pub struct Light {
    id: String,
    name: String,
}

impl Light {
    pub fn new(coordinator: &Coordinator, name: Option<&str>) -> Self {
        Light {
            id: format!("pixie_{}_{}", coordinator.device_id(), coordinator.channel()),
            name: channel_entity_name(coordinator, name),
        }
    }

    /// Turns a host call into a device command. Returns `None` when the call
    /// names an unknown effect, picture or transition or lacks a required
    /// field.
    pub fn intent(&self, device_id: &str, call: &LightCall) -> Option<LightIntent> {
        let known = |mode: Mode| {
            if mode.is_known() {
                Some(mode)
            } else {
                warn!(
                    "[{}] The specified mode {:?} is not supported and is ignored",
                    device_id, mode
                );
                None
            }
        };

        match call.service {
            LightService::TurnOn => {
                let mode = if let Some(effect) = &call.effect {
                    Some(known(Mode::effect(effect))?)
                } else if let Some(picture) = &call.picture {
                    Some(known(Mode::picture(picture))?)
                } else if let Some(transition) = call.transition {
                    Some(known(Mode::transition(
                        call.transition_name.as_deref(),
                        transition,
                    ))?)
                } else {
                    None
                };

                Some(LightIntent {
                    white_value: call.white_value,
                    mode,
                    ..call.tuned(true)
                })
            }
            LightService::TurnOff => Some(LightIntent::default()),
            LightService::SetEffect => {
                let effect = required(device_id, call, call.effect.as_deref(), "effect")?;
                Some(LightIntent {
                    mode: Some(known(Mode::effect(effect))?),
                    ..call.tuned(true)
                })
            }
            LightService::SetRandomEffect => {
                let mut rng = rand::thread_rng();
                let effect = EFFECTS.choose(&mut rng)?;
                let intent = call.tuned(true);

                Some(LightIntent {
                    parameter1: intent.parameter1.or_else(|| Some(rng.gen_range(0..=255))),
                    parameter2: intent.parameter2.or_else(|| Some(rng.gen_range(0..=255))),
                    color: intent.color.or_else(|| Some(random_color(&mut rng))),
                    mode: Some(Mode::effect(effect)),
                    ..intent
                })
            }
            LightService::SetPicture => {
                let picture = required(device_id, call, call.picture.as_deref(), "picture")?;
                Some(LightIntent {
                    mode: Some(known(Mode::picture(picture))?),
                    ..call.tuned(true)
                })
            }
            LightService::TurnOnTransition | LightService::TurnOffTransition => {
                let name = required(
                    device_id,
                    call,
                    call.transition_name.as_deref(),
                    "transition_name",
                )?;
                let Some(duration) = call.transition else {
                    warn!(
                        "[{}] A transition must be specified to run the service {:?}",
                        device_id, call.service
                    );
                    return None;
                };
                let mode = Some(known(Mode::transition(Some(name), duration))?);

                if call.service == LightService::TurnOnTransition {
                    Some(LightIntent {
                        mode,
                        ..call.tuned(true)
                    })
                } else {
                    Some(LightIntent {
                        power: false,
                        parameter1: call.parameter1,
                        parameter2: call.parameter2,
                        mode,
                        ..Default::default()
                    })
                }
            }
            LightService::CheckOta => None,
        }
    }
}

impl Readable for Light {
    type State = LightState;

    fn unique_id(&self) -> String {
        self.id.clone()
    }

    fn facets(&self) -> &'static [Facet] {
        &[Facet::LightState, Facet::Attributes]
    }

    fn read(&self, coordinator: &Coordinator) -> LightState {
        let state = coordinator.snapshot();

        let color_mode = if state.color.w.is_some() {
            ColorMode::Rgbw
        } else {
            ColorMode::Rgb
        };

        let attributes = LightAttributes {
            url: state.local_url.clone(),
            ip_addr: state.ip_address.clone(),
            parameter1: state.power.then_some(state.parameter1),
            parameter2: state.power.then_some(state.parameter2),
            picture: state.active_picture.clone().filter(|_| state.power),
        };

        LightState {
            id: self.id.clone(),
            name: self.name.clone(),
            available: state.available,
            power: state.power,
            brightness: state.brightness,
            color_mode,
            rgb_color: state.color.rgb(),
            rgbw_color: state.color.rgbw(),
            white_value: state.white_value,
            effect: state.active_effect,
            effect_list: EFFECTS,
            attributes,
            device: DeviceInfo::read(coordinator),
        }
    }
}

impl Commandable for Light {
    fn command(&self, coordinator: &Coordinator, payload: &[u8]) -> Result<()> {
        let call: LightCall = serde_json::from_slice(payload)?;

        if call.service == LightService::CheckOta {
            coordinator.request_ota_check();
        } else if let Some(intent) = self.intent(coordinator.device_id(), &call) {
            coordinator.publish_command(&intent);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{json, Value};

    use super::*;
    use crate::{pixie::identity::DeviceIdentity, protocols::mock::RecordingTransport};

    const COMMAND_TOPIC: &str = "pixie_abc123/channel1/set";

    fn light() -> (Light, Coordinator, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::default());
        let coordinator = Coordinator::new(DeviceIdentity::new("abc123", 1).unwrap(), transport.clone());
        (Light::new(&coordinator, None), coordinator, transport)
    }

    fn commands(transport: &RecordingTransport) -> Vec<Value> {
        transport
            .published_to(COMMAND_TOPIC)
            .iter()
            .map(|payload| serde_json::from_str(payload).unwrap())
            .collect()
    }

    fn call(light: &Light, coordinator: &Coordinator, call: Value) {
        light
            .command(coordinator, call.to_string().as_bytes())
            .unwrap();
    }

    #[test]
    fn test_read_defaults() {
        let (light, coordinator, _) = light();
        let state = light.read(&coordinator);

        assert_eq!(light.unique_id(), "pixie_abc123_1");
        assert_eq!(state.name, "Pixie abc123 1");
        assert!(!state.available);
        assert!(!state.power);
        assert_eq!(state.brightness, 255);
        assert_eq!(state.color_mode, ColorMode::Rgb);
        assert_eq!(state.rgb_color, [255, 255, 255]);
        assert_eq!(state.effect_list, EFFECTS);
        assert_eq!(state.device.name, "Pixie");
        assert_eq!(state.device.manufacturer, "iothus14");
    }

    #[test]
    fn test_read_attributes_depend_on_power() {
        let (light, coordinator, _) = light();
        coordinator.handle_message(
            "pixie_abc123/attributes",
            br#"{"ip_addr":"10.0.0.7","url":"http://pixie-abc123.local"}"#,
        );
        coordinator.handle_message(
            "pixie_abc123/channel1",
            br#"{"state":"OFF","picture":"Dots","parameter1":3,"parameter2":4}"#,
        );

        let value = serde_json::to_value(light.read(&coordinator)).unwrap();
        assert_eq!(
            value["attributes"],
            json!({ "url": "http://pixie-abc123.local", "ip_addr": "10.0.0.7" })
        );

        coordinator.handle_message(
            "pixie_abc123/channel1",
            br#"{"state":"ON","picture":"Dots","color":{"r":1,"g":2,"b":3,"w":4}}"#,
        );

        let state = light.read(&coordinator);
        assert_eq!(state.attributes.parameter1, Some(3));
        assert_eq!(state.attributes.parameter2, Some(4));
        assert_eq!(state.attributes.picture.as_deref(), Some("Dots"));
        assert_eq!(state.color_mode, ColorMode::Rgbw);
        assert_eq!(state.rgbw_color, Some([1, 2, 3, 4]));
    }

    #[test]
    fn test_turn_on() {
        let (light, coordinator, transport) = light();

        call(
            &light,
            &coordinator,
            json!({ "service": "turn_on", "brightness": 0, "rgb_color": [300, 20, 30], "effect": "'Comet'" }),
        );

        assert_eq!(
            commands(&transport),
            vec![json!({
                "state": "ON",
                "color": { "r": 255, "g": 20, "b": 30 },
                "brightness": 1,
                "effect": "Comet"
            })]
        );
        // nothing changes until the device echoes the new state
        assert!(!coordinator.is_on());
    }

    #[test]
    fn test_turn_on_rgbw_wins_over_rgb() {
        let (light, coordinator, transport) = light();

        call(
            &light,
            &coordinator,
            json!({ "service": "turn_on", "rgb_color": [1, 2, 3], "rgbw_color": [4, 5, 6, 7] }),
        );

        assert_eq!(commands(&transport)[0]["color"], json!({ "r": 4, "g": 5, "b": 6, "w": 7 }));
    }

    #[test]
    fn test_turn_off() {
        let (light, coordinator, transport) = light();

        call(&light, &coordinator, json!({ "service": "turn_off", "brightness": 80 }));

        assert_eq!(commands(&transport), vec![json!({ "state": "OFF" })]);
    }

    #[test]
    fn test_unknown_effect_is_not_sent() {
        let (light, coordinator, transport) = light();

        call(&light, &coordinator, json!({ "service": "set_effect", "effect": "Foo" }));
        call(&light, &coordinator, json!({ "service": "turn_on", "effect": "Foo" }));
        call(&light, &coordinator, json!({ "service": "set_effect" }));

        assert!(transport.published().is_empty());
    }

    #[test]
    fn test_set_effect() {
        let (light, coordinator, transport) = light();

        call(
            &light,
            &coordinator,
            json!({ "service": "set_effect", "effect": "Rainbow", "parameter1": 10, "brightness": 128 }),
        );

        assert_eq!(
            commands(&transport),
            vec![json!({ "state": "ON", "brightness": 128, "parameter1": 10, "effect": "Rainbow" })]
        );
    }

    #[test]
    fn test_set_picture() {
        let (light, coordinator, transport) = light();

        call(&light, &coordinator, json!({ "service": "set_picture", "picture": "\"Dots\"" }));
        call(&light, &coordinator, json!({ "service": "set_picture", "picture": "Comet" }));

        assert_eq!(commands(&transport), vec![json!({ "state": "ON", "picture": "Dots" })]);
    }

    #[test]
    fn test_set_random_effect() {
        let (light, coordinator, transport) = light();

        call(&light, &coordinator, json!({ "service": "set_random_effect", "parameter2": 9 }));

        let command = &commands(&transport)[0];
        assert_eq!(command["state"], json!("ON"));
        assert!(EFFECTS.contains(&command["effect"].as_str().unwrap()));
        assert!(command["parameter1"].is_u64());
        assert_eq!(command["parameter2"], json!(9));
        assert!(command["color"]["r"].is_u64());
        assert!(command.get("brightness").is_none());
    }

    #[test]
    fn test_transitions() {
        let (light, coordinator, transport) = light();

        call(
            &light,
            &coordinator,
            json!({ "service": "turn_on_transition", "transition_name": "Fade", "transition": 5000, "brightness": 40 }),
        );
        call(
            &light,
            &coordinator,
            json!({ "service": "turn_off_transition", "transition_name": "Fade", "transition": 100, "brightness": 40 }),
        );
        call(
            &light,
            &coordinator,
            json!({ "service": "turn_off_transition", "transition_name": "Nope", "transition": 100 }),
        );
        call(
            &light,
            &coordinator,
            json!({ "service": "turn_on_transition", "transition_name": "Fade" }),
        );

        assert_eq!(
            commands(&transport),
            vec![
                json!({ "state": "ON", "brightness": 40, "transition": 4096, "transition_name": "Fade" }),
                json!({ "state": "OFF", "transition": 100, "transition_name": "Fade" }),
            ]
        );
    }

    #[test]
    fn test_check_ota() {
        let (light, coordinator, transport) = light();

        call(&light, &coordinator, json!({ "service": "check_ota" }));

        assert_eq!(transport.published_to("pixie_abc123/ota/check"), vec!["1"]);
    }

    #[test]
    fn test_unknown_service_is_an_error() {
        let (light, coordinator, transport) = light();

        assert!(light
            .command(&coordinator, br#"{"service":"blink"}"#)
            .is_err());
        assert!(transport.published().is_empty());
    }
}
