use color_eyre::Result;
use log::warn;
use serde::Serialize;

use crate::pixie::{
    catalog::{EFFECTS, PICTURES},
    coordinator::{Coordinator, Facet},
};

use super::{channel_entity_name, Commandable, Readable};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SelectState {
    pub id: String,
    pub name: String,
    pub available: bool,
    pub current_option: Option<String>,
    pub options: &'static [&'static str],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectKind {
    Picture,
    Effect,
}

/// Read-only view of the active picture or effect. The firmware has no way
/// to select one directly.
pub struct Select {
    kind: SelectKind,
    id: String,
    name: String,
}

impl Select {
    pub fn new(kind: SelectKind, coordinator: &Coordinator, name: Option<&str>) -> Self {
        let (suffix, label) = match kind {
            SelectKind::Picture => ("picture", "Picture"),
            SelectKind::Effect => ("effect", "Effect"),
        };

        Select {
            kind,
            id: format!(
                "pixie_{}_{}_{}",
                coordinator.device_id(),
                coordinator.channel(),
                suffix
            ),
            name: format!("{} {}", channel_entity_name(coordinator, name), label),
        }
    }
}

impl Readable for Select {
    type State = SelectState;

    fn unique_id(&self) -> String {
        self.id.clone()
    }

    fn facets(&self) -> &'static [Facet] {
        match self.kind {
            SelectKind::Picture => &[Facet::PictureSelection],
            SelectKind::Effect => &[Facet::EffectSelection],
        }
    }

    fn read(&self, coordinator: &Coordinator) -> SelectState {
        let (current_option, options) = match self.kind {
            SelectKind::Picture => (coordinator.picture(), PICTURES),
            SelectKind::Effect => (coordinator.effect(), EFFECTS),
        };

        SelectState {
            id: self.id.clone(),
            name: self.name.clone(),
            available: coordinator.available(),
            current_option,
            options,
        }
    }
}

impl Commandable for Select {
    fn command(&self, coordinator: &Coordinator, _payload: &[u8]) -> Result<()> {
        warn!(
            "[{}] {} does not support selecting an option",
            coordinator.device_id(),
            self.name
        );
        Ok(())
    }
}
