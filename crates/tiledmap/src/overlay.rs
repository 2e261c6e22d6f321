//! Hover inspection of rendered features.
//!
//! The interaction grid layer resolves the feature under the pointer from its
//! per-pixel identifier grid and emits the feature's attributes. This module
//! turns those events into info panel markup; it never touches the network.

use std::sync::Arc;

use askama::Template;
use serde::{Deserialize, Serialize};
use tiledmap_core::logging::targets;
use tiledmap_core::{Property, Signal};

use crate::error::Result;
use crate::surface::ControlPosition;

/// Attributes the grid carries for one feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureAttributes {
    #[serde(alias = "_id")]
    pub id: u64,
    #[serde(default)]
    pub species: String,
    #[serde(default)]
    pub scientific_name: String,
    /// Number of records drawn on the same pixel.
    #[serde(default)]
    pub count: u64,
}

impl FeatureAttributes {
    /// Key identifying the feature across grid tiles.
    pub fn key(&self) -> String {
        format!("{}/{}/{}", self.id, self.species, self.scientific_name)
    }
}

/// What the info panel is showing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InfoPanelState {
    #[default]
    Idle,
    Hovering(FeatureAttributes),
}

pub const IDLE_PROMPT: &str = "Hover over a marker";

/// Heading plus the idle prompt.
#[derive(Template)]
#[template(
    source = "<h4>{{ dataset_name }} Records</h4><p>{{ prompt }}</p>",
    ext = "html"
)]
struct IdlePanel<'a> {
    dataset_name: &'a str,
    prompt: &'a str,
}

/// Heading plus the hovered feature's attributes.
#[derive(Template)]
#[template(
    source = "<h4>{{ dataset_name }} Records</h4><b>{{ feature.species }}</b><br />{{ feature.id }}<br />{{ feature.scientific_name }}<br />{{ feature.count }} records overlapping",
    ext = "html"
)]
struct HoverPanel<'a> {
    dataset_name: &'a str,
    feature: &'a FeatureAttributes,
}

/// Render the info panel for a dataset. Interpolated text is HTML-escaped.
pub fn render_info_panel(dataset_name: &str, state: &InfoPanelState) -> Result<String> {
    let html = match state {
        InfoPanelState::Idle => IdlePanel {
            dataset_name,
            prompt: IDLE_PROMPT,
        }
        .render()?,
        InfoPanelState::Hovering(feature) => HoverPanel {
            dataset_name,
            feature,
        }
        .render()?,
    };
    Ok(html)
}

/// Hover events emitted by one interaction grid layer.
///
/// A fresh set is created for every grid layer, so events from a layer that
/// a redraw already replaced reach nobody.
#[derive(Debug, Default)]
pub struct GridEvents {
    pub mouseover: Signal<FeatureAttributes>,
    pub mouseout: Signal<()>,
}

impl GridEvents {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

/// The info panel control.
///
/// Shared between the view, which attaches it to the map, and the slots bound
/// to the current grid layer's events.
pub struct InfoControl {
    dataset_name: String,
    position: ControlPosition,
    state: Property<InfoPanelState>,
    html: Property<String>,
    content_changed: Signal<String>,
}

impl InfoControl {
    pub fn new(dataset_name: impl Into<String>, position: ControlPosition) -> Arc<Self> {
        let dataset_name = dataset_name.into();
        let html = render_info_panel(&dataset_name, &InfoPanelState::Idle).unwrap_or_else(|err| {
            tracing::error!(target: targets::OVERLAY, %err, "idle panel failed to render");
            String::new()
        });
        Arc::new(Self {
            dataset_name,
            position,
            state: Property::new(InfoPanelState::Idle),
            html: Property::new(html),
            content_changed: Signal::new(),
        })
    }

    pub fn position(&self) -> ControlPosition {
        self.position
    }

    pub fn state(&self) -> InfoPanelState {
        self.state.get()
    }

    /// Current panel markup.
    pub fn html(&self) -> String {
        self.html.get()
    }

    /// Emitted with the new markup whenever the panel content changes.
    pub fn content_changed(&self) -> &Signal<String> {
        &self.content_changed
    }

    pub fn on_hover(&self, feature: FeatureAttributes) {
        tracing::trace!(target: targets::OVERLAY, key = %feature.key(), "feature hovered");
        self.update(InfoPanelState::Hovering(feature));
    }

    pub fn on_leave(&self) {
        self.update(InfoPanelState::Idle);
    }

    fn update(&self, state: InfoPanelState) {
        let html = match render_info_panel(&self.dataset_name, &state) {
            Ok(html) => html,
            Err(err) => {
                tracing::error!(target: targets::OVERLAY, %err, "info panel failed to render");
                return;
            }
        };
        self.state.set(state);
        if self.html.set(html.clone()) {
            self.content_changed.emit(html);
        }
    }
}

impl std::fmt::Debug for InfoControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfoControl")
            .field("dataset_name", &self.dataset_name)
            .field("position", &self.position)
            .field("state", &self.state.get())
            .finish()
    }
}

/// Route a grid layer's hover events into the info control.
pub fn bind_grid_events(events: &GridEvents, control: &Arc<InfoControl>) {
    let hovered = Arc::clone(control);
    events
        .mouseover
        .connect(move |feature| hovered.on_hover(feature.clone()));
    let left = Arc::clone(control);
    events.mouseout.connect(move |_| left.on_leave());
}
