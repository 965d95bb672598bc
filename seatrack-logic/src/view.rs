use serde::{Deserialize, Serialize};

use crate::{
    heading::{Heading, HeadingSourceKind},
    location::Location,
    settings::TileLayer,
    units::Knots,
};

const COMPASS_ARROW: &str = "/compass_arrow.png";
const MARKER_SIZE: u32 = 40;
const POPUP_TEXT: &str = "You are here";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, specta::Type)]
pub struct Viewport {
    pub center: Location,
    pub zoom: u8,
}

impl Viewport {
    /// Point the viewport at `center`, returns `false` if it was already there
    pub fn recenter(&mut self, center: Location) -> bool {
        if self.center == center {
            false
        } else {
            self.center = center;
            true
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, specta::Type)]
/// A custom marker icon, `html` is inserted as-is into the marker element
pub struct MarkerIcon {
    pub html: String,
    /// Width and height in px
    pub size: [u32; 2],
    /// Point of the icon (px from top left) that sits on the marker position
    pub anchor: [u32; 2],
    pub rotation: u16,
}

impl MarkerIcon {
    pub fn rotated(heading: Heading) -> Self {
        let deg = heading.degrees();
        Self {
            html: format!(
                r#"<img src="{COMPASS_ARROW}" width="{MARKER_SIZE}" height="{MARKER_SIZE}" style="transform: rotate({deg}deg); transform-origin: center center;" />"#
            ),
            size: [MARKER_SIZE, MARKER_SIZE],
            anchor: [MARKER_SIZE / 2, MARKER_SIZE / 2],
            rotation: deg,
        }
    }
}

/// Keeps the last built [MarkerIcon] and only rebuilds it when the heading changes.
#[derive(Debug, Clone)]
pub struct IconCache {
    heading: Heading,
    icon: MarkerIcon,
    builds: u32,
}

impl Default for IconCache {
    fn default() -> Self {
        Self {
            heading: Heading::NORTH,
            icon: MarkerIcon::rotated(Heading::NORTH),
            builds: 1,
        }
    }
}

impl IconCache {
    pub fn get(&mut self, heading: Heading) -> &MarkerIcon {
        if heading != self.heading {
            self.heading = heading;
            self.icon = MarkerIcon::rotated(heading);
            self.builds += 1;
        }
        &self.icon
    }

    /// Number of icons built so far
    pub fn builds(&self) -> u32 {
        self.builds
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, specta::Type)]
pub struct Marker {
    pub position: Location,
    pub icon: MarkerIcon,
    pub popup: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, specta::Type)]
/// The floating compass and readout
pub struct InfoPanel {
    pub compass_image: String,
    /// Degrees to rotate the compass image by
    pub compass_rotation: u16,
    pub heading: String,
    /// Only present once a speed has been measured
    pub speed: Option<String>,
    pub heading_source: Option<HeadingSourceKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
pub struct ToggleButton {
    pub label: String,
    /// CSS background color
    pub color: String,
    pub tracking: bool,
}

impl ToggleButton {
    pub fn for_state(tracking: bool) -> Self {
        let (label, color) = if tracking {
            ("Stop Tracking", "#e91e63")
        } else {
            ("Start Tracking", "#1976d2")
        };
        Self {
            label: label.to_string(),
            color: color.to_string(),
            tracking,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, specta::Type)]
/// Everything the webview needs to draw the map screen
pub struct RenderedView {
    pub viewport: Viewport,
    /// Drawn in order, base map first
    pub tile_layers: Vec<TileLayer>,
    pub marker: Marker,
    pub panel: InfoPanel,
    pub toggle: ToggleButton,
}

/// Inputs to [render]
pub struct ViewInputs<'a> {
    pub viewport: Viewport,
    pub position: Location,
    pub heading: Heading,
    pub heading_source: Option<HeadingSourceKind>,
    pub speed: Option<Knots>,
    pub tracking: bool,
    pub layers: [&'a TileLayer; 2],
}

pub fn render(inputs: ViewInputs<'_>, icons: &mut IconCache) -> RenderedView {
    let icon = icons.get(inputs.heading).clone();
    RenderedView {
        viewport: inputs.viewport,
        tile_layers: inputs.layers.into_iter().cloned().collect(),
        marker: Marker {
            position: inputs.position,
            icon,
            popup: POPUP_TEXT.to_string(),
        },
        panel: InfoPanel {
            compass_image: COMPASS_ARROW.to_string(),
            compass_rotation: inputs.heading.degrees(),
            heading: inputs.heading.to_string(),
            speed: inputs.speed.map(|s| format!("{s} knots")),
            heading_source: inputs.heading_source,
        },
        toggle: ToggleButton::for_state(inputs.tracking),
    }
}
