use serde::{Deserialize, Serialize};

use crate::location::{Location, WatchOptions};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
/// A raster tile source handed to the map
pub struct TileLayer {
    /// Slippy-map URL template with `{s}`, `{z}`, `{x}` and `{y}` placeholders
    pub url: String,
    /// HTML attribution shown in the map corner
    pub attribution: String,
}

impl TileLayer {
    pub fn openstreetmap() -> Self {
        Self {
            url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            attribution:
                r#"&copy; <a href="https://www.openstreetmap.org/copyright">OpenStreetMap</a>"#
                    .to_string(),
        }
    }

    pub fn openseamap_seamarks() -> Self {
        Self {
            url: "https://tiles.openseamap.org/seamark/{z}/{x}/{y}.png".to_string(),
            attribution: r#"&copy; <a href="https://www.openseamap.org">OpenSeaMap</a>"#
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, specta::Type)]
/// Settings for the map view, applied when a view is mounted
pub struct MapSettings {
    /// Where the map points before the first fix
    pub default_center: Location,
    /// Zoom level of the viewport
    pub zoom: u8,
    /// Options for the location watch
    pub watch: WatchOptions,
    /// Base map layer, drawn first
    pub base_layer: TileLayer,
    /// Marine chart overlay drawn over the base layer
    pub overlay_layer: TileLayer,
    /// Link opened by the support button
    pub support_url: String,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            default_center: Location::new(60.1695, 24.9354),
            zoom: 15,
            watch: WatchOptions::default(),
            base_layer: TileLayer::openstreetmap(),
            overlay_layer: TileLayer::openseamap_seamarks(),
            support_url: "https://buymeacoffee.com".to_string(),
        }
    }
}
