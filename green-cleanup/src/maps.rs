use serde::{Deserialize, Serialize};
use urlencoding::encode;

use crate::{create_cleanup_js, green_map, windy, CleanupConfig};

pub const WINDY_ID: &str = "windy";
pub const GREEN_MAP_ID: &str = "green-map";

/// An embeddable map page plus the profile used to strip its chrome.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct MapConfig {
    pub id: String,
    pub name: String,
    pub description: String,
    pub url: String,
    #[serde(default)]
    #[serde(alias = "cleanupConfig")]
    pub cleanup: Option<CleanupConfig>,
}

impl MapConfig {
    pub fn windy(lat: f64, lng: f64, zoom: u8) -> Self {
        Self {
            id: WINDY_ID.to_string(),
            name: "Windy".to_string(),
            description: "Wind, rain and temperature forecast".to_string(),
            url: format!("https://www.windy.com/?{},{},{}", lat, lng, zoom),
            cleanup: Some(windy()),
        }
    }

    /// `viewbox` is `[west, south, east, north]`.
    pub fn green_map(viewbox: [f64; 4]) -> Self {
        let viewbox = viewbox
            .iter()
            .map(|coord| coord.to_string())
            .collect::<Vec<_>>()
            .join(",");

        Self {
            id: GREEN_MAP_ID.to_string(),
            name: "Green Map".to_string(),
            description: "Community mapped green spaces".to_string(),
            url: format!(
                "https://greenmap.org/browse/maps/_/map-view?viewbox={}",
                encode(&viewbox)
            ),
            cleanup: Some(green_map()),
        }
    }

    /// Script to hand to the web view once the page has loaded.
    pub fn injected_js(&self) -> Option<String> {
        self.cleanup.as_ref().map(create_cleanup_js)
    }
}

pub fn builtin_maps() -> Vec<MapConfig> {
    vec![
        MapConfig::windy(21.0245, 105.8412, 5),
        MapConfig::green_map([
            103.65932432913326,
            15.487146341658786,
            110.36394077475477,
            18.53210128454853,
        ]),
    ]
}

pub fn find_map(id: &str) -> Option<MapConfig> {
    builtin_maps().into_iter().find(|map| map.id == id)
}
