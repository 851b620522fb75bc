use std::io;
use thiserror::Error as ThisError;

mod config;
mod maps;
mod profiles;
mod script;

pub use config::{CleanupConfig, HIDE_DECLARATIONS};
pub use maps::{builtin_maps, find_map, MapConfig, GREEN_MAP_ID, WINDY_ID};
pub use profiles::{green_map, windy};
pub use script::{create_cleanup_js, STYLE_ID};

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("Failed to read profile file: {0}")]
    ReadFile(#[source] io::Error),
    #[error("Failed to parse profile JSON: {0}")]
    Json(#[from] serde_json::Error),
}
