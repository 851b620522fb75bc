use std::io;
use thiserror::Error as ThisError;

mod config;
mod controller;
mod service;

pub use config::FeedConfig;
pub use controller::{FeedController, FeedScope, FeedSnapshot, FeedStatus};
pub use service::{CommunityService, LogNotify, Notify, ServiceError, Services};

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("Failed to read config file: {0}")]
    ReadFile(#[source] io::Error),
    #[error("Failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Page size must be greater than zero")]
    InvalidPageSize,
}
