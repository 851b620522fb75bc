use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::Error;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct FeedConfig {
    /// Posts requested per page. A shorter page ends the stream.
    #[serde(default = "FeedConfig::default_page_size")]
    page_size: usize,
}

impl FeedConfig {
    pub fn default_page_size() -> usize {
        20
    }

    pub fn new(page_size: usize) -> Result<Self, Error> {
        if page_size == 0 {
            return Err(Error::InvalidPageSize);
        }
        Ok(Self { page_size })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: FeedConfig = serde_json::from_str(json)?;
        Self::new(config.page_size)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let json = fs::read_to_string(path).map_err(Error::ReadFile)?;
        Self::from_json(&json)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: Self::default_page_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(FeedConfig::default().page_size(), 20);
        assert_eq!(FeedConfig::from_json("{}").unwrap(), FeedConfig::default());
        assert_eq!(FeedConfig::from_json(r#"{ "page_size": 5 }"#).unwrap().page_size(), 5);
        assert_eq!(FeedConfig::new(5).unwrap().page_size(), 5);
    }

    #[test]
    fn test_rejects_zero_page_size() {
        assert!(matches!(FeedConfig::new(0), Err(Error::InvalidPageSize)));
        assert!(matches!(
            FeedConfig::from_json(r#"{ "page_size": 0 }"#),
            Err(Error::InvalidPageSize)
        ));
        assert!(matches!(
            FeedConfig::from_json(r#"{ "page_size": "many" }"#),
            Err(Error::Json(_))
        ));
    }
}
