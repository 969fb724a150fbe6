use crate::error::{AnnotateError, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;

/// Number of text-map paragraphs scanned ahead of the alignment cursor.
pub const DEFAULT_LOOKAHEAD: usize = 120;
/// Minimum score for a view paragraph to be accepted as a match.
pub const DEFAULT_ACCEPT_THRESHOLD: f64 = 0.45;

/// Tuning for the paragraph alignment heuristic.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
    pub lookahead: usize,
    pub accept_threshold: f64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            lookahead: DEFAULT_LOOKAHEAD,
            accept_threshold: DEFAULT_ACCEPT_THRESHOLD,
        }
    }
}

/// Metadata stamped on every generated comment and on the summary block.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnnotationOptions {
    pub author: String,
    pub initials: String,
    /// Fixed comment date. `None` stamps the time of generation.
    pub date: Option<DateTime<Utc>>,
    pub summary_heading: String,
}

impl Default for AnnotationOptions {
    fn default() -> Self {
        Self {
            author: "Reviewer".to_string(),
            initials: "R".to_string(),
            date: None,
            summary_heading: "Feedback summary".to_string(),
        }
    }
}

impl AnnotationOptions {
    pub(crate) fn date_stamp(&self) -> String {
        self.date
            .unwrap_or_else(Utc::now)
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string()
    }
}

/// Everything the engine can be configured with, as loaded from a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub bridge: BridgeConfig,
    pub annotation: AnnotationOptions,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| AnnotateError::IoFailure(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.bridge.lookahead, 120);
        assert_eq!(config.bridge.accept_threshold, 0.45);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{"bridge": {"lookahead": 10}, "annotation": {"author": "Ms. Vega", "date": "2024-03-01T09:30:00Z"}}"#,
        )
        .unwrap();
        assert_eq!(config.bridge.lookahead, 10);
        assert_eq!(config.bridge.accept_threshold, DEFAULT_ACCEPT_THRESHOLD);
        assert_eq!(config.annotation.author, "Ms. Vega");
        assert_eq!(config.annotation.initials, "R");
        assert_eq!(config.annotation.date_stamp(), "2024-03-01T09:30:00Z");
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(EngineConfig::from_json_str("{not json").is_err());
    }
}
