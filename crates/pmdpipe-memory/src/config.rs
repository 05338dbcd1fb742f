//! Backend configuration blobs
//!
//! Series are opened with a JSON configuration string. A blob starting with
//! `@` names a file holding the JSON instead. Only the `json` section is
//! understood by this backend; other top-level sections (configuration meant
//! for other backends) and unknown keys are ignored with a warning.
//!
//! ```
//! use pmdpipe_memory::BackendConfig;
//!
//! let config = BackendConfig::parse(r#"{"json": {"pretty": true, "source_id": 3}}"#)?;
//! assert!(config.json.pretty);
//! assert_eq!(config.json.source_id, 3);
//! assert_eq!(BackendConfig::parse("")?, BackendConfig::default());
//! # Ok::<(), pmdpipe_core::PipeError>(())
//! ```

use pmdpipe_core::{PipeError, Result};
use serde::Deserialize;

const KNOWN_JSON_KEYS: [&str; 2] = ["pretty", "source_id"];

/// Options of the `json` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct JsonOptions {
    /// Indent the persisted JSON
    #[serde(default)]
    pub pretty: bool,
    /// Producer id recorded on every chunk a writer stores
    #[serde(default)]
    pub source_id: u32,
}

/// Parsed backend configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendConfig {
    pub json: JsonOptions,
}

impl BackendConfig {
    /// Parse a configuration blob, or the file it points to with a leading `@`
    pub fn parse(blob: &str) -> Result<Self> {
        let blob = blob.trim();
        if let Some(file) = blob.strip_prefix('@') {
            let text = std::fs::read_to_string(file.trim())?;
            return Self::parse_json(&text);
        }
        Self::parse_json(blob)
    }

    fn parse_json(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| PipeError::configuration(format!("invalid backend configuration: {e}")))?;
        let serde_json::Value::Object(sections) = value else {
            return Err(PipeError::configuration(
                "backend configuration must be a JSON object",
            ));
        };

        let mut config = Self::default();
        for (key, section) in sections {
            if key != "json" {
                tracing::warn!(key = %key, "ignoring unknown backend configuration section");
                continue;
            }
            if let serde_json::Value::Object(options) = &section {
                for name in options.keys() {
                    if !KNOWN_JSON_KEYS.contains(&name.as_str()) {
                        tracing::warn!(key = %name, "ignoring unknown json backend option");
                    }
                }
            }
            config.json = serde_json::from_value(section).map_err(|e| {
                PipeError::configuration(format!("invalid json backend options: {e}"))
            })?;
        }
        Ok(config)
    }
}
