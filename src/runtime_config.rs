//! # Runtime Configuration Module
//!
//! Environment- or YAML-driven settings for the dispatcher and body handling.
//!
//! ## Environment Variables
//!
//! ### `BRRTB_STACK_SIZE`
//!
//! Stack size for dispatch coroutines. Accepts values in:
//! - Decimal: `16384` (16 KB)
//! - Hexadecimal: `0x4000` (16 KB)
//!
//! Default: `0x4000` (16 KB)
//!
//! Handlers that decode large bodies or recurse deeply need more; thousands of
//! concurrent requests multiply whatever is chosen here.
//!
//! ### `BRRTB_MAX_BODY_BYTES`
//!
//! Largest request body a body-reading parameter will accept. Larger bodies fail
//! with `413 Payload Too Large`. Unset means unlimited.
//!
//! ### `BRRTB_BODY_FORMATS`
//!
//! `json` (default) decodes every body as JSON. `multi` selects JSON, YAML or XML
//! from the request's `Content-Type`.
//!
//! ## Usage
//!
//! ```rust
//! use brrtbind::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Stack size: {} bytes", config.stack_size);
//! ```
//!
//! The same fields can be loaded from YAML:
//!
//! ```yaml
//! stack_size: 0x8000
//! max_body_bytes: 1048576
//! body_formats: multi
//! ```

use serde::{Deserialize, Deserializer};
use std::env;
use std::path::Path;

const DEFAULT_STACK_SIZE: usize = 0x4000;

/// How request bodies are decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyFormats {
    #[default]
    Json,
    Multi,
}

impl BodyFormats {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Some(BodyFormats::Json),
            "multi" => Some(BodyFormats::Multi),
            _ => None,
        }
    }
}

/// Runtime configuration.
///
/// Load this at startup using [`RuntimeConfig::from_env()`] or
/// [`RuntimeConfig::from_yaml_file()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Stack size for dispatch coroutines in bytes (default: 16 KB / 0x4000)
    #[serde(deserialize_with = "deserialize_size")]
    pub stack_size: usize,
    /// Body size limit for body-reading parameters
    pub max_body_bytes: Option<usize>,
    pub body_formats: BodyFormats,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            max_body_bytes: None,
            body_formats: BodyFormats::Json,
        }
    }
}

/// Decimal or `0x`-prefixed hexadecimal.
fn parse_size(val: &str) -> Option<usize> {
    let val = val.trim();
    match val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => val.parse().ok(),
    }
}

fn deserialize_size<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Number(usize),
        Text(String),
    }

    match Size::deserialize(deserializer)? {
        Size::Number(n) => Ok(n),
        Size::Text(s) => parse_size(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid size '{s}'"))),
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    ///
    /// Unparseable values fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup, e.g. a map in tests.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        RuntimeConfig {
            stack_size: lookup("BRRTB_STACK_SIZE")
                .and_then(|v| parse_size(&v))
                .unwrap_or(defaults.stack_size),
            max_body_bytes: lookup("BRRTB_MAX_BODY_BYTES").and_then(|v| parse_size(&v)),
            body_formats: lookup("BRRTB_BODY_FORMATS")
                .and_then(|v| BodyFormats::parse(&v))
                .unwrap_or(defaults.body_formats),
        }
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
        Self::from_yaml_str(&text)
    }
}
