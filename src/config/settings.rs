use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::TailError;

/// Top-level defaults file structure (default.toml)
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DefaultsFile {
    #[serde(default)]
    tail: TailDefaults,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct TailDefaults {
    #[serde(default = "default_lines")]
    lines: u64,
    #[serde(default = "default_sleep_interval_ms")]
    sleep_interval_ms: u64,
    #[serde(default = "default_headers")]
    headers: bool,
}

fn default_lines() -> u64 {
    10
}

fn default_sleep_interval_ms() -> u64 {
    1000
}

fn default_headers() -> bool {
    true
}

impl Default for TailDefaults {
    fn default() -> Self {
        Self {
            lines: default_lines(),
            sleep_interval_ms: default_sleep_interval_ms(),
            headers: default_headers(),
        }
    }
}

/// Effective run settings: the defaults file merged over built-ins.
/// Command-line flags override these at the CLI layer.
#[derive(Debug, Clone)]
pub struct Settings {
    pub lines: u64,
    pub sleep_interval: Duration,
    pub headers: bool,
}

impl Settings {
    /// Load from `path`, or the standard location when `path` is None.
    /// A missing file means built-in defaults; a malformed one is a
    /// configuration error and stops the run before anything starts.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => super::default_config_path()?,
        };
        let defaults = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Self::parse(&raw).map_err(|e| TailError::Config(format!("{}: {}", path.display(), e)))?
        } else {
            DefaultsFile::default()
        };
        Ok(defaults.into())
    }

    fn parse(raw: &str) -> std::result::Result<DefaultsFile, toml::de::Error> {
        toml::from_str(raw)
    }
}

impl From<DefaultsFile> for Settings {
    fn from(file: DefaultsFile) -> Self {
        Self {
            lines: file.tail.lines,
            sleep_interval: Duration::from_millis(file.tail.sleep_interval_ms),
            headers: file.tail.headers,
        }
    }
}
