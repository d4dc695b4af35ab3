//! Optional `redmatch.toml` configuration.
//!
//! # Example
//!
//! ```toml
//! [parser]
//! max_errors = 25
//!
//! [log]
//! level = "debug"
//!
//! [output]
//! format = "json"
//! ```
//!
//! Every section and key is optional. Command-line flags win over the file,
//! and `RUST_LOG` wins over `[log] level`.

use std::path::Path;

use redmatch_core::{RedmatchError, DEFAULT_MAX_ERRORS};
use serde::Deserialize;

use crate::OutputFormat;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "redmatch.toml";

const LOG_LEVELS: &[&str] = &["off", "error", "warn", "info", "debug", "trace"];

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub parser: ParserConfig,
    pub log: LogConfig,
    pub output: OutputConfig,
}

/// `[parser]` section.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ParserConfig {
    /// Diagnostics kept before the parser stops.
    pub max_errors: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_errors: DEFAULT_MAX_ERRORS,
        }
    }
}

/// `[log]` section.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
        }
    }
}

/// `[output]` section.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub format: Option<OutputFormat>,
}

// ── Functions ─────────────────────────────────────────────────────────────────

/// Load the configuration. An explicit path must exist; the default file is
/// used only when present.
pub fn load(explicit: Option<&Path>) -> Result<Config, RedmatchError> {
    match explicit {
        Some(path) => read_config(path),
        None => {
            let path = Path::new(DEFAULT_CONFIG_FILE);
            if path.is_file() {
                read_config(path)
            } else {
                Ok(Config::default())
            }
        }
    }
}

fn read_config(path: &Path) -> Result<Config, RedmatchError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| RedmatchError::io(path.display().to_string(), e))?;
    parse_config(&content).map_err(|message| RedmatchError::Config {
        path: path.display().to_string(),
        message,
    })
}

fn parse_config(content: &str) -> Result<Config, String> {
    let config: Config = toml::from_str(content).map_err(|e| e.message().to_owned())?;
    if !LOG_LEVELS.contains(&config.log.level.as_str()) {
        return Err(format!(
            "unknown log level '{}'. Valid: {}",
            config.log.level,
            LOG_LEVELS.join(", ")
        ));
    }
    if config.parser.max_errors == 0 {
        return Err("parser.max_errors must be at least 1".to_owned());
    }
    Ok(config)
}
