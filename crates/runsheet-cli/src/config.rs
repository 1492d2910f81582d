use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use runsheet_engine::{ExportFormat, ExportOptions};

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "runsheet.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ── Export ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Export hidden columns.
    #[serde(default)]
    pub include_hidden: bool,

    /// Export skipped items.
    #[serde(default = "default_include_inactive")]
    pub include_inactive: bool,

    /// Format used when `--format` is not given.
    #[serde(default = "default_format")]
    pub default_format: ExportFormat,
}

// ── Logging ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive, used when `RUST_LOG` is unset.
    #[serde(default)]
    pub filter: Option<String>,
}

// ── Defaults ───────────────────────────────────────────────────────

fn default_include_inactive() -> bool {
    true
}
fn default_format() -> ExportFormat {
    ExportFormat::Json
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            include_hidden: false,
            include_inactive: default_include_inactive(),
            default_format: default_format(),
        }
    }
}

impl ExportConfig {
    pub fn options(&self) -> ExportOptions {
        ExportOptions {
            include_hidden: self.include_hidden,
            include_inactive: self.include_inactive,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults for missing keys.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// An explicit path must exist; the default file is optional.
    pub fn resolve(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::load(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}
