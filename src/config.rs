//! Defaults file (`--config statsdiff.toml`)
//!
//! Every field is optional; the CLI overrides whatever is set here.
//!
//! ```toml
//! merge_by = "min"
//! divide_by = 1
//! lnt_tag = "swift-compile"
//! lnt_machine = "ci-mac-mini-3"
//! flamegraph_script = "/opt/FlameGraph/flamegraph.pl"
//!
//! [thresholds]
//! delta_pct = 0.5
//! delta_usec = 250000
//! ```

use crate::compare::Thresholds;
use crate::jobstats::MergeBy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_LNT_TAG: &str = "swift-compile";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub thresholds: Thresholds,
    pub merge_by: MergeBy,
    /// Divisor applied to merged stats (an average over `divide_by` runs)
    pub divide_by: u32,
    pub lnt_tag: String,
    /// LNT machine name; the local hostname when unset
    pub lnt_machine: Option<String>,
    /// `flamegraph.pl`; searched on `PATH` when unset
    pub flamegraph_script: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            merge_by: MergeBy::Sum,
            divide_by: 1,
            lnt_tag: DEFAULT_LNT_TAG.to_string(),
            lnt_machine: None,
            flamegraph_script: None,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thresholds.delta_pct.is_nan() || self.thresholds.delta_pct < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "delta_pct must be non-negative, got {}",
                self.thresholds.delta_pct
            )));
        }

        if self.thresholds.delta_usec < 0 {
            return Err(ConfigError::Invalid(format!(
                "delta_usec must be non-negative, got {}",
                self.thresholds.delta_usec
            )));
        }

        if self.divide_by == 0 {
            return Err(ConfigError::Invalid("divide_by must be >= 1".to_string()));
        }

        if self.lnt_tag.is_empty() {
            return Err(ConfigError::Invalid("lnt_tag must not be empty".to_string()));
        }

        Ok(())
    }
}

/// LNT machine name: explicit value, else the local host name
pub fn resolve_machine_name(explicit: Option<&str>) -> String {
    if let Some(name) = explicit {
        return name.to_string();
    }
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.trim().is_empty())
        .or_else(|| fs::read_to_string("/etc/hostname").ok())
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}
