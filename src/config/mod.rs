//! Waypoint configuration.
//!
//! Loaded from the platform config directory, e.g.
//! `~/.config/waypoint/config.toml`. A missing file means defaults;
//! command-line flags and environment variables override file values.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Waypoint configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Project targeted when neither `--project` nor `WP_PROJECT` is given.
    /// Falls back to the most recently imported project when unset.
    pub default_project: Option<String>,

    /// Evaluate lesson accessibility as an administrator.
    pub admin: bool,
}

impl Config {
    /// Load config from the default location. Missing file yields defaults.
    pub fn load() -> Result<Self> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load config from an explicit path. Missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("invalid config at {}: {e}", path.display())))
    }

    /// The config file path: `<config dir>/waypoint/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("waypoint").join("config.toml"))
    }
}
