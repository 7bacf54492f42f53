//! Client configuration.
//!
//! Two separate concerns live here: the on-disk YAML config (`~/.osvmrc`)
//! holding connection defaults, and the [`Tuning`] struct that carries the
//! orchestrator's timing knobs as an explicit, immutable value instead of
//! ambient globals.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

const CONFIG_FILE: &str = ".osvmrc";

/// Connection defaults read from `~/.osvmrc` (or `--config <path>`).
///
/// Every field is optional; command-line flags take precedence over whatever
/// is set here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub domain: Option<String>,
    pub project: Option<String>,
    /// Comma-separated default network names/IDs for `create vm`.
    pub networks: Option<String>,
    pub flavor_id: Option<String>,
    pub image_id: Option<String>,
}

impl ClientConfig {
    /// Load the config file. A missing file is not an error; it simply
    /// yields an empty config so flags can fill everything in.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(&path)?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg = serde_yaml_ng::from_str(&raw)?;
        Ok(cfg)
    }

    fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Precondition("could not determine home directory".into()))?;
        Ok(home.join(CONFIG_FILE))
    }
}

/// Timing knobs for the provisioning and migration orchestrators.
///
/// The defaults mirror observed backend behavior: resources routinely take
/// minutes to settle, and interface plumbing races with immediately-following
/// attach calls on the same server.
#[derive(Debug, Clone)]
pub struct Tuning {
    /// Delay between status poll attempts.
    pub poll_interval: Duration,
    /// Number of poll attempts before a wait times out.
    pub poll_max_attempts: u32,
    /// Settling delay after each successful interface attach.
    pub attach_settle: Duration,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            poll_max_attempts: 30,
            attach_settle: Duration::from_secs(10),
        }
    }
}

impl Tuning {
    /// Tuning with zero delays, for tests and dry runs.
    pub fn immediate() -> Self {
        Self {
            poll_interval: Duration::ZERO,
            poll_max_attempts: 30,
            attach_settle: Duration::ZERO,
        }
    }
}
