//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/threadrank/threadrank.toml`
//! 3. Explicit config file (`--config`)
//! 4. Environment variables: `THREADRANK_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;
use crate::domain::ScoringParams;

/// Raw scoring config for intermediate parsing (`None` → not specified).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawScoringConfig {
    pub decay: Option<f64>,
    pub epsilon: Option<f64>,
    pub gravity: Option<f64>,
    pub age_offset_hours: Option<f64>,
    pub precision: Option<u32>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub snapshot_path: Option<PathBuf>,
    pub viewer: Option<i64>,
    pub scoring: RawScoringConfig,
}

/// Unified configuration for threadrank.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// JSON snapshot holding entries, closure rows and votes
    pub snapshot_path: PathBuf,
    /// User whose own votes are shown, if any
    pub viewer: Option<i64>,
    /// Ranking constants
    pub scoring: ScoringParams,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            viewer: None,
            scoring: ScoringParams::default(),
        }
    }
}

fn default_snapshot_path() -> PathBuf {
    ProjectDirs::from("", "", "threadrank")
        .map(|dirs| dirs.data_dir().join("threadrank.json"))
        .unwrap_or_else(|| PathBuf::from("threadrank.json"))
}

/// Get the XDG config directory for threadrank.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "threadrank").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("threadrank.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Expand `~`, `$VAR` and `${VAR}` in a path; unexpandable input is kept as is.
fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    shellexpand::full(raw.as_ref())
        .map(|s| PathBuf::from(s.into_owned()))
        .unwrap_or_else(|_| path.to_path_buf())
}

impl Settings {
    /// Overlay wins where it specifies a value, otherwise keep self.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        let s = &overlay.scoring;
        Self {
            snapshot_path: overlay
                .snapshot_path
                .clone()
                .unwrap_or_else(|| self.snapshot_path.clone()),
            viewer: overlay.viewer.or(self.viewer),
            scoring: ScoringParams {
                decay: s.decay.unwrap_or(self.scoring.decay),
                epsilon: s.epsilon.unwrap_or(self.scoring.epsilon),
                gravity: s.gravity.unwrap_or(self.scoring.gravity),
                age_offset_hours: s.age_offset_hours.unwrap_or(self.scoring.age_offset_hours),
                precision: s.precision.unwrap_or(self.scoring.precision),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Optional explicit config file; it must exist if given
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/threadrank/threadrank.toml`
    /// 3. Explicit config file
    /// 4. Environment variables: `THREADRANK_*` prefix, `__` as section separator
    pub fn load(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("global config: {}", global_path.display());
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        // 3. Explicit config file
        if let Some(path) = config_file {
            current = current.merge_with(&load_raw_settings(path)?);
        }

        // 4. Environment variables
        current = Self::apply_env_overrides(current)?;

        current.snapshot_path = expand_path(&current.snapshot_path);
        current.validate()?;
        Ok(current)
    }

    /// Apply THREADRANK_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("THREADRANK")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("snapshot_path") {
            settings.snapshot_path = PathBuf::from(val);
        }
        if let Ok(val) = config.get_int("viewer") {
            settings.viewer = Some(val);
        }
        if let Ok(val) = config.get_float("scoring.decay") {
            settings.scoring.decay = val;
        }
        if let Ok(val) = config.get_float("scoring.epsilon") {
            settings.scoring.epsilon = val;
        }
        if let Ok(val) = config.get_float("scoring.gravity") {
            settings.scoring.gravity = val;
        }
        if let Ok(val) = config.get_float("scoring.age_offset_hours") {
            settings.scoring.age_offset_hours = val;
        }
        if let Ok(val) = config.get_int("scoring.precision") {
            settings.scoring.precision = u32::try_from(val).map_err(|_| ApplicationError::Config {
                message: format!("scoring.precision out of range: {}", val),
            })?;
        }

        Ok(settings)
    }

    /// Reject scoring constants that would make scores undefined.
    pub fn validate(&self) -> Result<(), ApplicationError> {
        let s = &self.scoring;
        let problem = if !(0.0..=1.0).contains(&s.decay) {
            Some(format!("scoring.decay must be within [0, 1], got {}", s.decay))
        } else if !s.gravity.is_finite() || s.gravity <= 0.0 {
            Some(format!("scoring.gravity must be positive, got {}", s.gravity))
        } else if !s.age_offset_hours.is_finite() || s.age_offset_hours <= 0.0 {
            Some(format!(
                "scoring.age_offset_hours must be positive, got {}",
                s.age_offset_hours
            ))
        } else if !s.epsilon.is_finite() || s.epsilon < 0.0 {
            Some(format!("scoring.epsilon must not be negative, got {}", s.epsilon))
        } else if s.precision > 15 {
            Some(format!("scoring.precision must be at most 15, got {}", s.precision))
        } else {
            None
        };
        match problem {
            Some(message) => Err(ApplicationError::Config { message }),
            None => Ok(()),
        }
    }

    /// Render as TOML for `config show`.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: e.to_string(),
        })
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
