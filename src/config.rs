//! Configuration loading for the planner.
//!
//! Everything has a usable default; a TOML file only needs the fields it
//! changes. Example:
//!
//! ```toml
//! backend = "grid_search"
//!
//! [search]
//! initial_heuristic_weight = 2.0
//!
//! [sampling]
//! goal_bias = 0.2
//! ```

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::backend::{GridSearchConfig, SamplingConfig};

/// Failure to load a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Which reference backend the facade is built with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Continuous/joint-space sampling planner.
    Sampling,
    /// Discrete grid-search planner.
    GridSearch,
}

/// Top-level planner configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct PlannerConfig {
    /// Backend to construct the facade with.
    #[serde(default = "default_backend")]
    pub backend: BackendKind,

    /// Sampling backend settings.
    #[serde(default)]
    pub sampling: SamplingConfig,

    /// Grid-search backend settings.
    #[serde(default)]
    pub search: GridSearchConfig,
}

fn default_backend() -> BackendKind {
    BackendKind::GridSearch
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            sampling: SamplingConfig::default(),
            search: GridSearchConfig::default(),
        }
    }
}

impl PlannerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&content)?)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
