//! Pipeline configuration.
//!
//! Loaded from TOML, then overridden by CLI flags, then validated once
//! before any stage runs.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::ngram::NounTags;

/// Raw on-disk form. Every field is optional so that CLI flags can fill gaps.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub dp_min: Option<i64>,
    pub noun_tags: Option<Vec<String>>,
    #[serde(default)]
    pub engine: EngineSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    pub workers: Option<usize>,
    pub map_tasks: Option<usize>,
    pub reduce_tasks: Option<usize>,
    pub max_attempts: Option<u32>,
    pub combine: Option<bool>,
}

impl ConfigFile {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Apply command-line flags on top of the file values. `None` and
    /// `false` leave the file value in place.
    pub fn with_overrides(
        mut self,
        dp_min: Option<i64>,
        workers: Option<usize>,
        no_combine: bool,
    ) -> Self {
        if dp_min.is_some() {
            self.dp_min = dp_min;
        }
        if workers.is_some() {
            self.engine.workers = workers;
        }
        if no_combine {
            self.engine.combine = Some(false);
        }
        self
    }

    /// Validate and fill defaults.
    pub fn into_config(self) -> Result<PipelineConfig, ConfigError> {
        let dp_min = match self.dp_min {
            None => return Err(ConfigError::MissingDpMin),
            Some(v) if v <= 0 || v > u32::MAX as i64 => {
                return Err(ConfigError::InvalidDpMin { value: v })
            }
            Some(v) => v as u32,
        };

        let noun_tags = match self.noun_tags {
            None => NounTags::default(),
            Some(tags) if tags.is_empty() => return Err(ConfigError::EmptyNounTags),
            Some(tags) => NounTags::new(tags),
        };

        let defaults = EngineConfig::default();
        let engine = EngineConfig {
            workers: self.engine.workers.unwrap_or(defaults.workers),
            map_tasks: self.engine.map_tasks.unwrap_or(defaults.map_tasks),
            reduce_tasks: self.engine.reduce_tasks.unwrap_or(defaults.reduce_tasks),
            max_attempts: self.engine.max_attempts.unwrap_or(defaults.max_attempts),
            combine: self.engine.combine.unwrap_or(defaults.combine),
        };
        engine.validate()?;

        Ok(PipelineConfig {
            dp_min,
            noun_tags,
            engine,
        })
    }
}

/// Validated configuration handed to the job driver.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Minimum distinct noun-pair support for a path to enter the catalog.
    pub dp_min: u32,
    pub noun_tags: NounTags,
    pub engine: EngineConfig,
}

impl PipelineConfig {
    pub fn new(dp_min: u32) -> Result<Self, ConfigError> {
        ConfigFile {
            dp_min: Some(dp_min as i64),
            ..ConfigFile::default()
        }
        .into_config()
    }
}

/// Substrate settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Worker threads, 0 for the rayon default.
    pub workers: usize,
    pub map_tasks: usize,
    pub reduce_tasks: usize,
    /// Attempts per task before the stage fails.
    pub max_attempts: u32,
    /// Run the combiner on map output. Results must not depend on it.
    pub combine: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            map_tasks: 8,
            reduce_tasks: 4,
            max_attempts: 4,
            combine: true,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.map_tasks == 0 {
            return Err(ConfigError::InvalidEngine {
                field: "map_tasks",
                message: "must be at least 1".into(),
            });
        }
        if self.reduce_tasks == 0 {
            return Err(ConfigError::InvalidEngine {
                field: "reduce_tasks",
                message: "must be at least 1".into(),
            });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidEngine {
                field: "max_attempts",
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}
