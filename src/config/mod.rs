//! Configuration for the engine and for batch jobs.
//!
//! Two files are involved:
//! - **Engine config** (`engine.toml`) - worker count, queue sizes and the
//!   default log filter. Lives in the platform data directory unless a path
//!   is given explicitly.
//! - **Job files** ([`JobFile`]) - one persisted transform plus the position
//!   grid, sample interval and data source to run it over.
//!
//! # App Data Location
//!
//! - **Linux**: `~/.local/share/dev.tracecalc/`
//! - **macOS**: `~/Library/Application Support/dev.tracecalc/`
//! - **Windows**: `%APPDATA%\dev.tracecalc\`
//!
//! # Example
//!
//! ```ignore
//! use tracecalc::config::{EngineConfig, JobFile};
//!
//! let config = EngineConfig::load_or_default();
//! let job = JobFile::load("job.toml")?;
//! ```

pub mod job;

pub use job::{JobFile, PositionGrid, SampleRange, SourceSettings};

use crate::error::{Result, ResultExt, TransformError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "dev.tracecalc";

/// Engine config filename
pub const ENGINE_CONFIG_FILE: &str = "engine.toml";

/// Default log filter when neither `RUST_LOG` nor the config sets one
pub const DEFAULT_LOG_FILTER: &str = "info,tracecalc=debug";

/// Default capacity of the scheduler's result queue
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        TransformError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir)
            .map_err(TransformError::from)
            .context("Failed to create app data directory")?;
    }

    Ok(dir)
}

/// Get the path to the default engine config file
pub fn engine_config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(ENGINE_CONFIG_FILE))
}

// ==================== Scheduler Config ====================

/// Worker pool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Worker threads for parallel-safe transforms. 0 means one per core.
    pub workers: usize,

    /// Bound of the result queue between workers and the collector.
    pub channel_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl SchedulerConfig {
    /// A config running on exactly `workers` threads.
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }

    /// Resolved worker count, never zero.
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

// ==================== Logging Config ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

// ==================== Engine Config ====================

/// Engine-wide settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scheduler: SchedulerConfig,
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load from the default location. A missing file yields defaults.
    pub fn load() -> Result<Self> {
        let path = engine_config_path().ok_or_else(|| {
            TransformError::Config("Could not determine engine config path".to_string())
        })?;

        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(TransformError::from)
            .with_context(|| format!("Failed to read engine config {:?}", path))?;

        toml::from_str(&content).map_err(|e| {
            TransformError::Config(format!("Failed to parse engine config {:?}: {}", path, e))
        })
    }

    /// Load from the default location, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load engine config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save to the default location
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save_to(dir.join(ENGINE_CONFIG_FILE))
    }

    /// Save to an explicit path, creating parent directories.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(TransformError::from)
                .context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| {
            TransformError::Config(format!("Failed to serialize engine config: {}", e))
        })?;

        std::fs::write(path, content)
            .map_err(TransformError::from)
            .with_context(|| format!("Failed to write engine config {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.scheduler.workers, 0);
        assert!(config.scheduler.worker_count() >= 1);
        assert_eq!(config.logging.filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_explicit_worker_count() {
        assert_eq!(SchedulerConfig::with_workers(3).worker_count(), 3);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(ENGINE_CONFIG_FILE);

        let mut config = EngineConfig::default();
        config.scheduler.workers = 6;
        config.logging.filter = "warn".to_string();
        config.save_to(&path).unwrap();

        let loaded = EngineConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(ENGINE_CONFIG_FILE);
        std::fs::write(&path, "[scheduler]\nworkers = 2\n").unwrap();

        let loaded = EngineConfig::load_from(&path).unwrap();
        assert_eq!(loaded.scheduler.workers, 2);
        assert_eq!(loaded.scheduler.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(loaded.logging, LoggingConfig::default());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(ENGINE_CONFIG_FILE);
        std::fs::write(&path, "scheduler = 5").unwrap();
        assert!(matches!(
            EngineConfig::load_from(&path),
            Err(TransformError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = EngineConfig::load_from(dir.path().join("absent.toml")).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Io);
        assert!(err.to_string().contains("Failed to read engine config"));
    }
}
