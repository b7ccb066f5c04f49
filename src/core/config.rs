//! Configuration management

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::core::errors::{Result, TranslationError};
use crate::core::models::{DeviceKind, Direction};
use crate::core::pool::DEFAULT_MAX_WORKERS;

/// Prefix of environment overrides, e.g. `OPUS_TRANSLATOR__SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "OPUS_TRANSLATOR";

/// Service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub models: ModelsConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding `index.html` and other front-end assets
    pub static_dir: PathBuf,
    /// Device used by the plain `/translate` route
    pub default_device: DeviceKind,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            static_dir: PathBuf::from("static"),
            default_device: DeviceKind::Cpu,
        }
    }
}

/// Sentence pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Upper bound on concurrently translated sentences
    pub max_workers: usize,
    /// Limit for one document translation, 0 disables it
    pub timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            timeout_ms: 120_000,
        }
    }
}

impl PipelineConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

/// Model loading settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Devices to load models on; `gpu` is skipped when no GPU is present
    pub devices: Vec<DeviceKind>,
    pub directions: Vec<Direction>,
    /// Run one trial translation per model after loading
    pub warm_up: bool,
    /// Model cache root, defaults to `RUSTBERT_CACHE` or `<cache dir>/.rustbert`
    pub cache_dir: Option<PathBuf>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            devices: vec![DeviceKind::Cpu, DeviceKind::Gpu],
            directions: Direction::ALL.to_vec(),
            warm_up: true,
            cache_dir: None,
        }
    }
}

impl ModelsConfig {
    /// Resolved model cache directory
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.cache_dir {
            return Ok(dir.clone());
        }
        if let Ok(dir) = std::env::var("RUSTBERT_CACHE") {
            return Ok(PathBuf::from(dir));
        }
        dirs::cache_dir()
            .map(|dir| dir.join(".rustbert"))
            .ok_or_else(|| TranslationError::ConfigError {
                message: "cannot determine a cache directory, set models.cache_dir".to_string(),
            })
    }
}

impl ServiceConfig {
    /// Load configuration from `config/default.*`, an optional explicit file
    /// and `OPUS_TRANSLATOR__*` environment variables, in that order.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .add_source(File::with_name("config/default").required(false));

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;

        info!(
            port = config.server.port,
            max_workers = config.pipeline.max_workers,
            devices = ?config.models.devices,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.max_workers == 0 {
            return Err(config_error("pipeline.max_workers must be greater than 0"));
        }

        if self.models.devices.is_empty() {
            return Err(config_error("models.devices must list at least one device"));
        }

        if self.models.directions.is_empty() {
            return Err(config_error("models.directions must list at least one direction"));
        }

        if !self.models.devices.contains(&self.server.default_device) {
            return Err(config_error(&format!(
                "server.default_device '{}' is not in models.devices",
                self.server.default_device
            )));
        }

        if self.pipeline.timeout_ms == 0 {
            warn!("Pipeline timeout disabled");
        }

        Ok(())
    }
}

fn config_error(message: &str) -> TranslationError {
    TranslationError::ConfigError {
        message: message.to_string(),
    }
}
