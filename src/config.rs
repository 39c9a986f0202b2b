use crate::{grid, particles, tone};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("open config {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub grid_width: u32,
    pub grid_height: u32,
    pub screen_width: u32,
    pub screen_height: u32,
    pub spawn_interval_ms: u64,
    pub spawn_batch: usize,
    pub sample_rate: u32,
    pub volume: f64,
    pub tick_rate: u32,
    pub transition_ms: u64,
    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,
    pub catalog_path: Option<PathBuf>,
    pub bind_addr: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid_width: grid::DEFAULT_WIDTH,
            grid_height: grid::DEFAULT_HEIGHT,
            screen_width: 1024,
            screen_height: 768,
            spawn_interval_ms: particles::DEFAULT_SPAWN_INTERVAL_MS,
            spawn_batch: particles::DEFAULT_BATCH_SIZE,
            sample_rate: tone::DEFAULT_SAMPLE_RATE,
            volume: tone::DEFAULT_VOLUME,
            tick_rate: 60,
            transition_ms: 1000,
            seed: None,
            catalog_path: None,
            bind_addr: "127.0.0.1:3000".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads from `path`, or from the platform config dir (e.g.
    /// ~/.config/fusion-drift/settings.json). Falls back to defaults and
    /// reports what happened in the returned message.
    pub fn load(path: Option<&Path>) -> (Self, String) {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path(),
        };
        if !path.exists() {
            return (Self::default(), "No config found. Using defaults.".to_string());
        }
        match Self::from_file(&path) {
            Ok(cfg) => (cfg, format!("Config loaded from {:?}", path)),
            Err(e) => (Self::default(), format!("Error loading config: {e}")),
        }
    }

    pub fn default_path() -> PathBuf {
        if let Some(proj) = ProjectDirs::from("org", "fusiondrift", "fusion-drift") {
            proj.config_dir().join("settings.json")
        } else {
            PathBuf::from("settings.json")
        }
    }

    /// Milliseconds per tick at the configured rate.
    pub fn tick_interval_ms(&self) -> u64 {
        (1000 / self.tick_rate.max(1) as u64).max(1)
    }
}
