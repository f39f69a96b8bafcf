//! Configuration management.
//!
//! Configuration is read from `~/.config/gazette/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is
//! created. Missing fields fall back to their defaults.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use crate::cache;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GazetteConfig {
    /// Content API root (a WordPress-style REST v2 endpoint).
    pub api_base_url: String,
    pub page_size: u32,
    pub featured_count: u32,
    /// Durable cache mirror location; defaults to the platform data dir.
    pub db_path: Option<PathBuf>,
    pub cache: CacheSettings,
    pub prefetch: PrefetchSettings,
}

impl Default for GazetteConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://news.example.com/wp-json/wp/v2".to_string(),
            page_size: 6,
            featured_count: 3,
            db_path: None,
            cache: CacheSettings::default(),
            prefetch: PrefetchSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_secs: u64,
    pub general_capacity: usize,
    pub image_capacity: usize,
    pub category_capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: cache::DEFAULT_TTL.as_secs(),
            general_capacity: cache::GENERAL_CAPACITY,
            image_capacity: cache::IMAGE_CAPACITY,
            category_capacity: cache::CATEGORY_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PrefetchSettings {
    pub initial_delay_secs: u64,
    pub retune_interval_secs: u64,
    pub report_interval_secs: u64,
    pub default_category_id: u64,
}

impl Default for PrefetchSettings {
    fn default() -> Self {
        Self {
            initial_delay_secs: 5,
            retune_interval_secs: 60,
            report_interval_secs: 30,
            default_category_id: 4,
        }
    }
}

impl GazetteConfig {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with
    /// comments. If it exists but is invalid, returns an error.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let config: GazetteConfig = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })?;

        Ok(config)
    }

    /// Get the default config file path: `~/.config/gazette/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("gazette").join("config.toml"))
    }

    fn create_default_config(path: &PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> String {
        r##"# Gazette configuration
#
# api_base_url points at the content API root (a WordPress-style REST v2
# endpoint). Page sizes are fixed by the product design; change them only
# if the backend paginates differently.

api_base_url = "https://news.example.com/wp-json/wp/v2"
page_size = 6
featured_count = 3

[cache]
# Seconds an entry stays fresh. Retuned at runtime by connection quality.
ttl_secs = 300
general_capacity = 150
image_capacity = 300
category_capacity = 60

[prefetch]
# Delay before the one-shot warmup fetch after startup.
initial_delay_secs = 5
retune_interval_secs = 60
report_interval_secs = 30
# Category warmed alongside the front page (4 = technology).
default_category_id = 4
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl From<ConfigError> for crate::app::GazetteError {
    fn from(err: ConfigError) -> Self {
        crate::app::GazetteError::Config(err.to_string())
    }
}
