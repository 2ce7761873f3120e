use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::ResourceDescriptor;
use crate::views::{default_models, ModelLink};

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_DIR: &str = "specwatch";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub endpoints: EndpointsConfig,
    pub archive: ArchiveConfig,
    pub notifications: NotificationsConfig,
    pub ui: UiConfig,
    pub models: Vec<ModelLink>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            polling: PollingConfig::default(),
            endpoints: EndpointsConfig::default(),
            archive: ArchiveConfig::default(),
            notifications: NotificationsConfig::default(),
            ui: UiConfig::default(),
            models: default_models(),
        }
    }
}

/// Detection backend connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Per-request timeout for fetches and writes
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Poll periods in milliseconds. 0 = fetch once, then only on sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub current_ms: u64,
    pub facts_ms: u64,
    pub recent_ms: u64,
    pub archive_ms: u64,
    pub chart_ms: u64,
    pub species_ms: u64,
    pub locations_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            current_ms: 3_000,
            facts_ms: 10_000,
            recent_ms: 5_000,
            archive_ms: 20_000,
            chart_ms: 20_000,
            species_ms: 20_000,
            locations_ms: 60_000,
        }
    }
}

/// Backend paths, relative to `api.base_url`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub current: String,
    pub facts: String,
    pub recent: String,
    pub species_info: String,
    pub archive: String,
    pub locations: String,
    pub archive_create: String,
    pub archive_delete: String,
    pub recent_delete: String,
    pub recent_create: String,
    /// Identity field of list records
    pub id_field: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            current: "/api/species".to_string(),
            facts: "/api/speciesdata".to_string(),
            recent: "/api/alldata".to_string(),
            species_info: "/api/speciesinfo".to_string(),
            archive: "/api/archivespecies".to_string(),
            locations: "/api/location".to_string(),
            archive_create: "/api/archive".to_string(),
            archive_delete: "/api/delarchive".to_string(),
            recent_delete: "/api/delspecies".to_string(),
            recent_create: "/api/addspecies".to_string(),
            id_field: "_id".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Delete the source record after archiving or restoring it
    pub remove_source: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            remove_source: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// How long a notification stays visible
    pub ttl_ms: u64,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { ttl_ms: 3_000 }
    }
}

impl NotificationsConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

/// UI customization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Redraw/input poll interval in milliseconds
    pub tick_rate_ms: u64,
    /// Record field the list filters match against
    pub filter_field: String,
    pub dark_mode: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: 100,
            filter_field: "name".to_string(),
            dark_mode: true,
        }
    }
}

impl Config {
    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join(APP_DIR);

        Ok(config_dir.join(CONFIG_FILE_NAME))
    }

    /// Load from the default location, creating it with defaults if missing
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from `path`, or create it with defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;

            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;

            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            tracing::info!("wrote default config to {}", path.display());
            Ok(config)
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Generate example config content for documentation
    pub fn example_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    /// Descriptor for `path` carrying the configured id field and timeout
    pub fn resource(&self, name: &str, path: &str) -> ResourceDescriptor {
        ResourceDescriptor::new(name, path)
            .with_id_field(&self.endpoints.id_field)
            .with_timeout(self.api.timeout())
    }
}
