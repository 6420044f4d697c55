//! # Global Config Repository
//!
//! Keeps store-wide settings in `global_config.yaml` at the root of the data
//! directory, next to the collection files.
//!
//! ```yaml
//! data_format_version: "1.0"
//! catalog_seeded_at: "2025-01-21T19:30:00Z"
//! created_at: "2025-01-21T19:30:00Z"
//! updated_at: "2025-01-21T19:35:00Z"
//! ```

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::connection::CsvConnection;

/// Format version written by this build
pub const DATA_FORMAT_VERSION: &str = "1.0";

/// Global configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Data format version for future migrations
    pub data_format_version: String,
    /// When the built-in allergen catalog was last seeded
    #[serde(default)]
    pub catalog_seeded_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            data_format_version: DATA_FORMAT_VERSION.to_string(),
            catalog_seeded_at: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Storage trait for global configuration operations
pub trait GlobalConfigStorage: Send + Sync {
    /// Get the global configuration, creating the default file if missing
    fn get_global_config(&self) -> Result<GlobalConfig>;

    /// Record that the catalog was seeded now
    fn mark_catalog_seeded(&self) -> Result<GlobalConfig>;
}

/// YAML-backed global config repository
#[derive(Debug, Clone)]
pub struct GlobalConfigRepository {
    connection: CsvConnection,
}

impl GlobalConfigRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn config_path(&self) -> PathBuf {
        self.connection.global_config_path()
    }

    fn load_or_create(&self) -> Result<GlobalConfig> {
        let config_path = self.config_path();

        if config_path.exists() {
            let yaml_content = fs::read_to_string(&config_path)?;
            let config: GlobalConfig = serde_yaml::from_str(&yaml_content)?;
            if config.data_format_version != DATA_FORMAT_VERSION {
                warn!(
                    "Data directory uses format {} but this build writes {}",
                    config.data_format_version, DATA_FORMAT_VERSION
                );
            }
            debug!("Loaded global config from {:?}", config_path);
            Ok(config)
        } else {
            let config = GlobalConfig::default();
            self.save(&config)?;
            info!("Created default global config at {:?}", config_path);
            Ok(config)
        }
    }

    fn save(&self, config: &GlobalConfig) -> Result<()> {
        let config_path = self.config_path();
        let yaml_content = serde_yaml::to_string(config)?;

        // Atomic write: synced temp file, then rename
        let temp_path = config_path.with_extension("yaml.tmp");
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(yaml_content.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &config_path)?;

        debug!("Saved global config to {:?}", config_path);
        Ok(())
    }
}

impl GlobalConfigStorage for GlobalConfigRepository {
    fn get_global_config(&self) -> Result<GlobalConfig> {
        self.load_or_create()
    }

    fn mark_catalog_seeded(&self) -> Result<GlobalConfig> {
        let mut config = self.load_or_create()?;
        let now = Utc::now().to_rfc3339();
        config.catalog_seeded_at = Some(now.clone());
        config.updated_at = now;
        self.save(&config)?;
        Ok(config)
    }
}
