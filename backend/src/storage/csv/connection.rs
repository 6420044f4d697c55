use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::storage::traits::Collection;

/// Environment variable that overrides the default data directory
pub const DATA_DIR_ENV: &str = "ALLERGY_TRACKER_DATA_DIR";

/// Name of the file that redirects the default data directory elsewhere
pub const REDIRECT_FILE_NAME: &str = ".tracker_redirect";

/// CsvConnection owns the data directory and knows where each collection file lives
#[derive(Debug, Clone)]
pub struct CsvConnection {
    base_directory: PathBuf,
}

impl CsvConnection {
    /// Create a new CSV connection with a base directory
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
            info!("Created data directory: {}", base_path.display());
        }

        Ok(Self {
            base_directory: base_path,
        })
    }

    /// Create a connection in the default data directory.
    ///
    /// Uses `$ALLERGY_TRACKER_DATA_DIR` when set, otherwise
    /// `~/Documents/Allergy Tracker`, following a redirect file if one exists there.
    pub fn new_default() -> Result<Self> {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                info!("Using data directory from {}: {}", DATA_DIR_ENV, dir);
                return Self::new(dir.trim());
            }
        }

        let home_dir = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| anyhow::anyhow!("Could not determine home directory"))?;

        let default_data_dir = PathBuf::from(home_dir)
            .join("Documents")
            .join("Allergy Tracker");

        Self::new(resolve_redirect(default_data_dir))
    }

    /// Get the base directory path
    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Get the CSV file that stores a collection
    pub fn collection_file_path(&self, collection: Collection) -> PathBuf {
        let file_name = match collection {
            Collection::Allergens => "allergens.csv",
            Collection::FoodTrials => "food_trials.csv",
            Collection::Reactions => "reactions.csv",
            Collection::BabyActivities => "baby_activities.csv",
        };
        self.base_directory.join(file_name)
    }

    /// Get the global configuration file path
    pub fn global_config_path(&self) -> PathBuf {
        self.base_directory.join("global_config.yaml")
    }
}

/// Follow a redirect file inside `default_dir` if it names an existing directory
fn resolve_redirect(default_dir: PathBuf) -> PathBuf {
    let redirect_file = default_dir.join(REDIRECT_FILE_NAME);
    if !redirect_file.exists() {
        info!(
            "No redirect file found, using default data directory: {}",
            default_dir.display()
        );
        return default_dir;
    }

    match fs::read_to_string(&redirect_file) {
        Ok(redirected_path) => {
            let redirected_path = redirected_path.trim();
            let path = PathBuf::from(redirected_path);
            if path.is_dir() {
                info!("Found redirect file, using data directory: {}", path.display());
                path
            } else {
                warn!(
                    "Redirect file points to non-existent directory: {}. Using default.",
                    redirected_path
                );
                default_dir
            }
        }
        Err(e) => {
            error!("Failed to read redirect file: {}. Using default directory.", e);
            default_dir
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_creates_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");

        let connection = CsvConnection::new(&nested).unwrap();

        assert!(nested.is_dir());
        assert_eq!(connection.base_directory(), nested.as_path());
        assert_eq!(
            connection.collection_file_path(Collection::FoodTrials),
            nested.join("food_trials.csv")
        );
    }

    #[test]
    fn test_redirect_file_is_followed() {
        let temp_dir = TempDir::new().unwrap();
        let default_dir = temp_dir.path().join("default");
        let target_dir = temp_dir.path().join("elsewhere");
        fs::create_dir_all(&default_dir).unwrap();
        fs::create_dir_all(&target_dir).unwrap();
        fs::write(
            default_dir.join(REDIRECT_FILE_NAME),
            format!("{}\n", target_dir.display()),
        )
        .unwrap();

        assert_eq!(resolve_redirect(default_dir), target_dir);
    }

    #[test]
    fn test_redirect_to_missing_directory_falls_back() {
        let temp_dir = TempDir::new().unwrap();
        let default_dir = temp_dir.path().join("default");
        fs::create_dir_all(&default_dir).unwrap();
        fs::write(default_dir.join(REDIRECT_FILE_NAME), "/does/not/exist").unwrap();

        assert_eq!(resolve_redirect(default_dir.clone()), default_dir);
    }
}
