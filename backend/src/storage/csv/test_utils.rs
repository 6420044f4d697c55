/// Test utilities for automatic cleanup and consistent test infrastructure
///
/// Every test gets its own temporary data directory that is removed when the
/// environment is dropped, even if the test panics.
use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::connection::CsvConnection;
use shared::{Allergen, BabyActivity, BabyActivityType, FoodTrial, Reaction, Severity};

/// RAII test environment that owns a temporary data directory
pub struct TestEnvironment {
    /// Kept alive so the directory survives until drop
    _temp_dir: TempDir,
    pub connection: CsvConnection,
    pub base_path: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let base_path = temp_dir.path().to_path_buf();
        let connection = CsvConnection::new(&base_path)?;

        Ok(TestEnvironment {
            _temp_dir: temp_dir,
            connection,
            base_path,
        })
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_path
    }
}

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}

pub fn allergen(id: &str, parent_id: Option<&str>) -> Allergen {
    Allergen {
        id: id.to_string(),
        name: id.replace('-', " "),
        is_custom: false,
        icon: None,
        parent_id: parent_id.map(str::to_string),
    }
}

pub fn trial(id: &str, allergen_ids: &[&str], date: DateTime<Utc>) -> FoodTrial {
    FoodTrial {
        id: id.to_string(),
        food_name: format!("food for {}", id),
        allergen_ids: allergen_ids.iter().map(|s| s.to_string()).collect(),
        date,
        amount: None,
        notes: None,
        created_at: date,
    }
}

pub fn reaction(id: &str, food_trial_id: &str) -> Reaction {
    Reaction {
        id: id.to_string(),
        food_trial_id: food_trial_id.to_string(),
        symptoms: vec!["Hives".to_string()],
        severity: Severity::Mild,
        minutes_after_exposure: 20,
        photos: None,
        notes: None,
        created_at: at(2025, 1, 1, 0, 0),
    }
}

pub fn activity(id: &str, activity_type: BabyActivityType, timestamp: DateTime<Utc>) -> BabyActivity {
    BabyActivity {
        id: id.to_string(),
        activity_type,
        timestamp,
        notes: None,
        feed_type: None,
        feed_amount: None,
        duration: None,
        created_at: timestamp,
    }
}
