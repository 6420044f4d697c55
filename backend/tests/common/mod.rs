#![allow(dead_code)]

use allergy_tracker::{CsvConnection, TrackerStore};
use chrono::{DateTime, TimeZone, Utc};
use shared::{Allergen, BabyActivity, BabyActivityType, FoodTrial, Reaction, Severity};
use tempfile::TempDir;

/// A store over its own temporary data directory
pub struct TestStore {
    pub dir: TempDir,
    pub store: TrackerStore,
}

impl TestStore {
    pub async fn loaded() -> Self {
        let dir = TempDir::new().unwrap();
        let store = TrackerStore::new(CsvConnection::new(dir.path()).unwrap());
        store.load().await.unwrap();
        Self { dir, store }
    }

    pub async fn initialized() -> Self {
        let test_store = Self::loaded().await;
        test_store.store.initialize().await.unwrap();
        test_store
    }

    /// A second store over the same directory, as after a restart
    pub async fn reopen(&self) -> TrackerStore {
        let store = TrackerStore::new(CsvConnection::new(self.dir.path()).unwrap());
        store.load().await.unwrap();
        store
    }
}

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}

pub fn allergen(id: &str, parent_id: Option<&str>) -> Allergen {
    Allergen {
        id: id.to_string(),
        name: id.to_string(),
        is_custom: true,
        icon: None,
        parent_id: parent_id.map(str::to_string),
    }
}

pub fn trial(food_name: &str, allergen_ids: &[&str], date: DateTime<Utc>) -> FoodTrial {
    FoodTrial {
        id: String::new(),
        food_name: food_name.to_string(),
        allergen_ids: allergen_ids.iter().map(|s| s.to_string()).collect(),
        date,
        amount: Some("1 tsp".to_string()),
        notes: None,
        created_at: date,
    }
}

pub fn reaction(food_trial_id: &str, severity: Severity) -> Reaction {
    Reaction {
        id: String::new(),
        food_trial_id: food_trial_id.to_string(),
        symptoms: vec!["Hives".to_string(), "Rash".to_string()],
        severity,
        minutes_after_exposure: 15,
        photos: None,
        notes: None,
        created_at: Utc::now(),
    }
}

pub fn activity(activity_type: BabyActivityType, timestamp: DateTime<Utc>) -> BabyActivity {
    BabyActivity {
        id: String::new(),
        activity_type,
        timestamp,
        notes: None,
        feed_type: None,
        feed_amount: None,
        duration: None,
        created_at: timestamp,
    }
}
