//! # CSV Storage Module
//!
//! File-based storage for the tracker: one CSV file per collection plus a
//! YAML global config, all inside a single data directory.
//!
//! ```text
//! data/
//! ├── global_config.yaml
//! ├── allergens.csv
//! ├── food_trials.csv
//! ├── reactions.csv
//! └── baby_activities.csv
//! ```

pub mod allergen_repository;
pub mod baby_activity_repository;
pub mod columns;
pub mod connection;
pub mod food_trial_repository;
pub mod global_config_repository;
pub mod reaction_repository;
pub mod table;

#[cfg(test)]
pub mod test_utils;

pub use allergen_repository::AllergenRepository;
pub use baby_activity_repository::BabyActivityRepository;
pub use connection::CsvConnection;
pub use food_trial_repository::FoodTrialRepository;
pub use global_config_repository::{GlobalConfig, GlobalConfigRepository, GlobalConfigStorage};
pub use reaction_repository::ReactionRepository;
pub use table::{CsvRecord, CsvTable};
