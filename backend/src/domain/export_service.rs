//! Export service domain logic for the allergy tracker.
//!
//! Bundles every record of one snapshot into a single serde value that can be
//! rendered as JSON or written to a file for backup. Report formatting (CSV,
//! PDF) is left to the presentation layer.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{Allergen, BabyActivity, FoodTrial, Reaction};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use super::live_query::StoreSnapshot;

/// Every record in the store at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataExport {
    pub allergens: Vec<Allergen>,
    pub food_trials: Vec<FoodTrial>,
    pub reactions: Vec<Reaction>,
    pub baby_activities: Vec<BabyActivity>,
    pub exported_at: DateTime<Utc>,
}

impl DataExport {
    pub fn record_count(&self) -> usize {
        self.allergens.len() + self.food_trials.len() + self.reactions.len() + self.baby_activities.len()
    }
}

/// Export service that handles all export-related business logic
#[derive(Clone, Default)]
pub struct ExportService {}

impl ExportService {
    pub fn new() -> Self {
        Self {}
    }

    /// Bundle a snapshot; trials and activities newest first
    pub fn export_all_data(&self, snapshot: &StoreSnapshot) -> DataExport {
        let mut food_trials = snapshot.food_trials.to_vec();
        food_trials.sort_by(|a, b| b.date.cmp(&a.date));

        let mut baby_activities = snapshot.baby_activities.to_vec();
        baby_activities.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let export = DataExport {
            allergens: snapshot.allergens.to_vec(),
            food_trials,
            reactions: snapshot.reactions.to_vec(),
            baby_activities,
            exported_at: Utc::now(),
        };

        info!(
            "Exported {} records (snapshot {})",
            export.record_count(),
            snapshot.sequence
        );
        export
    }

    pub fn to_json(&self, export: &DataExport) -> Result<String> {
        serde_json::to_string_pretty(export).context("Failed to serialize data export")
    }

    /// File name for an export taken at `exported_at`
    pub fn export_file_name(&self, export: &DataExport) -> String {
        format!("allergy_tracker_export_{}.json", export.exported_at.format("%Y%m%d_%H%M%S"))
    }

    /// Write the export as JSON into `directory`, creating it if needed
    pub fn export_to_path(&self, export: &DataExport, directory: &str) -> Result<PathBuf> {
        let export_dir = PathBuf::from(self.sanitize_path(directory));
        fs::create_dir_all(&export_dir)
            .with_context(|| format!("Failed to create export directory {:?}", export_dir))?;

        let file_path = export_dir.join(self.export_file_name(export));
        let json = self.to_json(export)?;

        if let Err(e) = write_atomically(&file_path, &json) {
            error!("Failed to write export file to {:?}: {}", file_path, e);
            return Err(e).with_context(|| format!("Failed to write export file {:?}", file_path));
        }

        info!("Wrote {} records to {:?}", export.record_count(), file_path);
        Ok(file_path)
    }

    /// Trim whitespace and one pair of surrounding quotes from user input
    fn sanitize_path(&self, path: &str) -> String {
        let trimmed = path.trim();
        let unquoted = ['"', '\'']
            .iter()
            .find_map(|quote| {
                trimmed
                    .strip_prefix(*quote)
                    .and_then(|rest| rest.strip_suffix(*quote))
            })
            .unwrap_or(trimmed);
        unquoted.trim().to_string()
    }
}

fn write_atomically(path: &Path, contents: &str) -> std::io::Result<()> {
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, contents)?;
    fs::rename(&temp_path, path)
}
