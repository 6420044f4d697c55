//! # CSV Reaction Repository
//!
//! Stores reactions in `reactions.csv`, indexed by the trial they belong to.
//! Symptoms and photos are JSON arrays; an empty photos column means no
//! photos were attached.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use shared::{Reaction, Severity};

use super::columns::{decode_list, decode_timestamp, encode_list, encode_timestamp};
use super::table::{CsvRecord, CsvTable};

/// Reaction collection backed by `reactions.csv`
pub type ReactionRepository = CsvTable<Reaction>;

/// CSV record structure for reactions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionRow {
    id: String,
    food_trial_id: String,
    symptoms: String,
    severity: String,
    minutes_after_exposure: u32,
    photos: Option<String>,
    notes: Option<String>,
    created_at: String,
}

impl CsvRecord for Reaction {
    type Row = ReactionRow;

    fn to_row(&self) -> Result<ReactionRow> {
        let photos = match &self.photos {
            Some(photos) => Some(encode_list(photos)?),
            None => None,
        };

        Ok(ReactionRow {
            id: self.id.clone(),
            food_trial_id: self.food_trial_id.clone(),
            symptoms: encode_list(&self.symptoms)?,
            severity: self.severity.to_string(),
            minutes_after_exposure: self.minutes_after_exposure,
            photos,
            notes: self.notes.clone(),
            created_at: encode_timestamp(&self.created_at),
        })
    }

    fn from_row(row: ReactionRow) -> Result<Self> {
        if row.id.is_empty() {
            return Err(anyhow::anyhow!("Reaction row has an empty id"));
        }

        let severity: Severity = row.severity.parse()?;
        let photos = match row.photos.as_deref() {
            Some(column) if !column.is_empty() => Some(decode_list("photos", column)?),
            _ => None,
        };

        Ok(Reaction {
            symptoms: decode_list("symptoms", &row.symptoms)?,
            created_at: decode_timestamp("created_at", &row.created_at)?,
            id: row.id,
            food_trial_id: row.food_trial_id,
            severity,
            minutes_after_exposure: row.minutes_after_exposure,
            photos,
            notes: row.notes,
        })
    }
}
