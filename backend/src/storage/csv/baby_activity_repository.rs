//! # CSV Baby Activity Repository
//!
//! Stores sleep, wake, feed and diaper events in `baby_activities.csv`,
//! indexed by UTC day and by activity type.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use shared::{BabyActivity, BabyActivityType, FeedType};

use super::columns::{decode_timestamp, encode_timestamp};
use super::table::{CsvRecord, CsvTable};

/// Baby activity collection backed by `baby_activities.csv`
pub type BabyActivityRepository = CsvTable<BabyActivity>;

/// CSV record structure for baby activities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BabyActivityRow {
    id: String,
    activity_type: String,
    timestamp: String,
    notes: Option<String>,
    feed_type: Option<String>,
    feed_amount: Option<String>,
    duration: Option<i64>,
    created_at: String,
}

impl CsvRecord for BabyActivity {
    type Row = BabyActivityRow;

    fn to_row(&self) -> Result<BabyActivityRow> {
        Ok(BabyActivityRow {
            id: self.id.clone(),
            activity_type: self.activity_type.to_string(),
            timestamp: encode_timestamp(&self.timestamp),
            notes: self.notes.clone(),
            feed_type: self.feed_type.map(|feed_type| feed_type.to_string()),
            feed_amount: self.feed_amount.clone(),
            duration: self.duration,
            created_at: encode_timestamp(&self.created_at),
        })
    }

    fn from_row(row: BabyActivityRow) -> Result<Self> {
        if row.id.is_empty() {
            return Err(anyhow::anyhow!("Baby activity row has an empty id"));
        }

        let activity_type: BabyActivityType = row.activity_type.parse()?;
        let feed_type = match row.feed_type.as_deref() {
            Some(value) if !value.is_empty() => Some(value.parse::<FeedType>()?),
            _ => None,
        };

        Ok(BabyActivity {
            timestamp: decode_timestamp("timestamp", &row.timestamp)?,
            created_at: decode_timestamp("created_at", &row.created_at)?,
            id: row.id,
            activity_type,
            notes: row.notes,
            feed_type,
            feed_amount: row.feed_amount,
            duration: row.duration,
        })
    }
}
