//! # CSV Food Trial Repository
//!
//! Stores food trials in `food_trials.csv`. The allergen id list is kept as a
//! JSON array in a single column.
//!
//! ```csv
//! id,food_name,allergen_ids,date,amount,notes,created_at
//! 5f0c…,Pancakes,"[""chicken-egg"",""cow-milk""]",2025-01-05T12:00:00.000Z,1 tbsp,,2025-01-05T12:03:10.512Z
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use shared::FoodTrial;

use super::columns::{decode_list, decode_timestamp, encode_list, encode_timestamp};
use super::table::{CsvRecord, CsvTable};

/// Food trial collection backed by `food_trials.csv`
pub type FoodTrialRepository = CsvTable<FoodTrial>;

/// CSV record structure for food trials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodTrialRow {
    id: String,
    food_name: String,
    allergen_ids: String,
    date: String,
    amount: Option<String>,
    notes: Option<String>,
    created_at: String,
}

impl CsvRecord for FoodTrial {
    type Row = FoodTrialRow;

    fn to_row(&self) -> Result<FoodTrialRow> {
        Ok(FoodTrialRow {
            id: self.id.clone(),
            food_name: self.food_name.clone(),
            allergen_ids: encode_list(&self.allergen_ids)?,
            date: encode_timestamp(&self.date),
            amount: self.amount.clone(),
            notes: self.notes.clone(),
            created_at: encode_timestamp(&self.created_at),
        })
    }

    fn from_row(row: FoodTrialRow) -> Result<Self> {
        if row.id.is_empty() {
            return Err(anyhow::anyhow!("Food trial row has an empty id"));
        }

        Ok(FoodTrial {
            allergen_ids: decode_list("allergen_ids", &row.allergen_ids)?,
            date: decode_timestamp("date", &row.date)?,
            created_at: decode_timestamp("created_at", &row.created_at)?,
            id: row.id,
            food_name: row.food_name,
            amount: row.amount,
            notes: row.notes,
        })
    }
}
