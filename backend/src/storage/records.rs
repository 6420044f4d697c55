//! Primary keys and secondary index definitions for each collection.

use chrono::{DateTime, Utc};
use shared::{Allergen, BabyActivity, FoodTrial, Reaction};

use super::traits::{Collection, StoredRecord};

/// Index key for a timestamp: its UTC calendar day, `YYYY-MM-DD`
pub fn day_key(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AllergenIndex {
    ByName,
    ByParent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FoodTrialIndex {
    ByDate,
    /// Multi-entry: one key per allergen id on the trial
    ByAllergen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReactionIndex {
    ByTrial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BabyActivityIndex {
    ByTimestamp,
    ByType,
}

impl StoredRecord for Allergen {
    type Index = AllergenIndex;

    const COLLECTION: Collection = Collection::Allergens;

    fn id(&self) -> &str {
        &self.id
    }

    fn indexes() -> &'static [AllergenIndex] {
        &[AllergenIndex::ByName, AllergenIndex::ByParent]
    }

    fn index_keys(&self, index: AllergenIndex) -> Vec<String> {
        match index {
            AllergenIndex::ByName => vec![self.name.clone()],
            AllergenIndex::ByParent => self.parent_id.iter().cloned().collect(),
        }
    }
}

impl StoredRecord for FoodTrial {
    type Index = FoodTrialIndex;

    const COLLECTION: Collection = Collection::FoodTrials;

    fn id(&self) -> &str {
        &self.id
    }

    fn indexes() -> &'static [FoodTrialIndex] {
        &[FoodTrialIndex::ByDate, FoodTrialIndex::ByAllergen]
    }

    fn index_keys(&self, index: FoodTrialIndex) -> Vec<String> {
        match index {
            FoodTrialIndex::ByDate => vec![day_key(&self.date)],
            FoodTrialIndex::ByAllergen => self.allergen_ids.clone(),
        }
    }
}

impl StoredRecord for Reaction {
    type Index = ReactionIndex;

    const COLLECTION: Collection = Collection::Reactions;

    fn id(&self) -> &str {
        &self.id
    }

    fn indexes() -> &'static [ReactionIndex] {
        &[ReactionIndex::ByTrial]
    }

    fn index_keys(&self, index: ReactionIndex) -> Vec<String> {
        match index {
            ReactionIndex::ByTrial => vec![self.food_trial_id.clone()],
        }
    }
}

impl StoredRecord for BabyActivity {
    type Index = BabyActivityIndex;

    const COLLECTION: Collection = Collection::BabyActivities;

    fn id(&self) -> &str {
        &self.id
    }

    fn indexes() -> &'static [BabyActivityIndex] {
        &[BabyActivityIndex::ByTimestamp, BabyActivityIndex::ByType]
    }

    fn index_keys(&self, index: BabyActivityIndex) -> Vec<String> {
        match index {
            BabyActivityIndex::ByTimestamp => vec![day_key(&self.timestamp)],
            BabyActivityIndex::ByType => vec![self.activity_type.as_str().to_string()],
        }
    }
}
