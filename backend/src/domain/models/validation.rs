//! Write-time checks for incoming records.
//!
//! Storage itself never enforces references between collections; these
//! checks run in the store facade against the latest snapshot before a write
//! is accepted.

use std::collections::HashSet;

use shared::{Allergen, BabyActivity, BabyActivityType, FoodTrial, Reaction};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Allergen name cannot be empty")]
    EmptyAllergenName,
    #[error("Allergen {0} cannot be its own parent")]
    SelfParent(String),
    #[error("Parent allergen {0} does not exist")]
    UnknownParent(String),
    #[error("Allergen {parent_id} is a sub-item and cannot have sub-items of its own")]
    ParentIsSubItem { parent_id: String },
    #[error("Allergen {0} has sub-items and cannot become a sub-item")]
    HasSubItems(String),
    #[error("Food name cannot be empty")]
    EmptyFoodName,
    #[error("A food trial must reference at least one allergen")]
    NoAllergens,
    #[error("Allergen {0} is listed more than once")]
    DuplicateAllergen(String),
    #[error("Allergen {0} does not exist")]
    UnknownAllergen(String),
    #[error("A reaction must list at least one symptom")]
    NoSymptoms,
    #[error("Food trial {0} does not exist")]
    UnknownFoodTrial(String),
    #[error("Feed details are only allowed on feed activities, not {0}")]
    FeedDetailsOnNonFeed(BabyActivityType),
    #[error("Sleep duration is only allowed on wake activities, not {0}")]
    DurationOnNonWake(BabyActivityType),
    #[error("Sleep duration cannot be negative ({0} minutes)")]
    NegativeDuration(i64),
}

/// Check an allergen against the current catalog (which may already contain
/// an older version of the same record).
pub fn validate_allergen(allergen: &Allergen, catalog: &[Allergen]) -> Result<(), ValidationError> {
    if allergen.name.trim().is_empty() {
        return Err(ValidationError::EmptyAllergenName);
    }

    let Some(parent_id) = allergen.parent_id.as_deref() else {
        return Ok(());
    };

    if parent_id == allergen.id {
        return Err(ValidationError::SelfParent(allergen.id.clone()));
    }

    let parent = catalog
        .iter()
        .find(|candidate| candidate.id == parent_id)
        .ok_or_else(|| ValidationError::UnknownParent(parent_id.to_string()))?;

    if parent.parent_id.is_some() {
        return Err(ValidationError::ParentIsSubItem {
            parent_id: parent_id.to_string(),
        });
    }

    let has_children = catalog
        .iter()
        .any(|other| other.parent_id.as_deref() == Some(allergen.id.as_str()));
    if has_children {
        return Err(ValidationError::HasSubItems(allergen.id.clone()));
    }

    Ok(())
}

pub fn validate_food_trial(trial: &FoodTrial, catalog: &[Allergen]) -> Result<(), ValidationError> {
    if trial.food_name.trim().is_empty() {
        return Err(ValidationError::EmptyFoodName);
    }
    if trial.allergen_ids.is_empty() {
        return Err(ValidationError::NoAllergens);
    }

    let mut seen = HashSet::new();
    for allergen_id in &trial.allergen_ids {
        if !seen.insert(allergen_id.as_str()) {
            return Err(ValidationError::DuplicateAllergen(allergen_id.clone()));
        }
        if !catalog.iter().any(|allergen| &allergen.id == allergen_id) {
            return Err(ValidationError::UnknownAllergen(allergen_id.clone()));
        }
    }

    Ok(())
}

pub fn validate_reaction(reaction: &Reaction, trials: &[FoodTrial]) -> Result<(), ValidationError> {
    if reaction.symptoms.iter().all(|symptom| symptom.trim().is_empty()) {
        return Err(ValidationError::NoSymptoms);
    }
    if !trials.iter().any(|trial| trial.id == reaction.food_trial_id) {
        return Err(ValidationError::UnknownFoodTrial(reaction.food_trial_id.clone()));
    }
    Ok(())
}

pub fn validate_baby_activity(activity: &BabyActivity) -> Result<(), ValidationError> {
    let has_feed_details = activity.feed_type.is_some() || activity.feed_amount.is_some();
    if has_feed_details && activity.activity_type != BabyActivityType::Feed {
        return Err(ValidationError::FeedDetailsOnNonFeed(activity.activity_type));
    }

    if let Some(duration) = activity.duration {
        if activity.activity_type != BabyActivityType::Wake {
            return Err(ValidationError::DurationOnNonWake(activity.activity_type));
        }
        if duration < 0 {
            return Err(ValidationError::NegativeDuration(duration));
        }
    }

    Ok(())
}
