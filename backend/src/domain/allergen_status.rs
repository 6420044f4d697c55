//! Allergen status derivation.
//!
//! Status is never stored. Every answer is computed from one consistent
//! snapshot of the allergen, trial and reaction collections, so identical
//! inputs always give identical outputs.
//!
//! - A leaf allergen is `reaction` if any of its trials has a reaction,
//!   `safe` after [`SAFE_TRIAL_THRESHOLD`] clean trials, `testing` otherwise.
//! - A root with sub-items ignores its own trials: any sub-item in
//!   `reaction` makes it `reaction`, all sub-items `safe` makes it `safe`,
//!   anything else is `testing`.
//!
//! Dangling references (trials naming deleted allergens, reactions naming
//! deleted trials) never fail a read; they simply stop contributing.

use shared::{Allergen, AllergenStatus, FoodTrial, Reaction};
use std::collections::HashSet;

use super::catalog::BIG_9_ALLERGENS;

/// Number of reaction-free trials that establish tolerance
pub const SAFE_TRIAL_THRESHOLD: usize = 3;

/// Read-only view over one snapshot of the allergy collections
#[derive(Debug, Clone, Copy)]
pub struct StatusView<'a> {
    allergens: &'a [Allergen],
    trials: &'a [FoodTrial],
    reactions: &'a [Reaction],
}

impl<'a> StatusView<'a> {
    pub fn new(allergens: &'a [Allergen], trials: &'a [FoodTrial], reactions: &'a [Reaction]) -> Self {
        Self {
            allergens,
            trials,
            reactions,
        }
    }

    pub fn allergen(&self, allergen_id: &str) -> Option<&'a Allergen> {
        self.allergens.iter().find(|allergen| allergen.id == allergen_id)
    }

    fn leaf_status(&self, allergen_id: &str) -> AllergenStatus {
        let trial_ids: HashSet<&str> = self
            .trials
            .iter()
            .filter(|trial| trial.contains_allergen(allergen_id))
            .map(|trial| trial.id.as_str())
            .collect();

        let reacted = self
            .reactions
            .iter()
            .any(|reaction| trial_ids.contains(reaction.food_trial_id.as_str()));

        if reacted {
            AllergenStatus::Reaction
        } else if trial_ids.len() >= SAFE_TRIAL_THRESHOLD {
            AllergenStatus::Safe
        } else {
            AllergenStatus::Testing
        }
    }

    fn leaf_trial_count(&self, allergen_id: &str) -> usize {
        self.trials
            .iter()
            .filter(|trial| trial.contains_allergen(allergen_id))
            .count()
    }

    /// Status of any allergen id. Unknown ids are treated as leaves.
    pub fn status_of(&self, allergen_id: &str) -> AllergenStatus {
        let sub_items = self.sub_items_of(allergen_id);
        if sub_items.is_empty() {
            return self.leaf_status(allergen_id);
        }

        let statuses: Vec<AllergenStatus> = sub_items
            .iter()
            .map(|sub_item| self.leaf_status(&sub_item.id))
            .collect();

        if statuses.contains(&AllergenStatus::Reaction) {
            AllergenStatus::Reaction
        } else if statuses.iter().all(|status| *status == AllergenStatus::Safe) {
            AllergenStatus::Safe
        } else {
            AllergenStatus::Testing
        }
    }

    /// Trial count shown for an allergen; for a root with sub-items this is
    /// the sum over its sub-items, so one trial can be counted twice.
    pub fn trial_count_of(&self, allergen_id: &str) -> usize {
        let sub_items = self.sub_items_of(allergen_id);
        if sub_items.is_empty() {
            return self.leaf_trial_count(allergen_id);
        }
        sub_items
            .iter()
            .map(|sub_item| self.leaf_trial_count(&sub_item.id))
            .sum()
    }

    /// Roots in catalog order, custom roots after them by name
    pub fn root_allergens(&self) -> Vec<&'a Allergen> {
        let mut roots: Vec<&Allergen> = self.allergens.iter().filter(|a| a.is_root()).collect();
        roots.sort_by(|a, b| {
            catalog_position(&a.id)
                .cmp(&catalog_position(&b.id))
                .then_with(|| a.name.cmp(&b.name))
        });
        roots
    }

    pub fn sub_items_of(&self, root_id: &str) -> Vec<&'a Allergen> {
        self.allergens
            .iter()
            .filter(|allergen| allergen.parent_id.as_deref() == Some(root_id))
            .collect()
    }

    /// Parent of a sub-item; `None` for roots, unknown ids and orphans
    pub fn parent_of(&self, sub_item_id: &str) -> Option<&'a Allergen> {
        let parent_id = self.allergen(sub_item_id)?.parent_id.as_deref()?;
        self.allergen(parent_id)
    }

    pub fn is_parent_allergen(&self, allergen_id: &str) -> bool {
        self.allergen(allergen_id)
            .map(Allergen::is_root)
            .unwrap_or(false)
    }

    /// Trials listing the allergen, most recent exposure first
    pub fn trials_for_allergen(&self, allergen_id: &str) -> Vec<&'a FoodTrial> {
        let mut trials: Vec<&FoodTrial> = self
            .trials
            .iter()
            .filter(|trial| trial.contains_allergen(allergen_id))
            .collect();
        trials.sort_by(|a, b| b.date.cmp(&a.date));
        trials
    }

    pub fn reactions_for_allergen(&self, allergen_id: &str) -> Vec<&'a Reaction> {
        let trial_ids: HashSet<&str> = self
            .trials
            .iter()
            .filter(|trial| trial.contains_allergen(allergen_id))
            .map(|trial| trial.id.as_str())
            .collect();

        self.reactions
            .iter()
            .filter(|reaction| trial_ids.contains(reaction.food_trial_id.as_str()))
            .collect()
    }

    /// Display label such as "🥛 Milk"; the raw id when the allergen is gone
    pub fn allergen_label(&self, allergen_id: &str) -> String {
        match self.allergen(allergen_id) {
            Some(Allergen {
                name,
                icon: Some(icon),
                ..
            }) => format!("{} {}", icon, name),
            Some(allergen) => allergen.name.clone(),
            None => allergen_id.to_string(),
        }
    }

    /// Most recently created trials, newest first
    pub fn recent_trials(&self, limit: usize) -> Vec<&'a FoodTrial> {
        let mut trials: Vec<&FoodTrial> = self.trials.iter().collect();
        trials.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        trials.truncate(limit);
        trials
    }
}

fn catalog_position(allergen_id: &str) -> usize {
    BIG_9_ALLERGENS
        .iter()
        .position(|(id, _, _)| *id == allergen_id)
        .unwrap_or(BIG_9_ALLERGENS.len())
}
