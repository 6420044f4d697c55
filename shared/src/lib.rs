//! Record shapes shared by the allergy tracker store and everything that
//! consumes it.
//!
//! Four collections are persisted: [`Allergen`], [`FoodTrial`], [`Reaction`]
//! and [`BabyActivity`]. Everything else in this crate is either an enum used
//! by those records or a value derived from them on read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Generate a fresh record id (random 128-bit, hyphenated UUID text).
///
/// Ids are produced by the caller so that a write never needs a round-trip to
/// obtain a key.
pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Derived classification of an allergen. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllergenStatus {
    /// At least three clean trials and no reaction
    Safe,
    /// Fewer than three clean trials so far
    Testing,
    /// A reaction was recorded against one of its trials
    Reaction,
}

/// An allergen category or one of its sub-items.
///
/// The hierarchy is two levels deep: roots have no `parent_id`, sub-items
/// point at a root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allergen {
    pub id: String,
    pub name: String,
    pub is_custom: bool,
    pub icon: Option<String>,
    pub parent_id: Option<String>,
}

impl Allergen {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A recorded exposure to one or more allergens through a named food.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodTrial {
    pub id: String,
    pub food_name: String,
    /// Ordered, duplicate-free list of allergen ids
    pub allergen_ids: Vec<String>,
    /// When the food was eaten (may be backdated)
    pub date: DateTime<Utc>,
    pub amount: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FoodTrial {
    pub fn contains_allergen(&self, allergen_id: &str) -> bool {
        self.allergen_ids.iter().any(|id| id == allergen_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

/// Adverse symptoms observed after one food trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub id: String,
    pub food_trial_id: String,
    pub symptoms: Vec<String>,
    pub severity: Severity,
    pub minutes_after_exposure: u32,
    /// Image data URIs or links
    pub photos: Option<Vec<String>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BabyActivityType {
    Sleep,
    Wake,
    Feed,
    Pee,
    Poop,
}

impl BabyActivityType {
    pub const ALL: [BabyActivityType; 5] = [
        BabyActivityType::Sleep,
        BabyActivityType::Wake,
        BabyActivityType::Feed,
        BabyActivityType::Pee,
        BabyActivityType::Poop,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedType {
    Breast,
    Bottle,
    Solid,
}

/// A timestamped infant-care event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BabyActivity {
    pub id: String,
    #[serde(rename = "type")]
    pub activity_type: BabyActivityType,
    pub timestamp: DateTime<Utc>,
    pub notes: Option<String>,
    /// Only meaningful for feed events
    pub feed_type: Option<FeedType>,
    /// Only meaningful for feed events
    pub feed_amount: Option<String>,
    /// Minutes slept before this wake event, inferred when the wake is logged
    pub duration: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Count of activities per type for a single day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub sleep: u32,
    pub wake: u32,
    pub feed: u32,
    pub pee: u32,
    pub poop: u32,
}

impl ActivitySummary {
    pub fn count(&self, activity_type: BabyActivityType) -> u32 {
        match activity_type {
            BabyActivityType::Sleep => self.sleep,
            BabyActivityType::Wake => self.wake,
            BabyActivityType::Feed => self.feed,
            BabyActivityType::Pee => self.pee,
            BabyActivityType::Poop => self.poop,
        }
    }

    pub fn record(&mut self, activity_type: BabyActivityType) {
        let slot = match activity_type {
            BabyActivityType::Sleep => &mut self.sleep,
            BabyActivityType::Wake => &mut self.wake,
            BabyActivityType::Feed => &mut self.feed,
            BabyActivityType::Pee => &mut self.pee,
            BabyActivityType::Poop => &mut self.poop,
        };
        *slot += 1;
    }

    pub fn total(&self) -> u32 {
        self.sleep + self.wake + self.feed + self.pee + self.poop
    }
}

/// Common symptoms offered when logging a reaction, grouped by category.
/// Symptoms are free text; these are suggestions, not a closed set.
pub const SYMPTOM_CATEGORIES: &[(&str, &[&str])] = &[
    ("skin", &["Hives", "Rash", "Eczema flare", "Swelling", "Itching"]),
    ("digestive", &["Vomiting", "Diarrhea", "Stomach pain", "Nausea", "Reflux"]),
    (
        "respiratory",
        &["Wheezing", "Coughing", "Runny nose", "Sneezing", "Difficulty breathing"],
    ),
    ("behavioral", &["Fussiness", "Poor sleep", "Refusing food", "Lethargy"]),
];

/// Error returned when a stored enum name is not recognised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariantError {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariantError {}

// Wire names match the serde representation so CSV columns and JSON agree.
macro_rules! wire_names {
    ($ty:ident, $kind:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariantError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($ty::$variant),)+
                    other => Err(UnknownVariantError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

wire_names!(AllergenStatus, "allergen status", {
    Safe => "safe",
    Testing => "testing",
    Reaction => "reaction",
});

wire_names!(Severity, "severity", {
    Mild => "mild",
    Moderate => "moderate",
    Severe => "severe",
});

wire_names!(BabyActivityType, "activity type", {
    Sleep => "sleep",
    Wake => "wake",
    Feed => "feed",
    Pee => "pee",
    Poop => "poop",
});

wire_names!(FeedType, "feed type", {
    Breast => "breast",
    Bottle => "bottle",
    Solid => "solid",
});
