//! Calendar view over food trials.
//!
//! Trials are grouped by the local calendar day they were eaten on, and each
//! day carries a flag telling whether any of its trials led to a reaction.

use chrono::{Datelike, NaiveDate, TimeZone};
use serde::Serialize;
use shared::{FoodTrial, Reaction};
use std::collections::{BTreeMap, HashSet};

use super::activity_summary::local_day;

/// All trials eaten on one day
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialDay {
    pub date: NaiveDate,
    /// Earliest first
    pub trials: Vec<FoodTrial>,
    pub has_reaction: bool,
}

/// Every day with at least one trial, oldest first
pub fn trials_by_day<Tz: TimeZone>(trials: &[FoodTrial], reactions: &[Reaction], tz: &Tz) -> Vec<TrialDay> {
    let reacted: HashSet<&str> = reactions
        .iter()
        .map(|reaction| reaction.food_trial_id.as_str())
        .collect();

    let mut days: BTreeMap<NaiveDate, Vec<FoodTrial>> = BTreeMap::new();
    for trial in trials {
        days.entry(local_day(&trial.date, tz))
            .or_default()
            .push(trial.clone());
    }

    days.into_iter()
        .map(|(date, mut trials)| {
            trials.sort_by(|a, b| a.date.cmp(&b.date));
            let has_reaction = trials.iter().any(|trial| reacted.contains(trial.id.as_str()));
            TrialDay {
                date,
                trials,
                has_reaction,
            }
        })
        .collect()
}

/// Days of one month that have trials
pub fn trials_in_month<Tz: TimeZone>(
    trials: &[FoodTrial],
    reactions: &[Reaction],
    year: i32,
    month: u32,
    tz: &Tz,
) -> Vec<TrialDay> {
    trials_by_day(trials, reactions, tz)
        .into_iter()
        .filter(|day| day.date.year() == year && day.date.month() == month)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::csv::test_utils::{at, reaction, trial};
    use chrono::Utc;

    #[test]
    fn test_days_are_grouped_and_flagged() {
        let trials = vec![
            trial("evening", &["eggs"], at(2025, 4, 2, 18, 0)),
            trial("morning", &["milk"], at(2025, 4, 2, 8, 0)),
            trial("other-day", &["soy"], at(2025, 4, 5, 12, 0)),
            trial("may", &["soy"], at(2025, 5, 1, 12, 0)),
        ];
        let reactions = vec![reaction("r1", "evening")];

        let days = trials_by_day(&trials, &reactions, &Utc);
        assert_eq!(days.len(), 3);

        let first = &days[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2025, 4, 2).unwrap());
        let ids: Vec<&str> = first.trials.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["morning", "evening"]);
        assert!(first.has_reaction);
        assert!(!days[1].has_reaction);

        let april = trials_in_month(&trials, &reactions, 2025, 4, &Utc);
        assert_eq!(april.len(), 2);
    }

    #[test]
    fn test_orphan_reactions_do_not_flag_days() {
        let trials = vec![trial("t1", &["eggs"], at(2025, 4, 2, 18, 0))];
        let reactions = vec![reaction("r1", "deleted")];
        let days = trials_by_day(&trials, &reactions, &Utc);
        assert!(!days[0].has_reaction);
    }
}
