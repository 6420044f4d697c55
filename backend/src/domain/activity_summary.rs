//! Baby activity aggregation.
//!
//! Pure functions over an unordered slice of activities. Day boundaries are
//! calendar days in a caller-supplied time zone; the `today`/`Local` helpers
//! use the machine's local zone.

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use shared::{ActivitySummary, BabyActivity, BabyActivityType};
use std::collections::BTreeMap;

/// True when both instants fall on the same calendar day in `tz`
pub fn is_same_day<Tz: TimeZone>(a: &DateTime<Utc>, b: &DateTime<Utc>, tz: &Tz) -> bool {
    local_day(a, tz) == local_day(b, tz)
}

pub fn local_day<Tz: TimeZone>(instant: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

/// Activities on `day`, most recent first
pub fn activities_on<'a, Tz: TimeZone>(
    activities: &'a [BabyActivity],
    day: NaiveDate,
    tz: &Tz,
) -> Vec<&'a BabyActivity> {
    let mut matching: Vec<&BabyActivity> = activities
        .iter()
        .filter(|activity| local_day(&activity.timestamp, tz) == day)
        .collect();
    matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    matching
}

pub fn summary_for_day<Tz: TimeZone>(activities: &[BabyActivity], day: NaiveDate, tz: &Tz) -> ActivitySummary {
    let mut summary = ActivitySummary::default();
    for activity in activities {
        if local_day(&activity.timestamp, tz) == day {
            summary.record(activity.activity_type);
        }
    }
    summary
}

pub fn todays_summary(activities: &[BabyActivity]) -> ActivitySummary {
    summary_for_day(activities, Local::now().date_naive(), &Local)
}

/// Most recent activity of `activity_type` by event time
pub fn last_activity_of_type(
    activities: &[BabyActivity],
    activity_type: BabyActivityType,
) -> Option<&BabyActivity> {
    activities
        .iter()
        .filter(|activity| activity.activity_type == activity_type)
        .max_by_key(|activity| activity.timestamp)
}

/// Minutes slept before waking at `wake_time`, measured from the latest
/// sleep at or before it. `None` when there is no such sleep.
pub fn infer_sleep_duration(activities: &[BabyActivity], wake_time: DateTime<Utc>) -> Option<i64> {
    let sleep = activities
        .iter()
        .filter(|activity| activity.activity_type == BabyActivityType::Sleep)
        .filter(|activity| activity.timestamp <= wake_time)
        .max_by_key(|activity| activity.timestamp)?;

    let elapsed_ms = (wake_time - sleep.timestamp).num_milliseconds();
    // Half a minute rounds up
    Some((elapsed_ms + 30_000).div_euclid(60_000))
}

/// Timeline grouping: days newest first, activities within a day newest first
pub fn group_by_day<'a, Tz: TimeZone>(
    activities: &'a [BabyActivity],
    tz: &Tz,
) -> Vec<(NaiveDate, Vec<&'a BabyActivity>)> {
    let mut days: BTreeMap<NaiveDate, Vec<&BabyActivity>> = BTreeMap::new();
    for activity in activities {
        days.entry(local_day(&activity.timestamp, tz))
            .or_default()
            .push(activity);
    }

    days.into_iter()
        .rev()
        .map(|(day, mut entries)| {
            entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            (day, entries)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::csv::test_utils::{activity, at};
    use chrono::{Duration, FixedOffset};

    #[test]
    fn test_same_day_depends_on_zone() {
        let late = at(2025, 3, 1, 23, 30);
        let early = at(2025, 3, 2, 0, 30);
        assert!(!is_same_day(&late, &early, &Utc));

        let new_york = FixedOffset::west_opt(5 * 3600).unwrap();
        assert!(is_same_day(&late, &early, &new_york));
    }

    #[test]
    fn test_summary_counts_every_type() {
        let activities = vec![
            activity("a1", BabyActivityType::Feed, at(2025, 3, 1, 6, 0)),
            activity("a2", BabyActivityType::Feed, at(2025, 3, 1, 9, 0)),
            activity("a3", BabyActivityType::Pee, at(2025, 3, 1, 9, 5)),
            activity("a4", BabyActivityType::Sleep, at(2025, 3, 1, 13, 0)),
            activity("a5", BabyActivityType::Feed, at(2025, 3, 2, 6, 0)),
        ];
        let day = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let summary = summary_for_day(&activities, day, &Utc);
        assert_eq!(summary.feed, 2);
        assert_eq!(summary.pee, 1);
        assert_eq!(summary.sleep, 1);
        assert_eq!(summary.wake, 0);
        assert_eq!(summary.poop, 0);
        assert_eq!(summary.total(), 4);

        let on_day: Vec<&str> = activities_on(&activities, day, &Utc)
            .iter()
            .map(|a| a.id.as_str())
            .collect();
        assert_eq!(on_day, vec!["a4", "a3", "a2", "a1"]);
    }

    #[test]
    fn test_todays_summary_sees_now() {
        let activities = vec![
            activity("now", BabyActivityType::Poop, Utc::now()),
            activity("old", BabyActivityType::Poop, Utc::now() - Duration::days(3)),
        ];
        assert_eq!(todays_summary(&activities).poop, 1);
    }

    #[test]
    fn test_sleep_duration_inference() {
        let sleep_at = at(2025, 3, 1, 13, 0);
        let activities = vec![
            activity("old-sleep", BabyActivityType::Sleep, at(2025, 2, 28, 20, 0)),
            activity("sleep", BabyActivityType::Sleep, sleep_at),
        ];

        assert_eq!(
            infer_sleep_duration(&activities, sleep_at + Duration::minutes(95)),
            Some(95)
        );
        assert_eq!(
            infer_sleep_duration(&activities, sleep_at + Duration::seconds(90)),
            Some(2)
        );
        assert_eq!(
            infer_sleep_duration(&activities, sleep_at + Duration::seconds(89)),
            Some(1)
        );

        // A backdated wake pairs with the sleep before it
        assert_eq!(
            infer_sleep_duration(&activities, at(2025, 2, 28, 21, 0)),
            Some(60)
        );
        assert_eq!(infer_sleep_duration(&activities, at(2025, 2, 1, 0, 0)), None);
        assert_eq!(infer_sleep_duration(&[], sleep_at), None);
    }

    #[test]
    fn test_last_activity_and_grouping() {
        let activities = vec![
            activity("f1", BabyActivityType::Feed, at(2025, 3, 1, 6, 0)),
            activity("f2", BabyActivityType::Feed, at(2025, 3, 2, 6, 0)),
            activity("p1", BabyActivityType::Pee, at(2025, 3, 1, 7, 0)),
        ];
        assert_eq!(
            last_activity_of_type(&activities, BabyActivityType::Feed).map(|a| a.id.as_str()),
            Some("f2")
        );
        assert!(last_activity_of_type(&activities, BabyActivityType::Wake).is_none());

        let grouped = group_by_day(&activities, &Utc);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].0, NaiveDate::from_ymd_opt(2025, 3, 2).unwrap());
        let first_day: Vec<&str> = grouped[1].1.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(first_day, vec!["p1", "f1"]);
    }
}
