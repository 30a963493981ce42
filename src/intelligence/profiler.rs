// Builds a productivity profile out of someone's task history
//
// Which hours and days they actually finish things, how long tasks take,
// what they like working on, and what makes them stall.

use crate::core::History;
use crate::db::{ActivityLogEntry, WorkItem};
use crate::intelligence::context_detector::DayOfWeek;
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

const MAX_OPTIMAL_HOURS: usize = 4;
const MAX_OPTIMAL_DAYS: usize = 3;
const MAX_PREFERRED_TAGS: usize = 5;
const MAX_ENERGY_PEAK_HOURS: usize = 3;

pub const DEFAULT_TASK_DURATION_MIN: u32 = 60;

// Pending items without a deadline this old count as stalled
const STALE_AFTER_DAYS: i64 = 7;
const STALE_NO_DEADLINE_THRESHOLD: usize = 3;

const HIGH_ESTIMATE_MIN: u32 = 120;
const HIGH_ESTIMATE_SHARE: f64 = 0.3;

const MORNING_SHARE: f64 = 0.4;
const INTENSIVE_DAY_ENTRIES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductivityProfile {
    pub optimal_hours: Vec<u32>,
    pub optimal_days: Vec<DayOfWeek>,
    pub avg_task_duration_min: u32,
    /// Percentage, always within 0–100
    pub completion_rate: f64,
    pub preferred_tags: Vec<String>,
    pub procrastination_triggers: Vec<ProcrastinationTrigger>,
    pub energy_peak_hours: Vec<u32>,
    pub productive_patterns: Vec<ProductivePattern>,
}

/// Profile used whenever there is no history to learn from
impl Default for ProductivityProfile {
    fn default() -> Self {
        Self {
            optimal_hours: vec![9, 10, 11],
            optimal_days: vec![DayOfWeek::Monday, DayOfWeek::Tuesday, DayOfWeek::Wednesday],
            avg_task_duration_min: DEFAULT_TASK_DURATION_MIN,
            completion_rate: 75.0,
            preferred_tags: Vec::new(),
            procrastination_triggers: Vec::new(),
            energy_peak_hours: vec![9, 14],
            productive_patterns: Vec::new(),
        }
    }
}

impl ProductivityProfile {
    pub fn has_trigger(&self, trigger: ProcrastinationTrigger) -> bool {
        self.procrastination_triggers.contains(&trigger)
    }

    pub fn has_pattern(&self, pattern: ProductivePattern) -> bool {
        self.productive_patterns.contains(&pattern)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcrastinationTrigger {
    /// Old pending items with no due date pile up
    NoDeadline,
    /// Big estimates make up a large share of pending work
    HighEstimate,
}

impl std::fmt::Display for ProcrastinationTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcrastinationTrigger::NoDeadline => write!(f, "no-deadline"),
            ProcrastinationTrigger::HighEstimate => write!(f, "high-estimate"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductivePattern {
    MorningProductivity,
    IntensiveWorkDays,
}

impl std::fmt::Display for ProductivePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductivePattern::MorningProductivity => write!(f, "morning-productivity"),
            ProductivePattern::IntensiveWorkDays => write!(f, "intensive-work-days"),
        }
    }
}

pub struct BehaviorProfiler;

impl BehaviorProfiler {
    /// Build a profile from history. Never fails: no history means defaults.
    pub fn build(history: &History, now: DateTime<Local>) -> ProductivityProfile {
        if history.is_empty() {
            return ProductivityProfile::default();
        }

        let items = &history.items;
        let completed: Vec<&WorkItem> = items.iter().filter(|i| i.is_completed()).collect();
        let completion_hours = completion_hours(&completed);

        let mut optimal_hours = top_keys(&histogram(completion_hours.iter().copied()), MAX_OPTIMAL_HOURS);
        optimal_hours.sort_unstable();

        ProductivityProfile {
            optimal_hours,
            optimal_days: Self::optimal_days(&completed),
            avg_task_duration_min: Self::average_duration(&completed),
            completion_rate: completion_rate(completed.len(), items.len()),
            preferred_tags: Self::preferred_tags(&completed),
            procrastination_triggers: Self::procrastination_triggers(items, now),
            energy_peak_hours: top_keys(&activity_histogram(&history.activity), MAX_ENERGY_PEAK_HOURS),
            productive_patterns: Self::productive_patterns(&completion_hours, &history.activity),
        }
    }

    fn optimal_days(completed: &[&WorkItem]) -> Vec<DayOfWeek> {
        let days = completed
            .iter()
            .filter_map(|item| item.completed_at)
            .map(|at| DayOfWeek::from(at.with_timezone(&Local).weekday()));
        top_keys(&histogram(days), MAX_OPTIMAL_DAYS)
    }

    fn average_duration(completed: &[&WorkItem]) -> u32 {
        let durations: Vec<u32> = completed
            .iter()
            .filter_map(|item| item.actual_duration_min)
            .collect();

        if durations.is_empty() {
            return DEFAULT_TASK_DURATION_MIN;
        }

        let total: u64 = durations.iter().map(|d| u64::from(*d)).sum();
        (total as f64 / durations.len() as f64).round() as u32
    }

    fn preferred_tags(completed: &[&WorkItem]) -> Vec<String> {
        let tags = completed.iter().flat_map(|item| item.tags.iter().cloned());
        top_keys(&histogram(tags), MAX_PREFERRED_TAGS)
    }

    pub(crate) fn procrastination_triggers(items: &[WorkItem], now: DateTime<Local>) -> Vec<ProcrastinationTrigger> {
        let mut triggers = Vec::new();
        let pending: Vec<&WorkItem> = items.iter().filter(|i| i.is_pending()).collect();
        let stale_cutoff = (now - Duration::days(STALE_AFTER_DAYS)).with_timezone(&Utc);

        let stale_without_deadline = pending
            .iter()
            .filter(|item| item.due_at.is_none() && item.created_at < stale_cutoff)
            .count();
        if stale_without_deadline > STALE_NO_DEADLINE_THRESHOLD {
            triggers.push(ProcrastinationTrigger::NoDeadline);
        }

        let high_estimates = pending
            .iter()
            .filter(|item| item.estimated_duration_min.is_some_and(|m| m > HIGH_ESTIMATE_MIN))
            .count();
        if !pending.is_empty() && high_estimates as f64 / pending.len() as f64 > HIGH_ESTIMATE_SHARE {
            triggers.push(ProcrastinationTrigger::HighEstimate);
        }

        triggers
    }

    fn productive_patterns(
        completion_hours: &[u32],
        activity: &[ActivityLogEntry],
    ) -> Vec<ProductivePattern> {
        let mut patterns = Vec::new();

        if !completion_hours.is_empty() {
            let morning = completion_hours.iter().filter(|h| (6..12).contains(*h)).count();
            if morning as f64 / completion_hours.len() as f64 > MORNING_SHARE {
                patterns.push(ProductivePattern::MorningProductivity);
            }
        }

        let per_day: HashMap<NaiveDate, usize> =
            activity.iter().fold(HashMap::new(), |mut acc, entry| {
                *acc.entry(entry.created_at.with_timezone(&Local).date_naive())
                    .or_insert(0) += 1;
                acc
            });
        if per_day.values().any(|count| *count > INTENSIVE_DAY_ENTRIES) {
            patterns.push(ProductivePattern::IntensiveWorkDays);
        }

        patterns
    }
}

/// completed / max(total, 1) × 100
pub fn completion_rate(completed: usize, total: usize) -> f64 {
    (completed as f64 / total.max(1) as f64 * 100.0).clamp(0.0, 100.0)
}

/// Local hour of each completion timestamp
pub(crate) fn completion_hours(completed: &[&WorkItem]) -> Vec<u32> {
    completed
        .iter()
        .filter_map(|item| item.completed_at)
        .map(|at| at.with_timezone(&Local).hour())
        .collect()
}

/// Local hour histogram of activity-log entries
pub(crate) fn activity_histogram(activity: &[ActivityLogEntry]) -> BTreeMap<u32, usize> {
    histogram(activity.iter().map(|e| e.created_at.with_timezone(&Local).hour()))
}

pub(crate) fn histogram<K: Ord>(keys: impl IntoIterator<Item = K>) -> BTreeMap<K, usize> {
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

/// The `n` most frequent keys; equal counts keep ascending key order
pub(crate) fn top_keys<K: Ord + Clone>(counts: &BTreeMap<K, usize>, n: usize) -> Vec<K> {
    let mut ranked: Vec<(&K, &usize)> = counts.iter().collect();
    // stable sort: BTreeMap iteration already yields ascending keys
    ranked.sort_by(|a, b| b.1.cmp(a.1));
    ranked.into_iter().take(n).map(|(k, _)| k.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Status;
    use chrono::TimeZone;

    fn now() -> DateTime<Local> {
        // a Wednesday
        Local.with_ymd_and_hms(2026, 3, 11, 16, 0, 0).unwrap()
    }

    fn completed_at(id: &str, at: DateTime<Local>) -> WorkItem {
        let mut item = WorkItem::new(id, "u1", id);
        item.status = Status::Completed;
        item.created_at = (at - Duration::days(1)).with_timezone(&Utc);
        item.completed_at = Some(at.with_timezone(&Utc));
        item
    }

    fn log_at(id: i64, at: DateTime<Local>) -> ActivityLogEntry {
        ActivityLogEntry {
            id,
            user_id: "u1".to_string(),
            work_item_id: None,
            created_at: at.with_timezone(&Utc),
            activity_type: "updated".to_string(),
        }
    }

    #[test]
    fn test_empty_history_gives_defaults() {
        let profile = BehaviorProfiler::build(&History::default(), now());

        assert_eq!(profile.optimal_hours, vec![9, 10, 11]);
        assert_eq!(
            profile.optimal_days,
            vec![DayOfWeek::Monday, DayOfWeek::Tuesday, DayOfWeek::Wednesday]
        );
        assert_eq!(profile.avg_task_duration_min, 60);
        assert_eq!(profile.completion_rate, 75.0);
        assert!(profile.preferred_tags.is_empty());
        assert!(profile.procrastination_triggers.is_empty());
        assert_eq!(profile.energy_peak_hours, vec![9, 14]);
        assert!(profile.productive_patterns.is_empty());
    }

    #[test]
    fn test_optimal_hours_ties_ascending() {
        let day = Local.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap();
        let mut items = Vec::new();
        // hour 15 ×3, hours 8, 9, 10, 11 ×1 each
        for i in 0..3 {
            items.push(completed_at(&format!("a{}", i), day + Duration::hours(15)));
        }
        for h in [11, 10, 9, 8] {
            items.push(completed_at(&format!("b{}", h), day + Duration::hours(h)));
        }

        let profile = BehaviorProfiler::build(&History::new(items, Vec::new()), now());
        assert_eq!(profile.optimal_hours, vec![8, 9, 10, 15]);
    }

    #[test]
    fn test_optimal_days_and_rate() {
        let monday = Local.with_ymd_and_hms(2026, 3, 9, 10, 0, 0).unwrap();
        let items = vec![
            completed_at("a", monday),
            completed_at("b", monday),
            completed_at("c", monday + Duration::days(2)),
            completed_at("d", monday + Duration::days(4)),
            WorkItem::new("e", "u1", "open"),
        ];

        let profile = BehaviorProfiler::build(&History::new(items, Vec::new()), now());
        assert_eq!(
            profile.optimal_days,
            vec![DayOfWeek::Monday, DayOfWeek::Wednesday, DayOfWeek::Friday]
        );
        assert_eq!(profile.completion_rate, 80.0);
    }

    #[test]
    fn test_average_duration() {
        let at = Local.with_ymd_and_hms(2026, 3, 9, 10, 0, 0).unwrap();
        let mut a = completed_at("a", at);
        a.actual_duration_min = Some(30);
        let mut b = completed_at("b", at);
        b.actual_duration_min = Some(45);
        let c = completed_at("c", at);

        let profile = BehaviorProfiler::build(&History::new(vec![a, b, c], Vec::new()), now());
        assert_eq!(profile.avg_task_duration_min, 38);

        let only_open = History::new(vec![WorkItem::new("x", "u1", "x")], Vec::new());
        assert_eq!(BehaviorProfiler::build(&only_open, now()).avg_task_duration_min, 60);
    }

    #[test]
    fn test_preferred_tags_top_five() {
        let at = Local.with_ymd_and_hms(2026, 3, 9, 10, 0, 0).unwrap();
        let tag_sets: [&[&str]; 3] = [
            &["writing", "deep", "a", "b"],
            &["writing", "deep", "c", "d"],
            &["writing", "e"],
        ];
        let items = tag_sets
            .iter()
            .enumerate()
            .map(|(i, tags)| {
                let mut item = completed_at(&i.to_string(), at);
                item.tags = tags.iter().map(|t| t.to_string()).collect();
                item
            })
            .collect();

        let profile = BehaviorProfiler::build(&History::new(items, Vec::new()), now());
        assert_eq!(profile.preferred_tags, vec!["writing", "deep", "a", "b", "c"]);
    }

    #[test]
    fn test_procrastination_triggers() {
        let old = (now() - Duration::days(10)).with_timezone(&Utc);
        let mut items = Vec::new();
        for i in 0..4 {
            let mut item = WorkItem::new(format!("stale{}", i), "u1", "stale");
            item.created_at = old;
            items.push(item);
        }
        let mut big = WorkItem::new("big", "u1", "big");
        big.estimated_duration_min = Some(240);
        big.created_at = now().with_timezone(&Utc);
        items.push(big);

        let profile = BehaviorProfiler::build(&History::new(items.clone(), Vec::new()), now());
        assert_eq!(
            profile.procrastination_triggers,
            vec![ProcrastinationTrigger::NoDeadline]
        );

        // 2 of 5 pending are big: 40% > 30%
        items[0].estimated_duration_min = Some(180);
        let profile = BehaviorProfiler::build(&History::new(items, Vec::new()), now());
        assert!(profile.has_trigger(ProcrastinationTrigger::HighEstimate));
    }

    #[test]
    fn test_productive_patterns() {
        let day = Local.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap();
        let items = vec![
            completed_at("a", day + Duration::hours(7)),
            completed_at("b", day + Duration::hours(9)),
            completed_at("c", day + Duration::hours(15)),
        ];
        let log: Vec<ActivityLogEntry> = (0..11)
            .map(|i| log_at(i, day + Duration::hours(13) + Duration::minutes(i)))
            .collect();

        let profile = BehaviorProfiler::build(&History::new(items, log), now());
        assert!(profile.has_pattern(ProductivePattern::MorningProductivity));
        assert!(profile.has_pattern(ProductivePattern::IntensiveWorkDays));
        assert_eq!(profile.energy_peak_hours, vec![13]);
    }

    #[test]
    fn test_top_keys() {
        let counts = histogram([5u32, 3, 3, 9, 9, 1]);
        assert_eq!(top_keys(&counts, 2), vec![3, 9]);
        assert_eq!(top_keys(&counts, 10), vec![3, 9, 1, 5]);
    }

    #[test]
    fn test_completion_rate_bounds() {
        assert_eq!(completion_rate(0, 0), 0.0);
        assert_eq!(completion_rate(3, 3), 100.0);
        assert_eq!(completion_rate(1, 4), 25.0);
    }

    proptest::proptest! {
        #[test]
        fn prop_profile_stays_in_range(
            items in proptest::collection::vec((proptest::bool::ANY, 0i64..2000), 0..60)
        ) {
            let history = History::new(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, (done, hours_ago))| {
                        let at = now() - Duration::hours(*hours_ago);
                        if *done {
                            completed_at(&i.to_string(), at)
                        } else {
                            let mut item = WorkItem::new(i.to_string(), "u1", "open");
                            item.created_at = at.with_timezone(&Utc);
                            item
                        }
                    })
                    .collect(),
                Vec::new(),
            );

            let profile = BehaviorProfiler::build(&history, now());
            proptest::prop_assert!((0.0..=100.0).contains(&profile.completion_rate));
            proptest::prop_assert!(profile.optimal_hours.len() <= 4);
            proptest::prop_assert!(profile.optimal_hours.iter().all(|h| *h < 24));
            proptest::prop_assert!(profile.optimal_days.len() <= 3);
        }
    }
}
