// Finds behavioral patterns in task history
//
// Like when most of your tasks get finished around 10am, or when urgent
// tasks reliably get done but low-priority ones rot in the backlog.
// Each pattern type has its own minimum sample size; below it we say nothing.

use crate::core::History;
use crate::db::{Priority, WorkItem};
use crate::intelligence::profiler::{
    activity_histogram, completion_hours, histogram, top_keys, BehaviorProfiler,
    ProcrastinationTrigger,
};
use chrono::{DateTime, Duration, Local, Utc};
use serde::{Deserialize, Serialize};

// Need this many completed items before trusting completion-based patterns
const MIN_COMPLETED_SAMPLE: usize = 5;

// Activity-based patterns need a bit more data
const MIN_ACTIVITY_SAMPLE: usize = 10;

const MIN_PENDING_SAMPLE: usize = 5;

const COMPLETION_TIME_CONFIDENCE: f64 = 0.8;
const PRODUCTIVITY_HOURS_CONFIDENCE: f64 = 0.75;
const TASK_PREFERENCES_CONFIDENCE: f64 = 0.7;
const PROCRASTINATION_CONFIDENCE: f64 = 0.65;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    CompletionTime,
    ProductivityHours,
    TaskPreferences,
    Procrastination,
}

impl std::fmt::Display for PatternType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PatternType::CompletionTime => "completion_time",
            PatternType::ProductivityHours => "productivity_hours",
            PatternType::TaskPreferences => "task_preferences",
            PatternType::Procrastination => "procrastination",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorPattern {
    pub pattern_type: PatternType,
    pub data: PatternData,
    pub confidence: f64,
}

/// Payload of a pattern; the variant always matches `pattern_type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternData {
    CompletionTime {
        peak_hour: u32,
        frequency: usize,
        total_completions: usize,
    },
    ProductivityHours {
        productive_hours: Vec<u32>,
        /// Entries per hour, index = hour of day
        activity_distribution: [usize; 24],
    },
    TaskPreferences {
        preferences: Vec<PriorityPreference>,
    },
    Procrastination {
        triggers: Vec<ProcrastinationTrigger>,
        stale_pending: usize,
        pending_total: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityPreference {
    pub priority: Priority,
    /// completed / total for this priority, 0.0–1.0
    pub success_rate: f64,
    pub sample_size: usize,
}

pub struct PatternDetector;

impl PatternDetector {
    // Main function - finds every pattern the history supports
    pub fn detect_patterns(history: &History, now: DateTime<Local>) -> Vec<BehaviorPattern> {
        let completed: Vec<&WorkItem> = history.items.iter().filter(|i| i.is_completed()).collect();

        [
            Self::detect_completion_time(&completed),
            Self::detect_productivity_hours(history),
            Self::detect_task_preferences(&history.items, completed.len()),
            Self::detect_procrastination(history, now),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Hour at which most completions happen
    fn detect_completion_time(completed: &[&WorkItem]) -> Option<BehaviorPattern> {
        if completed.len() < MIN_COMPLETED_SAMPLE {
            return None;
        }

        let hours = completion_hours(completed);
        let counts = histogram(hours.iter().copied());
        let peak_hour = *top_keys(&counts, 1).first()?;

        Some(BehaviorPattern {
            pattern_type: PatternType::CompletionTime,
            data: PatternData::CompletionTime {
                peak_hour,
                frequency: counts.get(&peak_hour).copied().unwrap_or(0),
                total_completions: hours.len(),
            },
            confidence: COMPLETION_TIME_CONFIDENCE,
        })
    }

    /// Hours with the most logged activity
    fn detect_productivity_hours(history: &History) -> Option<BehaviorPattern> {
        if history.activity.len() < MIN_ACTIVITY_SAMPLE {
            return None;
        }

        let counts = activity_histogram(&history.activity);
        let mut distribution = [0usize; 24];
        for (hour, count) in &counts {
            if let Some(slot) = distribution.get_mut(*hour as usize) {
                *slot = *count;
            }
        }

        Some(BehaviorPattern {
            pattern_type: PatternType::ProductivityHours,
            data: PatternData::ProductivityHours {
                productive_hours: top_keys(&counts, 3),
                activity_distribution: distribution,
            },
            confidence: PRODUCTIVITY_HOURS_CONFIDENCE,
        })
    }

    /// Success rate per priority, measured across all items
    fn detect_task_preferences(items: &[WorkItem], completed: usize) -> Option<BehaviorPattern> {
        if completed < MIN_COMPLETED_SAMPLE {
            return None;
        }

        let mut preferences: Vec<PriorityPreference> = Priority::ALL
            .iter()
            .filter_map(|priority| {
                let bucket: Vec<&WorkItem> =
                    items.iter().filter(|i| i.priority == *priority).collect();
                if bucket.is_empty() {
                    return None;
                }
                let done = bucket.iter().filter(|i| i.is_completed()).count();
                Some(PriorityPreference {
                    priority: *priority,
                    success_rate: done as f64 / bucket.len() as f64,
                    sample_size: bucket.len(),
                })
            })
            .collect();

        // Stable: equal rates stay in low → urgent order
        preferences.sort_by(|a, b| b.success_rate.total_cmp(&a.success_rate));

        Some(BehaviorPattern {
            pattern_type: PatternType::TaskPreferences,
            data: PatternData::TaskPreferences { preferences },
            confidence: TASK_PREFERENCES_CONFIDENCE,
        })
    }

    /// Reuses the profiler's trigger rules; only reported when one fires
    fn detect_procrastination(history: &History, now: DateTime<Local>) -> Option<BehaviorPattern> {
        let pending: Vec<&WorkItem> = history.items.iter().filter(|i| i.is_pending()).collect();
        if pending.len() < MIN_PENDING_SAMPLE {
            return None;
        }

        let triggers = BehaviorProfiler::procrastination_triggers(&history.items, now);
        if triggers.is_empty() {
            return None;
        }

        let cutoff = (now - Duration::days(7)).with_timezone(&Utc);
        let stale_pending = pending.iter().filter(|i| i.created_at < cutoff).count();

        Some(BehaviorPattern {
            pattern_type: PatternType::Procrastination,
            data: PatternData::Procrastination {
                triggers,
                stale_pending,
                pending_total: pending.len(),
            },
            confidence: PROCRASTINATION_CONFIDENCE,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ActivityLogEntry, Status};
    use chrono::TimeZone;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 11, 16, 0, 0).unwrap()
    }

    fn item(id: usize, priority: Priority, completed_hour: Option<u32>) -> WorkItem {
        let mut item = WorkItem::new(format!("t{}", id), "u1", "task");
        item.priority = priority;
        item.created_at = (now() - Duration::days(1)).with_timezone(&Utc);
        if let Some(hour) = completed_hour {
            let at = Local.with_ymd_and_hms(2026, 3, 10, hour, 0, 0).unwrap();
            item.status = Status::Completed;
            item.completed_at = Some(at.with_timezone(&Utc));
        }
        item
    }

    fn log(count: usize, hour: u32) -> Vec<ActivityLogEntry> {
        (0..count)
            .map(|i| ActivityLogEntry {
                id: i as i64,
                user_id: "u1".to_string(),
                work_item_id: None,
                created_at: Local
                    .with_ymd_and_hms(2026, 3, 10, hour, i as u32 % 60, 0)
                    .unwrap()
                    .with_timezone(&Utc),
                activity_type: "completed".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_below_minimum_sample_emits_nothing() {
        let items = (0..4).map(|i| item(i, Priority::High, Some(10))).collect();
        let history = History::new(items, log(9, 10));

        assert!(PatternDetector::detect_patterns(&history, now()).is_empty());
    }

    #[test]
    fn test_completion_time_pattern() {
        let hours = [10, 10, 10, 14, 16];
        let items = hours
            .iter()
            .enumerate()
            .map(|(i, h)| item(i, Priority::Medium, Some(*h)))
            .collect();
        let history = History::new(items, Vec::new());

        let patterns = PatternDetector::detect_patterns(&history, now());
        let completion = patterns
            .iter()
            .find(|p| p.pattern_type == PatternType::CompletionTime)
            .unwrap();

        assert_eq!(completion.confidence, 0.8);
        assert_eq!(
            completion.data,
            PatternData::CompletionTime {
                peak_hour: 10,
                frequency: 3,
                total_completions: 5
            }
        );
    }

    #[test]
    fn test_productivity_hours_pattern() {
        let mut entries = log(6, 9);
        entries.extend(log(4, 15));
        let history = History::new(vec![item(0, Priority::Low, None)], entries);

        let patterns = PatternDetector::detect_patterns(&history, now());
        assert_eq!(patterns.len(), 1);

        match &patterns[0].data {
            PatternData::ProductivityHours {
                productive_hours,
                activity_distribution,
            } => {
                assert_eq!(productive_hours, &vec![9, 15]);
                assert_eq!(activity_distribution[9], 6);
                assert_eq!(activity_distribution[15], 4);
                assert_eq!(activity_distribution.iter().sum::<usize>(), 10);
            }
            other => panic!("unexpected pattern data {:?}", other),
        }
        assert_eq!(patterns[0].confidence, 0.75);
    }

    #[test]
    fn test_task_preferences_sorted_by_success() {
        let mut items = vec![
            item(0, Priority::Urgent, Some(9)),
            item(1, Priority::Urgent, Some(9)),
            item(2, Priority::High, Some(9)),
            item(3, Priority::High, None),
            item(4, Priority::Low, Some(9)),
            item(5, Priority::Low, None),
            item(6, Priority::Low, None),
            item(7, Priority::Low, None),
        ];
        items.push(item(8, Priority::Medium, Some(9)));

        let history = History::new(items, Vec::new());
        let patterns = PatternDetector::detect_patterns(&history, now());
        let prefs = patterns
            .iter()
            .find(|p| p.pattern_type == PatternType::TaskPreferences)
            .unwrap();

        match &prefs.data {
            PatternData::TaskPreferences { preferences } => {
                let order: Vec<Priority> = preferences.iter().map(|p| p.priority).collect();
                // medium 1/1 and urgent 2/2 tie at 1.0: priority order breaks it
                assert_eq!(
                    order,
                    vec![Priority::Medium, Priority::Urgent, Priority::High, Priority::Low]
                );
                assert_eq!(preferences[3].success_rate, 0.25);
                assert_eq!(preferences[3].sample_size, 4);
            }
            other => panic!("unexpected pattern data {:?}", other),
        }
    }

    #[test]
    fn test_procrastination_pattern() {
        let old = (now() - Duration::days(12)).with_timezone(&Utc);
        let items: Vec<WorkItem> = (0..5)
            .map(|i| {
                let mut it = item(i, Priority::Low, None);
                it.created_at = old;
                it
            })
            .collect();

        let patterns = PatternDetector::detect_patterns(&History::new(items, Vec::new()), now());
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].pattern_type, PatternType::Procrastination);
        assert_eq!(
            patterns[0].data,
            PatternData::Procrastination {
                triggers: vec![ProcrastinationTrigger::NoDeadline],
                stale_pending: 5,
                pending_total: 5,
            }
        );
    }

    #[test]
    fn test_pattern_type_display() {
        assert_eq!(PatternType::CompletionTime.to_string(), "completion_time");
        assert_eq!(PatternType::TaskPreferences.to_string(), "task_preferences");
    }
}
