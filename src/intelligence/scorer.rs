/// Scoring algorithms for work items
///
/// Computes the five subscores and folds them into one composite score.

use crate::db::{Priority, Status, WorkItem};
use crate::error::EngineError;
use crate::intelligence::context_detector::{ContextSnapshot, EnergyLevel, WorkPattern};
use crate::intelligence::profiler::{ProcrastinationTrigger, ProductivityProfile};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const URGENCY_WEIGHT: f64 = 0.30;
const CONTEXT_WEIGHT: f64 = 0.25;
const PATTERN_WEIGHT: f64 = 0.20;
const MOMENTUM_WEIGHT: f64 = 0.15;
const LEARNING_WEIGHT: f64 = 0.10;

// Selection blends score with factor confidence
const SELECTION_SCORE_WEIGHT: f64 = 0.7;
const SELECTION_CONFIDENCE_WEIGHT: f64 = 0.3;

/// Named scoring variants
///
/// `Optimized` is canonical. `Baseline` differs in two places only: the
/// neutral learning constant (5 instead of 15) and a coarser due-date ladder
/// without the 24–48h tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringStrategy {
    #[default]
    Optimized,
    Baseline,
}

impl ScoringStrategy {
    /// Learning subscore when completion rate is neither high nor low
    pub fn learning_baseline(&self) -> f64 {
        match self {
            ScoringStrategy::Optimized => 15.0,
            ScoringStrategy::Baseline => 5.0,
        }
    }

    /// Urgency bonus for an item due in `hours_until_due` (negative = overdue)
    pub fn due_bonus(&self, hours_until_due: f64) -> f64 {
        if hours_until_due < 0.0 {
            return 50.0;
        }
        match self {
            ScoringStrategy::Optimized => match hours_until_due {
                h if h < 24.0 => 40.0,
                h if h < 48.0 => 30.0,
                h if h < 168.0 => 20.0,
                _ => 0.0,
            },
            ScoringStrategy::Baseline => match hours_until_due {
                h if h < 24.0 => 40.0,
                h if h < 168.0 => 20.0,
                _ => 0.0,
            },
        }
    }

    /// Due-date bonus for an item due at `due`, as seen at `now`
    pub fn due_bonus_at(&self, due: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        if due < now {
            return self.due_bonus(-1.0);
        }
        self.due_bonus((due - now).num_seconds() as f64 / 3600.0)
    }
}

impl std::fmt::Display for ScoringStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoringStrategy::Optimized => write!(f, "optimized"),
            ScoringStrategy::Baseline => write!(f, "baseline"),
        }
    }
}

impl FromStr for ScoringStrategy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "optimized" => Ok(ScoringStrategy::Optimized),
            "baseline" => Ok(ScoringStrategy::Baseline),
            other => Err(EngineError::Config(format!("unknown strategy '{}'", other))),
        }
    }
}

/// The five components of a composite score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub urgency: f64,
    pub context: f64,
    pub pattern: f64,
    pub momentum: f64,
    pub learning: f64,
}

impl SubScores {
    /// Weighted sum, clamped to 0–100
    pub fn composite(&self) -> f64 {
        let score = self.urgency * URGENCY_WEIGHT
            + self.context * CONTEXT_WEIGHT
            + self.pattern * PATTERN_WEIGHT
            + self.momentum * MOMENTUM_WEIGHT
            + self.learning * LEARNING_WEIGHT;

        score.clamp(0.0, 100.0)
    }
}

/// Scorer for work items
pub struct Scorer;

impl Scorer {
    /// Calculate all subscores for an item
    ///
    /// # Arguments
    /// * `item` - Candidate work item
    /// * `context` - Current context snapshot
    /// * `profile` - The user's productivity profile
    /// * `strategy` - Which scoring variant to apply
    pub fn subscores(
        item: &WorkItem,
        context: &ContextSnapshot,
        profile: &ProductivityProfile,
        strategy: ScoringStrategy,
    ) -> SubScores {
        SubScores {
            urgency: Self::urgency(item, context.at, strategy),
            context: Self::context(context, profile),
            pattern: Self::pattern(item, profile),
            momentum: Self::momentum(item, context),
            learning: Self::learning(profile, strategy),
        }
    }

    /// Priority base plus a due-date bonus
    pub fn urgency(item: &WorkItem, now: DateTime<Local>, strategy: ScoringStrategy) -> f64 {
        let base = match item.priority {
            Priority::Low => 10.0,
            Priority::Medium => 30.0,
            Priority::High => 60.0,
            Priority::Urgent => 90.0,
        };

        let bonus = item
            .due_at
            .map(|due| strategy.due_bonus_at(due, now.with_timezone(&Utc)))
            .unwrap_or(0.0);

        base + bonus
    }

    /// How well right now suits working at all
    pub fn context(context: &ContextSnapshot, profile: &ProductivityProfile) -> f64 {
        let optimal_hour = if profile.optimal_hours.contains(&context.hour) {
            40.0
        } else {
            0.0
        };

        let energy = match context.energy_level {
            EnergyLevel::High => 35.0,
            EnergyLevel::Medium => 20.0,
            EnergyLevel::Low => 5.0,
        };

        let pattern = match context.work_pattern {
            WorkPattern::Productive => 25.0,
            WorkPattern::Normal => 15.0,
            WorkPattern::Low => 5.0,
        };

        optimal_hour + energy + pattern
    }

    /// How well the item fits the user's habits; can go negative
    pub fn pattern(item: &WorkItem, profile: &ProductivityProfile) -> f64 {
        let mut score = 0.0;

        let matching_tags = profile
            .preferred_tags
            .iter()
            .filter(|tag| item.tags.contains(*tag))
            .count();
        score += 15.0 * matching_tags as f64;

        if let Some(estimate) = item.estimated_duration_min {
            let diff = (i64::from(estimate) - i64::from(profile.avg_task_duration_min)).abs();
            if diff < 30 {
                score += 20.0;
            }
        }

        if Self::triggers_procrastination(item, profile) {
            score -= 30.0;
        }

        score
    }

    /// Whether the item matches one of the user's known stall triggers
    pub fn triggers_procrastination(item: &WorkItem, profile: &ProductivityProfile) -> bool {
        let no_deadline =
            profile.has_trigger(ProcrastinationTrigger::NoDeadline) && item.due_at.is_none();
        let high_estimate = profile.has_trigger(ProcrastinationTrigger::HighEstimate)
            && item.estimated_duration_min.is_some_and(|m| m > 120);

        no_deadline || high_estimate
    }

    /// Started work and a busy day both pull toward finishing things
    pub fn momentum(item: &WorkItem, context: &ContextSnapshot) -> f64 {
        let mut score = 0.0;

        if item.status == Status::InProgress {
            score += 60.0;
        }

        if context.completed_today > 2 {
            score += 30.0;
        } else if context.completed_today > 0 {
            score += 15.0;
        }

        score
    }

    /// Nudge from the user's overall completion rate
    pub fn learning(profile: &ProductivityProfile, strategy: ScoringStrategy) -> f64 {
        if profile.completion_rate > 80.0 {
            20.0
        } else if profile.completion_rate < 60.0 {
            10.0
        } else {
            strategy.learning_baseline()
        }
    }

    /// Value candidates are ranked by
    pub fn selection_value(score: f64, confidence: f64) -> f64 {
        SELECTION_SCORE_WEIGHT * score + SELECTION_CONFIDENCE_WEIGHT * confidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intelligence::context_detector::ContextDetector;
    use crate::intelligence::factors::FactorGenerator;
    use chrono::{Duration, TimeZone};

    fn at(hour: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 11, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_overdue_urgent_urgency() {
        let now = at(10);
        let mut item = WorkItem::new("t", "u", "t");
        item.priority = Priority::Urgent;
        item.due_at = Some((now - Duration::days(1)).with_timezone(&Utc));

        // 90 base + 50 overdue
        assert_eq!(Scorer::urgency(&item, now, ScoringStrategy::Optimized), 140.0);
    }

    #[test]
    fn test_seconds_overdue_counts_as_overdue() {
        let now = at(10);
        let mut item = WorkItem::new("t", "u", "t");
        item.priority = Priority::Urgent;
        item.due_at = Some((now - Duration::seconds(45)).with_timezone(&Utc));

        assert_eq!(Scorer::urgency(&item, now, ScoringStrategy::Optimized), 140.0);
        assert_eq!(Scorer::urgency(&item, now, ScoringStrategy::Baseline), 140.0);

        let ctx = ContextDetector::snapshot(now, 0);
        let factors = FactorGenerator::generate(&item, &ctx, None);
        assert!(factors.iter().any(|f| f.id == "overdue"));

        // due 30 seconds from now is still the <24h tier
        item.due_at = Some((now + Duration::seconds(30)).with_timezone(&Utc));
        assert_eq!(Scorer::urgency(&item, now, ScoringStrategy::Optimized), 130.0);
    }

    #[test]
    fn test_due_ladders() {
        let optimized = ScoringStrategy::Optimized;
        let baseline = ScoringStrategy::Baseline;

        assert_eq!(optimized.due_bonus(-1.0), 50.0);
        assert_eq!(optimized.due_bonus(5.0), 40.0);
        assert_eq!(optimized.due_bonus(30.0), 30.0);
        assert_eq!(optimized.due_bonus(100.0), 20.0);
        assert_eq!(optimized.due_bonus(200.0), 0.0);

        assert_eq!(baseline.due_bonus(30.0), 20.0);
        assert_eq!(baseline.due_bonus(5.0), 40.0);
    }

    #[test]
    fn test_context_at_optimal_morning_hour() {
        let mut profile = ProductivityProfile::default();
        profile.optimal_hours = vec![9, 10, 11, 14];

        // completed 1 at hour 10: expected 2, normal → +15
        let ctx = ContextDetector::snapshot(at(10), 1);
        assert_eq!(Scorer::context(&ctx, &profile), 40.0 + 35.0 + 15.0);

        let ctx = ContextDetector::snapshot(at(23), 0);
        assert_eq!(Scorer::context(&ctx, &profile), 5.0 + 5.0);
    }

    #[test]
    fn test_pattern_subscore() {
        let mut profile = ProductivityProfile::default();
        profile.preferred_tags = vec!["writing".to_string(), "research".to_string()];
        profile.avg_task_duration_min = 45;

        let mut item = WorkItem::new("t", "u", "t");
        item.tags.insert("writing".to_string());
        item.tags.insert("research".to_string());
        item.estimated_duration_min = Some(60);
        assert_eq!(Scorer::pattern(&item, &profile), 50.0);

        profile.procrastination_triggers = vec![ProcrastinationTrigger::NoDeadline];
        assert_eq!(Scorer::pattern(&item, &profile), 20.0);

        item.due_at = Some(Utc::now());
        assert_eq!(Scorer::pattern(&item, &profile), 50.0);
    }

    #[test]
    fn test_high_estimate_trigger() {
        let mut profile = ProductivityProfile::default();
        profile.procrastination_triggers = vec![ProcrastinationTrigger::HighEstimate];

        let mut item = WorkItem::new("t", "u", "t");
        item.estimated_duration_min = Some(120);
        assert!(!Scorer::triggers_procrastination(&item, &profile));

        item.estimated_duration_min = Some(121);
        assert!(Scorer::triggers_procrastination(&item, &profile));
    }

    #[test]
    fn test_momentum() {
        let mut item = WorkItem::new("t", "u", "t");
        assert_eq!(Scorer::momentum(&item, &ContextDetector::snapshot(at(10), 0)), 0.0);
        assert_eq!(Scorer::momentum(&item, &ContextDetector::snapshot(at(10), 1)), 15.0);

        item.status = Status::InProgress;
        assert_eq!(Scorer::momentum(&item, &ContextDetector::snapshot(at(10), 3)), 90.0);
    }

    #[test]
    fn test_learning_per_strategy() {
        let mut profile = ProductivityProfile::default();
        profile.completion_rate = 70.0;
        assert_eq!(Scorer::learning(&profile, ScoringStrategy::Optimized), 15.0);
        assert_eq!(Scorer::learning(&profile, ScoringStrategy::Baseline), 5.0);

        profile.completion_rate = 90.0;
        assert_eq!(Scorer::learning(&profile, ScoringStrategy::Baseline), 20.0);

        profile.completion_rate = 40.0;
        assert_eq!(Scorer::learning(&profile, ScoringStrategy::Optimized), 10.0);
    }

    #[test]
    fn test_composite_is_clamped() {
        let high = SubScores {
            urgency: 140.0,
            context: 100.0,
            pattern: 200.0,
            momentum: 90.0,
            learning: 20.0,
        };
        assert_eq!(high.composite(), 100.0);

        let low = SubScores {
            urgency: 0.0,
            context: 0.0,
            pattern: -30.0,
            momentum: 0.0,
            learning: 0.0,
        };
        assert_eq!(low.composite(), 0.0);
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("baseline".parse::<ScoringStrategy>().unwrap(), ScoringStrategy::Baseline);
        assert!("fastest".parse::<ScoringStrategy>().is_err());
        assert_eq!(ScoringStrategy::default(), ScoringStrategy::Optimized);
    }
}
