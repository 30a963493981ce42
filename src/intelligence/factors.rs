/// Decision factors
///
/// A factor is one named, weighted reason for or against working on an item
/// right now. Factors feed the confidence score, the success probability and
/// the human-readable reasoning; they are recomputed on every call.

use crate::db::{Priority, Status, WorkItem};
use crate::intelligence::context_detector::{ContextSnapshot, EnergyLevel, TimeOfDay, WorkPattern};
use crate::intelligence::profiler::ProductivityProfile;
use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub id: String,
    pub label: String,
    pub description: String,
    /// 0–100
    pub weight: u32,
    pub polarity: Polarity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Positive,
    Negative,
    Neutral,
}

impl Factor {
    fn new(id: &str, label: &str, description: impl Into<String>, weight: u32, polarity: Polarity) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            description: description.into(),
            weight,
            polarity,
        }
    }

    fn positive(id: &str, label: &str, description: impl Into<String>, weight: u32) -> Self {
        Self::new(id, label, description, weight, Polarity::Positive)
    }

    fn negative(id: &str, label: &str, description: impl Into<String>, weight: u32) -> Self {
        Self::new(id, label, description, weight, Polarity::Negative)
    }
}

// Items estimated above this need a steadier stretch of focus
const MEDIUM_ENERGY_DURATION_MIN: u32 = 60;

pub struct FactorGenerator;

impl FactorGenerator {
    /// All factors that apply to `item` right now, heaviest first
    pub fn generate(
        item: &WorkItem,
        context: &ContextSnapshot,
        profile: Option<&ProductivityProfile>,
    ) -> Vec<Factor> {
        let mut factors = Vec::new();

        Self::urgency_factors(item, context, &mut factors);
        Self::time_factors(context, &mut factors);
        Self::energy_factors(item, context, &mut factors);
        Self::momentum_factors(item, context, &mut factors);
        if let Some(profile) = profile {
            Self::profile_factors(item, context, profile, &mut factors);
        }

        // Stable: equal weights keep the order above
        factors.sort_by(|a, b| b.weight.cmp(&a.weight));
        factors
    }

    fn urgency_factors(item: &WorkItem, context: &ContextSnapshot, out: &mut Vec<Factor>) {
        if let Some(due_at) = item.due_at {
            let today = context.at.date_naive();
            let due_day = due_at.with_timezone(&Local).date_naive();

            if due_at < context.at.with_timezone(&Utc) {
                out.push(Factor::negative(
                    "overdue",
                    "Overdue",
                    "Past its due date, every hour adds pressure",
                    100,
                ));
            } else if due_day == today {
                out.push(Factor::positive("due_today", "Due today", "Due before the day is out", 95));
            } else if today.succ_opt() == Some(due_day) {
                out.push(Factor::positive("due_tomorrow", "Due tomorrow", "Due tomorrow, starting now leaves slack", 80));
            }
        }

        if item.priority.is_elevated() {
            out.push(Factor::positive(
                "high_priority",
                "High priority",
                format!("Marked {} priority", item.priority),
                70,
            ));
        }
    }

    fn time_factors(context: &ContextSnapshot, out: &mut Vec<Factor>) {
        if context.time_of_day == TimeOfDay::Morning && context.energy_level == EnergyLevel::High {
            out.push(Factor::positive(
                "morning_energy",
                "Morning focus",
                "Mornings are your sharpest hours",
                75,
            ));
        }

        if context.work_pattern == WorkPattern::Productive {
            out.push(Factor::positive(
                "productive_streak",
                "On a roll",
                "You are ahead of your usual pace today",
                60,
            ));
        }

        if context.energy_level == EnergyLevel::High {
            out.push(Factor::positive("high_energy", "High energy", "Energy is high right now", 65));
        }
    }

    fn energy_factors(item: &WorkItem, context: &ContextSnapshot, out: &mut Vec<Factor>) {
        if Self::required_energy(item) != EnergyLevel::High {
            return;
        }

        match context.energy_level {
            EnergyLevel::High => out.push(Factor::positive(
                "energy_match",
                "Energy match",
                "Demanding task while your energy is high",
                55,
            )),
            EnergyLevel::Low => out.push(Factor::negative(
                "energy_mismatch",
                "Energy mismatch",
                "Demanding task while your energy is low",
                40,
            )),
            EnergyLevel::Medium => {}
        }
    }

    fn momentum_factors(item: &WorkItem, context: &ContextSnapshot, out: &mut Vec<Factor>) {
        if item.status == Status::InProgress {
            out.push(Factor::positive(
                "in_progress",
                "In progress",
                "Already started, finishing it closes an open loop",
                90,
            ));
        }

        if context.completed_today > 2 {
            out.push(Factor::positive(
                "momentum",
                "Momentum",
                format!("{} tasks finished today already", context.completed_today),
                55,
            ));
        }
    }

    fn profile_factors(
        item: &WorkItem,
        context: &ContextSnapshot,
        profile: &ProductivityProfile,
        out: &mut Vec<Factor>,
    ) {
        if profile.optimal_hours.contains(&context.hour) {
            out.push(Factor::positive(
                "peak_hour",
                "Peak hour",
                format!("{}:00 is one of your most productive hours", context.hour),
                50,
            ));
        }

        let shared: Vec<&str> = profile
            .preferred_tags
            .iter()
            .filter(|tag| item.tags.contains(*tag))
            .map(String::as_str)
            .collect();
        if !shared.is_empty() {
            out.push(Factor::positive(
                "preferred_tags",
                "Familiar ground",
                format!("Tagged {}, the kind of work you usually finish", shared.join(", ")),
                45,
            ));
        }
    }

    /// How much energy the item is likely to demand
    pub fn required_energy(item: &WorkItem) -> EnergyLevel {
        if item.priority.is_elevated() {
            EnergyLevel::High
        } else if item
            .estimated_duration_min
            .is_some_and(|m| m > MEDIUM_ENERGY_DURATION_MIN)
        {
            EnergyLevel::Medium
        } else {
            EnergyLevel::Low
        }
    }

    /// Σ positive weight − ½ Σ negative weight, clamped to 0–100
    pub fn confidence_score(factors: &[Factor]) -> f64 {
        let (positive, negative) = factors.iter().fold((0.0, 0.0), |(pos, neg), f| match f.polarity {
            Polarity::Positive => (pos + f64::from(f.weight), neg),
            Polarity::Negative => (pos, neg + f64::from(f.weight)),
            Polarity::Neutral => (pos, neg),
        });

        (positive - 0.5 * negative).clamp(0.0, 100.0)
    }

    /// Estimated chance (10–95%) the item gets finished if started now
    pub fn success_probability(item: &WorkItem, context: &ContextSnapshot, factors: &[Factor]) -> u32 {
        let mut probability: i64 = 50;

        if context.energy_level == EnergyLevel::High {
            probability += 15;
        }
        if context.work_pattern == WorkPattern::Productive {
            probability += 10;
        }
        if item.status == Status::InProgress {
            probability += 20;
        }
        if matches!(item.priority, Priority::High | Priority::Urgent) {
            probability += 10;
        }

        let negatives = factors
            .iter()
            .filter(|f| f.polarity == Polarity::Negative)
            .count() as i64;
        probability -= 5 * negatives;

        probability.clamp(10, 95) as u32
    }
}
