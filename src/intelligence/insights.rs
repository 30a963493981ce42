/// Behavior insights
///
/// Human-readable observations built from a profile and its patterns. Purely
/// descriptive: scoring never reads them.

use crate::intelligence::pattern_detector::{BehaviorPattern, PatternData};
use crate::intelligence::profiler::{ProcrastinationTrigger, ProductivePattern, ProductivityProfile};
use serde::{Deserialize, Serialize};

const HIGH_COMPLETION_RATE: f64 = 80.0;
const LOW_COMPLETION_RATE: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    Strength,
    Weakness,
    Opportunity,
    Trend,
}

impl std::fmt::Display for InsightType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InsightType::Strength => write!(f, "strength"),
            InsightType::Weakness => write!(f, "weakness"),
            InsightType::Opportunity => write!(f, "opportunity"),
            InsightType::Trend => write!(f, "trend"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorInsight {
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub title: String,
    pub description: String,
    /// 0–100
    pub confidence: u32,
    pub suggestion: String,
    /// How many observations back this insight
    pub data_points: usize,
}

pub struct InsightGenerator;

impl InsightGenerator {
    /// Insights for a profile, highest confidence first
    ///
    /// `sample_size` is the number of work items the profile was built from.
    pub fn generate(
        profile: &ProductivityProfile,
        patterns: &[BehaviorPattern],
        sample_size: usize,
    ) -> Vec<BehaviorInsight> {
        let mut insights = Vec::new();

        Self::completion_insights(profile, sample_size, &mut insights);
        for pattern in patterns {
            Self::pattern_insights(pattern, &mut insights);
        }
        Self::habit_insights(profile, sample_size, &mut insights);

        insights.sort_by(|a, b| b.confidence.cmp(&a.confidence));
        insights
    }

    fn completion_insights(profile: &ProductivityProfile, sample_size: usize, out: &mut Vec<BehaviorInsight>) {
        if profile.completion_rate > HIGH_COMPLETION_RATE {
            out.push(BehaviorInsight {
                insight_type: InsightType::Strength,
                title: "Reliable finisher".to_string(),
                description: format!(
                    "You complete {:.0}% of the work you take on.",
                    profile.completion_rate
                ),
                confidence: 85,
                suggestion: "Keep planning at this scale; it is working.".to_string(),
                data_points: sample_size,
            });
        } else if profile.completion_rate < LOW_COMPLETION_RATE {
            out.push(BehaviorInsight {
                insight_type: InsightType::Weakness,
                title: "Many tasks stay open".to_string(),
                description: format!(
                    "Only {:.0}% of your work items get completed.",
                    profile.completion_rate
                ),
                confidence: 80,
                suggestion: "Split large items into steps you can finish in one sitting.".to_string(),
                data_points: sample_size,
            });
        }
    }

    fn pattern_insights(pattern: &BehaviorPattern, out: &mut Vec<BehaviorInsight>) {
        let confidence = (pattern.confidence * 100.0).round().clamp(0.0, 100.0) as u32;

        match &pattern.data {
            PatternData::CompletionTime {
                peak_hour,
                frequency,
                total_completions,
            } => out.push(BehaviorInsight {
                insight_type: InsightType::Opportunity,
                title: format!("Peak finishing hour: {}:00", peak_hour),
                description: format!(
                    "{} of your last {} completions happened around {}:00.",
                    frequency, total_completions, peak_hour
                ),
                confidence,
                suggestion: format!("Protect {}:00 for your most important item.", peak_hour),
                data_points: *total_completions,
            }),
            PatternData::ProductivityHours {
                productive_hours,
                activity_distribution,
            } => {
                let hours: Vec<String> = productive_hours.iter().map(|h| format!("{}:00", h)).collect();
                out.push(BehaviorInsight {
                    insight_type: InsightType::Trend,
                    title: "Most active hours".to_string(),
                    description: format!("Your activity clusters around {}.", hours.join(", ")),
                    confidence,
                    suggestion: "Schedule meetings and admin outside these hours.".to_string(),
                    data_points: activity_distribution.iter().sum(),
                });
            }
            PatternData::TaskPreferences { preferences } => {
                if let Some(best) = preferences.first() {
                    out.push(BehaviorInsight {
                        insight_type: InsightType::Strength,
                        title: format!("Strong on {} priority work", best.priority),
                        description: format!(
                            "You finish {:.0}% of {} priority items.",
                            best.success_rate * 100.0,
                            best.priority
                        ),
                        confidence,
                        suggestion: "Lean on this when you need a quick win.".to_string(),
                        data_points: preferences.iter().map(|p| p.sample_size).sum(),
                    });
                }
            }
            PatternData::Procrastination {
                triggers,
                stale_pending,
                pending_total,
            } => {
                for trigger in triggers {
                    let (title, description, suggestion) = match trigger {
                        ProcrastinationTrigger::NoDeadline => (
                            "Undated tasks stall",
                            format!(
                                "{} of your {} pending items are over a week old with no due date.",
                                stale_pending, pending_total
                            ),
                            "Give open items a due date, even a rough one.",
                        ),
                        ProcrastinationTrigger::HighEstimate => (
                            "Big tasks get put off",
                            format!(
                                "A large share of your {} pending items are estimated above two hours.",
                                pending_total
                            ),
                            "Break long items into pieces under an hour.",
                        ),
                    };
                    out.push(BehaviorInsight {
                        insight_type: InsightType::Weakness,
                        title: title.to_string(),
                        description,
                        confidence,
                        suggestion: suggestion.to_string(),
                        data_points: *pending_total,
                    });
                }
            }
        }
    }

    fn habit_insights(profile: &ProductivityProfile, sample_size: usize, out: &mut Vec<BehaviorInsight>) {
        if profile.has_pattern(ProductivePattern::MorningProductivity) {
            out.push(BehaviorInsight {
                insight_type: InsightType::Strength,
                title: "Morning person".to_string(),
                description: "Most of your completions land before noon.".to_string(),
                confidence: 70,
                suggestion: "Start the day with your hardest item.".to_string(),
                data_points: sample_size,
            });
        }

        if profile.has_pattern(ProductivePattern::IntensiveWorkDays) {
            out.push(BehaviorInsight {
                insight_type: InsightType::Trend,
                title: "Burst work days".to_string(),
                description: "Some days you log far more activity than usual.".to_string(),
                confidence: 60,
                suggestion: "Plan lighter days after intensive ones.".to_string(),
                data_points: sample_size,
            });
        }
    }
}
