/// Intelligence module
///
/// Profiles behavior, reads the current context and scores work items to
/// recommend what to do next.

pub mod context_detector;
pub mod factors;
pub mod insights;
pub mod pattern_detector;
pub mod profiler;
pub mod recommendation_engine;
pub mod scorer;

pub use context_detector::{
    ContextDetector, ContextSnapshot, DayOfWeek, EnergyLevel, TimeOfDay, WorkPattern,
};
pub use factors::{Factor, FactorGenerator, Polarity};
pub use insights::{BehaviorInsight, InsightGenerator, InsightType};
pub use pattern_detector::{BehaviorPattern, PatternData, PatternDetector, PatternType};
pub use profiler::{BehaviorProfiler, ProcrastinationTrigger, ProductivePattern, ProductivityProfile};
pub use recommendation_engine::{Recommendation, RecommendationEngine, ScoredItem};
pub use scorer::{Scorer, ScoringStrategy, SubScores};
