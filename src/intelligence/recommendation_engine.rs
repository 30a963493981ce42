/// Recommendation engine
///
/// Picks the best work item to do right now, ranks alternatives and explains
/// the choice. Profiles are cached per user and scores per item; neither cache
/// can change the result, only how fast it arrives.

use crate::cache::{spawn_sweeper, CacheCounters, CacheStats, MemoryCache, TtlCache};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::core::{ActivityLogStore, History, WorkItemStore};
use crate::db::{Database, WorkItem};
use crate::error::{EngineError, Result};
use crate::intelligence::context_detector::{
    ContextDetector, ContextSnapshot, DayOfWeek, EnergyLevel, TimeOfDay, WorkPattern,
};
use crate::intelligence::factors::{Factor, FactorGenerator};
use crate::intelligence::insights::{BehaviorInsight, InsightGenerator};
use crate::intelligence::pattern_detector::{BehaviorPattern, PatternDetector};
use crate::intelligence::profiler::{BehaviorProfiler, ProductivityProfile};
use crate::intelligence::scorer::{Scorer, ScoringStrategy};
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

const MAX_ALTERNATIVES: usize = 3;
const REASONING_FACTORS: usize = 2;

/// A candidate with everything the engine worked out about it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredItem {
    pub item: WorkItem,
    /// 0–100
    pub score: f64,
    /// 0–100
    pub confidence: f64,
    pub factors: Vec<Factor>,
    /// 10–95
    pub success_probability: u32,
    pub estimated_duration_min: u32,
    /// Current energy meets what the item demands
    pub energy_match: bool,
}

impl ScoredItem {
    fn assemble(
        item: &WorkItem,
        context: &ContextSnapshot,
        profile: &ProductivityProfile,
        score: f64,
        confidence: f64,
        factors: Vec<Factor>,
    ) -> Self {
        let success_probability = FactorGenerator::success_probability(item, context, &factors);

        Self {
            item: item.clone(),
            score,
            confidence,
            factors,
            success_probability,
            estimated_duration_min: item
                .estimated_duration_min
                .unwrap_or(profile.avg_task_duration_min),
            energy_match: context.energy_level >= FactorGenerator::required_energy(item),
        }
    }

    /// The value candidates are ranked by
    pub fn selection_value(&self) -> f64 {
        Scorer::selection_value(self.score, self.confidence)
    }
}

/// The engine's answer to "what should I work on now?"
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub best: ScoredItem,
    pub alternatives: Vec<ScoredItem>,
    pub profile: ProductivityProfile,
    pub insights: Vec<BehaviorInsight>,
    pub reasoning: String,
    pub timing_advice: String,
    pub energy_advice: String,
    pub context: ContextSnapshot,
    pub strategy: ScoringStrategy,
}

/// Everything learned from one user's history
#[derive(Debug, Clone, Default)]
struct UserModel {
    profile: ProductivityProfile,
    patterns: Vec<BehaviorPattern>,
    sample_size: usize,
}

impl UserModel {
    fn build(history: &History, now: DateTime<Local>) -> Self {
        Self {
            profile: BehaviorProfiler::build(history, now),
            patterns: PatternDetector::detect_patterns(history, now),
            sample_size: history.items.len(),
        }
    }
}

/// Per-item cache entry
#[derive(Debug, Clone)]
struct CachedScore {
    score: f64,
    confidence: f64,
    factors: Vec<Factor>,
    computed_at: DateTime<Utc>,
    fingerprint: String,
}

impl CachedScore {
    /// `Ok(false)` when the entry was computed from different inputs
    fn is_valid_for(&self, fingerprint: &str) -> Result<bool> {
        if !(0.0..=100.0).contains(&self.score) || !(0.0..=100.0).contains(&self.confidence) {
            return Err(EngineError::CacheCorruption(format!(
                "score {} / confidence {} out of range (computed at {})",
                self.score, self.confidence, self.computed_at
            )));
        }
        Ok(self.fingerprint == fingerprint)
    }
}

/// Every input a score depends on, at the granularity scoring sees it
#[derive(Serialize)]
struct ScoreInputs<'a> {
    item: &'a WorkItem,
    date: NaiveDate,
    hour: u32,
    time_of_day: TimeOfDay,
    day_of_week: DayOfWeek,
    energy_level: EnergyLevel,
    work_pattern: WorkPattern,
    completed_today: u32,
    overdue: bool,
    due_bonus: f64,
    profile: &'a ProductivityProfile,
    strategy: ScoringStrategy,
}

fn fingerprint(
    item: &WorkItem,
    context: &ContextSnapshot,
    profile: &ProductivityProfile,
    strategy: ScoringStrategy,
) -> Result<String> {
    let now = context.at.with_timezone(&Utc);
    let due_bonus = item
        .due_at
        .map(|due| strategy.due_bonus_at(due, now))
        .unwrap_or(0.0);

    let inputs = ScoreInputs {
        item,
        date: context.at.date_naive(),
        hour: context.hour,
        time_of_day: context.time_of_day,
        day_of_week: context.day_of_week,
        energy_level: context.energy_level,
        work_pattern: context.work_pattern,
        completed_today: context.completed_today,
        overdue: item.due_at.is_some_and(|due| due < now),
        due_bonus,
        profile,
        strategy,
    };

    let bytes = serde_json::to_vec(&inputs)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// Recommendation engine
pub struct RecommendationEngine {
    work_items: Arc<dyn WorkItemStore>,
    activity: Arc<dyn ActivityLogStore>,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    profiles: Arc<dyn TtlCache<String, Arc<UserModel>>>,
    item_scores: Arc<dyn TtlCache<String, CachedScore>>,
    counters: Arc<CacheCounters>,
}

impl RecommendationEngine {
    /// Create a new engine reading from the given stores
    pub fn new(
        work_items: Arc<dyn WorkItemStore>,
        activity: Arc<dyn ActivityLogStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            work_items,
            activity,
            config,
            clock: Arc::new(SystemClock),
            profiles: Arc::new(MemoryCache::<String, Arc<UserModel>>::new()),
            item_scores: Arc::new(MemoryCache::<String, CachedScore>::new()),
            counters: Arc::new(CacheCounters::default()),
        }
    }

    /// Engine backed by the local SQLite store for both inputs
    pub fn from_database(db: Arc<Database>, config: EngineConfig) -> Self {
        let work_items: Arc<dyn WorkItemStore> = db.clone();
        let activity: Arc<dyn ActivityLogStore> = db;
        Self::new(work_items, activity, config)
    }

    /// Replace the wall clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Recommend one of `candidates` for `user_id`
    ///
    /// # Returns
    /// * `Ok(Some(_))` - The best eligible candidate with ranked alternatives
    /// * `Ok(None)` - No eligible candidates
    /// * `Err(_)` - Only in strict mode, when upstream data is unavailable
    ///
    /// Each store call gets `EngineConfig::fetch_timeout`; see
    /// [`Self::get_recommendation_within`] to pick a deadline per call.
    pub async fn get_recommendation(
        &self,
        user_id: &str,
        candidates: &[WorkItem],
    ) -> Result<Option<Recommendation>> {
        self.get_recommendation_within(user_id, candidates, self.config.fetch_timeout)
            .await
    }

    /// Like [`Self::get_recommendation`], with `deadline` on each store call
    /// instead of the configured fetch timeout
    pub async fn get_recommendation_within(
        &self,
        user_id: &str,
        candidates: &[WorkItem],
        deadline: Duration,
    ) -> Result<Option<Recommendation>> {
        let eligible: Vec<&WorkItem> = candidates
            .iter()
            .filter(|item| {
                if item.id.trim().is_empty() {
                    let err = EngineError::InvalidItem(format!("'{}' has no id", item.title));
                    warn!(user_id, error = %err, "skipping candidate");
                    return false;
                }
                item.is_candidate()
            })
            .collect();

        if eligible.is_empty() {
            debug!(user_id, "no eligible candidates");
            return Ok(None);
        }

        let now = self.clock.now();
        let (model, history) = self.user_model(user_id, now, deadline).await?;
        let completed_today = self
            .completed_today(user_id, now, history.as_ref(), deadline)
            .await?;
        let context = ContextDetector::snapshot(now, completed_today);

        let mut ranked: Vec<ScoredItem> = eligible
            .into_iter()
            .map(|item| self.score_candidate(item, &context, &model.profile))
            .collect();

        // Stable, so equal values keep input order
        ranked.sort_by(|a, b| {
            b.selection_value()
                .partial_cmp(&a.selection_value())
                .unwrap_or(Ordering::Equal)
        });

        let mut ranked = ranked.into_iter();
        let Some(best) = ranked.next() else {
            return Ok(None);
        };
        let alternatives: Vec<ScoredItem> = ranked.take(MAX_ALTERNATIVES).collect();

        debug!(
            user_id,
            best = %best.item.id,
            score = best.score,
            confidence = best.confidence,
            alternatives = alternatives.len(),
            "recommendation ready"
        );

        Ok(Some(Recommendation {
            reasoning: reasoning(&best),
            timing_advice: timing_advice(&best, &context, &model.profile),
            energy_advice: energy_advice(&best, &context),
            insights: InsightGenerator::generate(&model.profile, &model.patterns, model.sample_size),
            profile: model.profile.clone(),
            best,
            alternatives,
            context,
            strategy: self.config.strategy,
        }))
    }

    /// The user's productivity profile
    pub async fn get_profile(&self, user_id: &str) -> Result<ProductivityProfile> {
        let (model, _) = self.user_model(user_id, self.clock.now(), self.config.fetch_timeout).await?;
        Ok(model.profile.clone())
    }

    /// Insights drawn from the user's profile and patterns
    pub async fn get_insights(&self, user_id: &str) -> Result<Vec<BehaviorInsight>> {
        let (model, _) = self.user_model(user_id, self.clock.now(), self.config.fetch_timeout).await?;
        Ok(InsightGenerator::generate(&model.profile, &model.patterns, model.sample_size))
    }

    pub fn get_cache_stats(&self) -> CacheStats {
        CacheStats {
            profile_cache_size: self.profiles.len(),
            item_score_cache_size: self.item_scores.len(),
            approx_hit_ratio: self.counters.hit_ratio(),
        }
    }

    /// Forget the cached profile for `user_id`, e.g. after their items change
    pub fn invalidate_user(&self, user_id: &str) {
        self.profiles.invalidate(&user_id.to_string());
    }

    /// Periodically evict expired entries from both caches
    pub fn spawn_cache_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let profiles = Arc::clone(&self.profiles);
        let item_scores = Arc::clone(&self.item_scores);
        spawn_sweeper(interval, move || profiles.sweep_expired() + item_scores.sweep_expired())
    }

    /// Cached model, or one built from freshly fetched history
    ///
    /// History is returned alongside when it was fetched. Models built from
    /// degraded (default) data are not cached.
    async fn user_model(
        &self,
        user_id: &str,
        now: DateTime<Local>,
        deadline: Duration,
    ) -> Result<(Arc<UserModel>, Option<History>)> {
        let key = user_id.to_string();

        if self.config.cache_enabled {
            if let Some(entry) = self.profiles.get(&key) {
                self.counters.record_hit();
                return Ok((entry.value, None));
            }
            self.counters.record_miss();
        }

        let history = self.fetch_history(user_id, deadline).await?;
        let model = match &history {
            Some(history) => {
                let model = Arc::new(UserModel::build(history, now));
                if self.config.cache_enabled {
                    self.profiles.put(key, Arc::clone(&model), self.config.profile_ttl);
                }
                model
            }
            None => Arc::new(UserModel::default()),
        };

        Ok((model, history))
    }

    async fn fetch_history(&self, user_id: &str, deadline: Duration) -> Result<Option<History>> {
        let fetch = async {
            tokio::try_join!(
                self.work_items.recent_work_items(user_id, self.config.history_limit),
                self.activity.recent_activity(user_id, self.config.activity_limit),
            )
        };

        let err = match timeout(deadline, fetch).await {
            Ok(Ok((items, activity))) => {
                debug!(user_id, items = items.len(), activity = activity.len(), "history loaded");
                return Ok(Some(History::new(items, activity)));
            }
            Ok(Err(e)) => EngineError::DataUnavailable(format!("history for {}: {}", user_id, e)),
            Err(_) => EngineError::DataUnavailable(format!(
                "history for {} timed out after {:?}",
                user_id, deadline
            )),
        };

        if self.config.strict {
            return Err(err);
        }
        warn!(user_id, error = %err, "using the default profile");
        Ok(None)
    }

    /// Items completed today, from the store, else from history, else 0
    async fn completed_today(
        &self,
        user_id: &str,
        now: DateTime<Local>,
        history: Option<&History>,
        deadline: Duration,
    ) -> Result<u32> {
        let (start, end) = ContextDetector::day_bounds(&now);
        let count = self.work_items.count_completed_between(user_id, start, end);

        let err = match timeout(deadline, count).await {
            Ok(Ok(count)) => return Ok(count),
            Ok(Err(e)) => {
                EngineError::DataUnavailable(format!("today's completions for {}: {}", user_id, e))
            }
            Err(_) => EngineError::DataUnavailable(format!(
                "today's completions for {} timed out after {:?}",
                user_id, deadline
            )),
        };

        if self.config.strict {
            return Err(err);
        }

        match history {
            Some(history) => {
                warn!(user_id, error = %err, "counting today's completions from history");
                Ok(history.completed_between(start, end))
            }
            None => {
                warn!(user_id, error = %err, "assuming no completions today");
                Ok(0)
            }
        }
    }

    fn score_candidate(
        &self,
        item: &WorkItem,
        context: &ContextSnapshot,
        profile: &ProductivityProfile,
    ) -> ScoredItem {
        let strategy = self.config.strategy;

        let fingerprint = if self.config.cache_enabled {
            match fingerprint(item, context, profile, strategy) {
                Ok(fingerprint) => Some(fingerprint),
                Err(e) => {
                    warn!(item_id = %item.id, error = %e, "scoring without cache");
                    None
                }
            }
        } else {
            None
        };

        if let Some(fingerprint) = &fingerprint {
            if let Some(entry) = self.item_scores.get(&item.id) {
                match entry.value.is_valid_for(fingerprint) {
                    Ok(true) => {
                        self.counters.record_hit();
                        let cached = entry.value;
                        return ScoredItem::assemble(
                            item,
                            context,
                            profile,
                            cached.score,
                            cached.confidence,
                            cached.factors,
                        );
                    }
                    Ok(false) => debug!(item_id = %item.id, "cached score is stale"),
                    Err(e) => {
                        warn!(item_id = %item.id, error = %e, "discarding cached score");
                        self.item_scores.invalidate(&item.id);
                    }
                }
            }
            self.counters.record_miss();
        }

        let factors = FactorGenerator::generate(item, context, Some(profile));
        let score = Scorer::subscores(item, context, profile, strategy).composite();
        let confidence = FactorGenerator::confidence_score(&factors);

        if let Some(fingerprint) = fingerprint {
            self.item_scores.put(
                item.id.clone(),
                CachedScore {
                    score,
                    confidence,
                    factors: factors.clone(),
                    computed_at: context.at.with_timezone(&Utc),
                    fingerprint,
                },
                self.config.item_score_ttl,
            );
        }

        ScoredItem::assemble(item, context, profile, score, confidence, factors)
    }
}

fn reasoning(best: &ScoredItem) -> String {
    let reasons: Vec<&str> = best
        .factors
        .iter()
        .take(REASONING_FACTORS)
        .map(|f| f.description.as_str())
        .collect();

    if reasons.is_empty() {
        "Nothing stands out either way; it simply scores highest right now.".to_string()
    } else {
        format!("{}.", reasons.join(". "))
    }
}

fn timing_advice(best: &ScoredItem, context: &ContextSnapshot, profile: &ProductivityProfile) -> String {
    let block = format!("Block about {} minutes.", best.estimated_duration_min);

    if profile.optimal_hours.contains(&context.hour) {
        return format!("{}:00 is one of your peak hours, so start now. {}", context.hour, block);
    }

    let next_peak = profile
        .optimal_hours
        .iter()
        .copied()
        .filter(|h| *h > context.hour)
        .min();

    match next_peak {
        Some(hour) => format!(
            "Your next peak hour is {}:00; start now or save the hardest part for then. {}",
            hour, block
        ),
        None if profile.optimal_hours.is_empty() => {
            format!("Not enough history yet to know your peak hours. {}", block)
        }
        None => format!("Your peak hours are behind you today, so aim for steady progress. {}", block),
    }
}

fn energy_advice(best: &ScoredItem, context: &ContextSnapshot) -> String {
    let required = FactorGenerator::required_energy(&best.item);

    match context.energy_level.cmp(&required) {
        Ordering::Less => format!(
            "This needs {} energy and yours is {} right now; take a short break first or pick a lighter alternative.",
            required, context.energy_level
        ),
        Ordering::Equal => format!("Your {} energy fits what this task demands.", context.energy_level),
        Ordering::Greater => format!(
            "Your energy is {}, more than this needs; follow it with something demanding.",
            context.energy_level
        ),
    }
}
