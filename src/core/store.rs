/// Upstream stores the engine reads from
///
/// The engine only ever sees these traits. `Database` implements both; tests
/// and embedders can plug in anything else.

use crate::db::{ActivityLogEntry, Database, WorkItem};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait WorkItemStore: Send + Sync {
    /// Most recent work items for a user (any status), newest first
    async fn recent_work_items(&self, user_id: &str, limit: i64) -> Result<Vec<WorkItem>>;

    /// Number of items the user completed in `[start, end)`
    async fn count_completed_between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u32>;
}

#[async_trait]
pub trait ActivityLogStore: Send + Sync {
    /// Most recent activity-log entries for a user
    async fn recent_activity(&self, user_id: &str, limit: i64) -> Result<Vec<ActivityLogEntry>>;
}

#[async_trait]
impl WorkItemStore for Database {
    async fn recent_work_items(&self, user_id: &str, limit: i64) -> Result<Vec<WorkItem>> {
        self.get_recent_work_items(user_id, limit).await
    }

    async fn count_completed_between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u32> {
        Database::count_completed_between(self, user_id, start, end).await
    }
}

#[async_trait]
impl ActivityLogStore for Database {
    async fn recent_activity(&self, user_id: &str, limit: i64) -> Result<Vec<ActivityLogEntry>> {
        self.get_recent_activity(user_id, limit).await
    }
}

/// A user's history as seen by the profiler
#[derive(Debug, Clone, Default)]
pub struct History {
    pub items: Vec<WorkItem>,
    pub activity: Vec<ActivityLogEntry>,
}

impl History {
    pub fn new(items: Vec<WorkItem>, activity: Vec<ActivityLogEntry>) -> Self {
        Self { items, activity }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in history completed within `[start, end)`
    pub fn completed_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
        let count = self
            .items
            .iter()
            .filter(|item| item.is_completed())
            .filter_map(|item| item.completed_at)
            .filter(|at| *at >= start && *at < end)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}
