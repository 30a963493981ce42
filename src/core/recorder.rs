// Records work items and their lifecycle to the database
//
// Every mutation also lands in the activity log, which is what the
// profiler later reads to find peak hours.

use crate::db::{queries, ActivityType, Database, Status, WorkItem, WorkItemInput};
use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::Arc;

// Titles longer than this are almost certainly pasted by accident
const MAX_TITLE_LENGTH: usize = 500;

const MAX_TAG_LENGTH: usize = 32;

// Everything a tag may not contain
const TAG_JUNK_PATTERN: &str = r"[^a-z0-9_-]+";

// Nobody estimates a single task at more than a working week
const MAX_ESTIMATE_MIN: u32 = 60 * 40;

pub struct Recorder {
    db: Arc<Database>,
    tag_junk: Regex,
}

impl Recorder {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        Ok(Self {
            db,
            tag_junk: Regex::new(TAG_JUNK_PATTERN)?,
        })
    }

    // Validate, clean up and store a new work item. Returns the new id.
    pub async fn create(&self, input: WorkItemInput, at: DateTime<Utc>) -> Result<String> {
        self.validate(&input)?;

        let mut item = WorkItem::new(
            uuid::Uuid::new_v4().to_string(),
            input.user_id.trim(),
            self.sanitize_title(&input.title),
        );
        item.priority = input.priority;
        item.due_at = input.due_at;
        item.estimated_duration_min = input.estimated_duration_min;
        item.tags = self.normalize_tags(&input.tags);
        item.created_at = at;

        let mut tx = self.db.pool().begin().await?;
        queries::insert_work_item(&mut tx, &item).await?;
        queries::log_activity(&mut tx, &item.user_id, Some(&item.id), ActivityType::Created, at)
            .await?;
        tx.commit().await?;

        Ok(item.id)
    }

    pub async fn start(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        self.transition(id, Status::InProgress, ActivityType::Started, at, None)
            .await
    }

    pub async fn complete(
        &self,
        id: &str,
        at: DateTime<Utc>,
        actual_duration_min: Option<u32>,
    ) -> Result<()> {
        if actual_duration_min == Some(0) {
            return Err(EngineError::InvalidInput(
                "actual duration must be positive".to_string(),
            ));
        }
        self.transition(id, Status::Completed, ActivityType::Completed, at, actual_duration_min)
            .await
    }

    pub async fn cancel(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        self.transition(id, Status::Cancelled, ActivityType::Cancelled, at, None)
            .await
    }

    pub async fn archive(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        let item = self.require(id).await?;
        let mut tx = self.db.pool().begin().await?;
        queries::set_archived(&mut tx, id, true).await?;
        queries::log_activity(&mut tx, &item.user_id, Some(id), ActivityType::Updated, at).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn transition(
        &self,
        id: &str,
        status: Status,
        activity: ActivityType,
        at: DateTime<Utc>,
        actual_duration_min: Option<u32>,
    ) -> Result<()> {
        let item = self.require(id).await?;
        if item.status == status {
            return Ok(());
        }

        // The status change and its log entry land together or not at all
        let mut tx = self.db.pool().begin().await?;
        queries::update_status(&mut tx, id, status, at, actual_duration_min).await?;
        queries::log_activity(&mut tx, &item.user_id, Some(id), activity, at).await?;
        tx.commit().await?;

        Ok(())
    }

    async fn require(&self, id: &str) -> Result<WorkItem> {
        self.db
            .get_work_item(id)
            .await?
            .ok_or_else(|| EngineError::WorkItemNotFound(id.to_string()))
    }

    // Check the input makes sense before it goes anywhere near the database
    fn validate(&self, input: &WorkItemInput) -> Result<()> {
        if input.user_id.trim().is_empty() {
            return Err(EngineError::InvalidInput("missing user id".to_string()));
        }

        let title = input.title.trim();
        if title.is_empty() {
            return Err(EngineError::InvalidInput("empty title".to_string()));
        }
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(EngineError::InvalidInput(format!(
                "title exceeds {} characters",
                MAX_TITLE_LENGTH
            )));
        }

        match input.estimated_duration_min {
            Some(0) => Err(EngineError::InvalidInput(
                "estimate must be positive".to_string(),
            )),
            Some(m) if m > MAX_ESTIMATE_MIN => Err(EngineError::InvalidInput(format!(
                "estimate exceeds {} minutes",
                MAX_ESTIMATE_MIN
            ))),
            _ => Ok(()),
        }
    }

    /// Sanitize a title
    ///
    /// - Removes null bytes
    /// - Normalizes whitespace (multiple spaces to single)
    fn sanitize_title(&self, title: &str) -> String {
        title
            .replace('\0', "")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Lower-case tags and strip anything outside `[a-z0-9_-]`
    ///
    /// Tags that end up empty are dropped; duplicates collapse.
    fn normalize_tags(&self, tags: &[String]) -> BTreeSet<String> {
        tags.iter()
            .map(|tag| {
                let lower = tag.trim().to_lowercase().replace(' ', "-");
                let cleaned = self.tag_junk.replace_all(&lower, "");
                cleaned.chars().take(MAX_TAG_LENGTH).collect::<String>()
            })
            .filter(|tag| !tag.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Priority;

    async fn setup() -> (Recorder, Arc<Database>) {
        let db = Arc::new(Database::new_test().await.unwrap());
        (Recorder::new(Arc::clone(&db)).unwrap(), db)
    }

    fn input(title: &str) -> WorkItemInput {
        WorkItemInput {
            user_id: "u1".to_string(),
            title: title.to_string(),
            priority: Priority::High,
            due_at: None,
            estimated_duration_min: Some(45),
            tags: vec!["Deep Work".to_string(), "q4!".to_string(), "  ".to_string()],
        }
    }

    #[tokio::test]
    async fn test_create_work_item() {
        let (recorder, db) = setup().await;

        let id = recorder
            .create(input("  Write   the\0 report "), Utc::now())
            .await
            .unwrap();

        let item = db.get_work_item(&id).await.unwrap().unwrap();
        assert_eq!(item.title, "Write the report");
        assert_eq!(item.priority, Priority::High);
        assert_eq!(
            item.tags.iter().cloned().collect::<Vec<_>>(),
            vec!["deep-work".to_string(), "q4".to_string()]
        );

        let log = db.get_recent_activity("u1", 10).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].activity_type, "created");
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let (recorder, _) = setup().await;

        let result = recorder.create(input("   "), Utc::now()).await;
        assert!(matches!(result, Err(EngineError::InvalidInput(_))));

        let mut zero = input("ok");
        zero.estimated_duration_min = Some(0);
        assert!(recorder.create(zero, Utc::now()).await.is_err());

        let long = "x".repeat(MAX_TITLE_LENGTH + 1);
        assert!(recorder.create(input(&long), Utc::now()).await.is_err());
    }

    #[tokio::test]
    async fn test_lifecycle_logs_activity() {
        let (recorder, db) = setup().await;
        let id = recorder.create(input("Ship it"), Utc::now()).await.unwrap();

        recorder.start(&id, Utc::now()).await.unwrap();
        // starting twice is a no-op
        recorder.start(&id, Utc::now()).await.unwrap();
        recorder.complete(&id, Utc::now(), Some(50)).await.unwrap();

        let item = db.get_work_item(&id).await.unwrap().unwrap();
        assert_eq!(item.status, Status::Completed);
        assert_eq!(item.actual_duration_min, Some(50));

        let log = db.get_recent_activity("u1", 10).await.unwrap();
        assert_eq!(log.len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_item() {
        let (recorder, _) = setup().await;
        let result = recorder.cancel("missing", Utc::now()).await;
        assert!(matches!(result, Err(EngineError::WorkItemNotFound(_))));
    }

    async fn break_activity_log(db: &Database) {
        sqlx::query("DROP TABLE activity_log")
            .execute(db.pool())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_is_undone_when_logging_fails() {
        let (recorder, db) = setup().await;
        break_activity_log(&db).await;

        assert!(recorder.create(input("Lost"), Utc::now()).await.is_err());
        assert!(db.get_recent_work_items("u1", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transition_is_undone_when_logging_fails() {
        let (recorder, db) = setup().await;
        let id = recorder.create(input("Half done"), Utc::now()).await.unwrap();
        break_activity_log(&db).await;

        assert!(recorder.complete(&id, Utc::now(), Some(20)).await.is_err());
        assert!(recorder.archive(&id, Utc::now()).await.is_err());

        let item = db.get_work_item(&id).await.unwrap().unwrap();
        assert_eq!(item.status, Status::Pending);
        assert!(item.completed_at.is_none());
        assert!(!item.archived);
    }

    #[tokio::test]
    async fn test_archive() {
        let (recorder, db) = setup().await;
        let id = recorder.create(input("Old idea"), Utc::now()).await.unwrap();

        recorder.archive(&id, Utc::now()).await.unwrap();
        assert!(db.get_open_work_items("u1").await.unwrap().is_empty());
    }
}
