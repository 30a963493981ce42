/// SQL query functions for database operations
///
/// All queries use sqlx with bound parameters.

use crate::db::models::*;
use crate::db::Database;
use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection};

impl Database {
    /// Insert a new work item
    pub async fn insert_work_item(&self, item: &WorkItem) -> Result<()> {
        let mut conn = self.pool().acquire().await?;
        insert_work_item(&mut conn, item).await
    }

    /// Get a work item by ID
    pub async fn get_work_item(&self, id: &str) -> Result<Option<WorkItem>> {
        let row = sqlx::query_as::<_, WorkItemRow>("SELECT * FROM work_items WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        row.map(WorkItem::try_from).transpose()
    }

    /// Change the status of a work item
    ///
    /// Moving to `completed` stamps `completed_at`; moving anywhere else clears it.
    pub async fn update_status(
        &self,
        id: &str,
        status: Status,
        at: DateTime<Utc>,
        actual_duration_min: Option<u32>,
    ) -> Result<()> {
        let mut conn = self.pool().acquire().await?;
        update_status(&mut conn, id, status, at, actual_duration_min).await
    }

    /// Archive or unarchive a work item
    pub async fn set_archived(&self, id: &str, archived: bool) -> Result<()> {
        let mut conn = self.pool().acquire().await?;
        set_archived(&mut conn, id, archived).await
    }

    /// Get the most recent work items for a user, newest first
    ///
    /// Rows that fail to convert are skipped rather than failing the batch.
    pub async fn get_recent_work_items(&self, user_id: &str, limit: i64) -> Result<Vec<WorkItem>> {
        let rows = sqlx::query_as::<_, WorkItemRow>(
            "SELECT * FROM work_items WHERE user_id = ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(convert_rows(rows))
    }

    /// Get the open (recommendable) work items for a user
    pub async fn get_open_work_items(&self, user_id: &str) -> Result<Vec<WorkItem>> {
        let rows = sqlx::query_as::<_, WorkItemRow>(
            r#"
            SELECT * FROM work_items
            WHERE user_id = ? AND status != 'completed' AND archived = 0
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(convert_rows(rows))
    }

    /// Count a user's items completed in `[start, end)`
    pub async fn count_completed_between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u32> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) FROM work_items
            WHERE user_id = ? AND status = 'completed'
              AND completed_at >= ? AND completed_at < ?
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_one(self.pool())
        .await?;

        let count: i64 = row.get(0);
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    /// Append an entry to the activity log
    pub async fn log_activity(
        &self,
        user_id: &str,
        work_item_id: Option<&str>,
        activity_type: ActivityType,
        at: DateTime<Utc>,
    ) -> Result<i64> {
        let mut conn = self.pool().acquire().await?;
        log_activity(&mut conn, user_id, work_item_id, activity_type, at).await
    }

    /// Get the most recent activity-log entries for a user, newest first
    pub async fn get_recent_activity(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<ActivityLogEntry>> {
        let entries = sqlx::query_as::<_, ActivityLogEntry>(
            "SELECT * FROM activity_log WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(entries)
    }

    /// Get a preference
    pub async fn get_preference(&self, key: &str) -> Result<Option<String>> {
        let pref = sqlx::query_as::<_, Preference>("SELECT * FROM preferences WHERE key = ?")
            .bind(key)
            .fetch_optional(self.pool())
            .await?;

        Ok(pref.map(|p| p.value))
    }

    /// Set a preference
    pub async fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO preferences (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(self.pool())
            .await?;

        Ok(())
    }

    /// Get all preferences whose key starts with `prefix`
    pub async fn get_preferences_with_prefix(&self, prefix: &str) -> Result<Vec<Preference>> {
        let prefs = sqlx::query_as::<_, Preference>(
            "SELECT * FROM preferences WHERE key LIKE ? ORDER BY key",
        )
        .bind(format!("{}%", prefix))
        .fetch_all(self.pool())
        .await?;

        Ok(prefs)
    }
}

// Writes take a bare connection so callers can group them in a transaction

pub(crate) async fn insert_work_item(conn: &mut SqliteConnection, item: &WorkItem) -> Result<()> {
    let tags_json = serde_json::to_string(&item.tags)?;

    sqlx::query(
        r#"
        INSERT INTO work_items (id, user_id, title, status, priority, due_at,
            estimated_duration_min, actual_duration_min, tags, created_at, completed_at, archived)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&item.id)
    .bind(&item.user_id)
    .bind(&item.title)
    .bind(item.status.to_string())
    .bind(item.priority.to_string())
    .bind(item.due_at)
    .bind(item.estimated_duration_min.map(i64::from))
    .bind(item.actual_duration_min.map(i64::from))
    .bind(tags_json)
    .bind(item.created_at)
    .bind(item.completed_at)
    .bind(item.archived)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn update_status(
    conn: &mut SqliteConnection,
    id: &str,
    status: Status,
    at: DateTime<Utc>,
    actual_duration_min: Option<u32>,
) -> Result<()> {
    let completed_at = (status == Status::Completed).then_some(at);

    let result = sqlx::query(
        r#"
        UPDATE work_items SET
            status = ?,
            completed_at = ?,
            actual_duration_min = COALESCE(?, actual_duration_min)
        WHERE id = ?
        "#,
    )
    .bind(status.to_string())
    .bind(completed_at)
    .bind(actual_duration_min.map(i64::from))
    .bind(id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(EngineError::WorkItemNotFound(id.to_string()));
    }

    Ok(())
}

pub(crate) async fn set_archived(conn: &mut SqliteConnection, id: &str, archived: bool) -> Result<()> {
    let result = sqlx::query("UPDATE work_items SET archived = ? WHERE id = ?")
        .bind(archived)
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(EngineError::WorkItemNotFound(id.to_string()));
    }

    Ok(())
}

pub(crate) async fn log_activity(
    conn: &mut SqliteConnection,
    user_id: &str,
    work_item_id: Option<&str>,
    activity_type: ActivityType,
    at: DateTime<Utc>,
) -> Result<i64> {
    let row = sqlx::query(
        r#"
        INSERT INTO activity_log (user_id, work_item_id, created_at, type)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(work_item_id)
    .bind(at)
    .bind(activity_type.to_string())
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.get(0))
}

fn convert_rows(rows: Vec<WorkItemRow>) -> Vec<WorkItem> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id.clone();
            match WorkItem::try_from(row) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!(work_item_id = %id, error = %e, "skipping malformed work item row");
                    None
                }
            }
        })
        .collect()
}
