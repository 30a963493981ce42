/// Data models for database entities
///
/// Rows map to database tables through sqlx and are converted into the
/// domain types the engine reads.

use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeSet;
use std::str::FromStr;

/// Lifecycle status of a work item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Pending => "pending",
            Status::InProgress => "in_progress",
            Status::Completed => "completed",
            Status::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Status {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Status::Pending),
            "in_progress" => Ok(Status::InProgress),
            "completed" => Ok(Status::Completed),
            "cancelled" => Ok(Status::Cancelled),
            other => Err(EngineError::InvalidItem(format!("unknown status '{}'", other))),
        }
    }
}

/// Priority of a work item, ordered low → urgent
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];

    /// High and urgent items are treated the same by most signals
    pub fn is_elevated(&self) -> bool {
        matches!(self, Priority::High | Priority::Urgent)
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Priority {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(EngineError::InvalidItem(format!("unknown priority '{}'", other))),
        }
    }
}

/// A trackable unit of work
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkItem {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub status: Status,
    pub priority: Priority,
    pub due_at: Option<DateTime<Utc>>,
    pub estimated_duration_min: Option<u32>,
    pub actual_duration_min: Option<u32>,
    pub tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub archived: bool,
}

impl WorkItem {
    /// Create a pending, medium-priority item with no deadline
    pub fn new(id: impl Into<String>, user_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            title: title.into(),
            status: Status::Pending,
            priority: Priority::Medium,
            due_at: None,
            estimated_duration_min: None,
            actual_duration_min: None,
            tags: BTreeSet::new(),
            created_at: Utc::now(),
            completed_at: None,
            archived: false,
        }
    }

    /// Eligible for recommendation: not completed and not archived
    pub fn is_candidate(&self) -> bool {
        self.status != Status::Completed && !self.archived
    }

    pub fn is_completed(&self) -> bool {
        self.status == Status::Completed
    }

    pub fn is_pending(&self) -> bool {
        self.status == Status::Pending
    }
}

/// Raw `work_items` row
#[derive(Debug, Clone, FromRow)]
pub struct WorkItemRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub status: String,
    pub priority: String,
    pub due_at: Option<DateTime<Utc>>,
    pub estimated_duration_min: Option<i64>,
    pub actual_duration_min: Option<i64>,
    pub tags: Option<String>, // JSON array
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub archived: bool,
}

impl WorkItemRow {
    /// Parse tags from JSON string
    pub fn get_tags(&self) -> BTreeSet<String> {
        self.tags
            .as_ref()
            .and_then(|t| serde_json::from_str(t).ok())
            .unwrap_or_default()
    }
}

impl TryFrom<WorkItemRow> for WorkItem {
    type Error = EngineError;

    fn try_from(row: WorkItemRow) -> Result<Self, Self::Error> {
        if row.id.trim().is_empty() {
            return Err(EngineError::InvalidItem("missing id".to_string()));
        }

        let tags = row.get_tags();
        Ok(WorkItem {
            status: row.status.parse()?,
            priority: row.priority.parse()?,
            estimated_duration_min: row.estimated_duration_min.and_then(|m| u32::try_from(m).ok()),
            actual_duration_min: row.actual_duration_min.and_then(|m| u32::try_from(m).ok()),
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            due_at: row.due_at,
            tags,
            created_at: row.created_at,
            completed_at: row.completed_at,
            archived: row.archived,
        })
    }
}

/// Input for creating a new work item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItemInput {
    pub user_id: String,
    pub title: String,
    pub priority: Priority,
    pub due_at: Option<DateTime<Utc>>,
    pub estimated_duration_min: Option<u32>,
    pub tags: Vec<String>,
}

/// Kinds of activity-log entries written by the recorder
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Created,
    Started,
    Completed,
    Cancelled,
    Updated,
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActivityType::Created => "created",
            ActivityType::Started => "started",
            ActivityType::Completed => "completed",
            ActivityType::Cancelled => "cancelled",
            ActivityType::Updated => "updated",
        };
        write!(f, "{}", s)
    }
}

/// One entry of the user's activity log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct ActivityLogEntry {
    pub id: i64,
    pub user_id: String,
    pub work_item_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub activity_type: String,
}

/// User preference
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Preference {
    pub key: String,
    pub value: String,
}
