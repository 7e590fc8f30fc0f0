//! Task records and the request payloads used to create and edit them.
//!
//! The whole collection is persisted by [`store`], checked by [`validation`],
//! manipulated by [`service`] and exposed over HTTP by [`api`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

pub mod api;
pub mod service;
pub mod store;
pub mod validation;

pub use api::TaskState;
pub use service::{TaskService, TaskServiceError};
pub use store::{JsonFileTaskRepository, StoreError, TaskRepository};

/// How urgent a task is.
///
/// Values written by other clients that name no known priority load as
/// [`Priority::Unknown`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    #[serde(other)]
    Unknown,
}

impl Priority {
    /// Priorities a client may choose.
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Unknown => "unknown",
        }
    }

    /// Weight used when sorting by priority, highest first when descending.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Unknown => 0,
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }

    /// Returns true when a filter value selects this priority.
    pub fn is_named(&self, name: &str) -> bool {
        *self != Priority::Unknown && self.as_str() == name
    }
}

/// Area of life a task belongs to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Personal,
    Work,
    Shopping,
    Health,
    #[serde(other)]
    Unknown,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Personal,
        Category::Work,
        Category::Shopping,
        Category::Health,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Personal => "personal",
            Category::Work => "work",
            Category::Shopping => "shopping",
            Category::Health => "health",
            Category::Unknown => "unknown",
        }
    }

    pub fn is_named(&self, name: &str) -> bool {
        *self != Category::Unknown && self.as_str() == name
    }
}

/// Error returned when a string names no known [`Priority`] or [`Category`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown value '{0}'")]
pub struct UnknownVariant(String);

impl FromStr for Priority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|priority| priority.as_str() == s)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

impl FromStr for Category {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

/// A single to-do item as persisted and returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier, generated on creation
    pub id: String,
    /// Short title of the task
    pub text: String,
    /// Optional longer description
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: Category,
    /// ISO date or date-time the task is due
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// When the task was last marked completed
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Zero-based position of the task in the collection
    #[serde(default)]
    pub order: usize,
}

impl Task {
    /// Returns the parsed deadline, if the task has one that parses.
    pub fn deadline_at(&self) -> Option<DateTime<Utc>> {
        self.deadline.as_deref().and_then(parse_deadline)
    }

    /// Returns true when the task is still open and its deadline has passed.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.deadline_at().is_some_and(|deadline| deadline < now)
    }
}

/// Fields accepted when creating a task or patching an existing one.
///
/// Every field is optional so the same payload serves both operations;
/// [`validation`] decides which fields are mandatory. Fields that are not
/// listed here (such as `id` or `createdAt`) are ignored.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    /// `null` is kept apart from absence so a patch can be rejected for it
    #[serde(default, deserialize_with = "deserialize_present")]
    pub text: Option<Option<String>>,
    pub description: Option<String>,
    /// One of `low`, `medium`, `high`
    pub priority: Option<String>,
    /// One of `personal`, `work`, `shopping`, `health`
    pub category: Option<String>,
    /// `null` clears the deadline on update, absence leaves it untouched
    #[serde(default, deserialize_with = "deserialize_present")]
    pub deadline: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Option<Vec<String>>,
    pub completed: Option<bool>,
}

impl TaskInput {
    /// Returns a payload carrying only the given text.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(Some(text.into())),
            ..Default::default()
        }
    }

    pub fn text_value(&self) -> Option<&str> {
        self.text.as_ref().and_then(|text| text.as_deref())
    }

    /// Returns the deadline value, treating an empty string like no deadline.
    pub fn deadline_value(&self) -> Option<&str> {
        self.deadline
            .as_ref()
            .and_then(|deadline| deadline.as_deref())
            .filter(|deadline| !deadline.is_empty())
    }
}

/// Marks a field as present even when its value is `null`.
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Accepts a list of strings and ignores anything else.
fn deserialize_tags<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    serde_json::Value::String(tag) => Some(tag),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    })
}

/// Parses a deadline given as an RFC 3339 timestamp, a plain date or a
/// date-time without offset. Values without an offset are read as UTC.
pub fn parse_deadline(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|midnight| midnight.and_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|timestamp| timestamp.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn can_parse_priority_and_category_names() {
        assert_eq!("high".parse::<Priority>(), Ok(Priority::High));
        assert_eq!("shopping".parse::<Category>(), Ok(Category::Shopping));
        assert!("urgent".parse::<Priority>().is_err());
        assert!("Work".parse::<Category>().is_err());
    }

    #[test]
    fn can_parse_supported_deadline_formats() {
        let midnight = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();

        assert_eq!(parse_deadline("2025-03-01"), Some(midnight));
        assert_eq!(parse_deadline("2025-03-01T00:00:00.000Z"), Some(midnight));
        assert_eq!(parse_deadline("2025-03-01T02:00:00+02:00"), Some(midnight));
        assert_eq!(parse_deadline("2025-03-01T00:00"), Some(midnight));
        assert_eq!(parse_deadline("2025-02-30"), None);
        assert_eq!(parse_deadline("tomorrow"), None);
    }

    #[test]
    fn can_distinguish_null_deadline_from_missing_deadline() {
        let cleared: TaskInput = serde_json::from_str(r#"{"deadline": null}"#).unwrap();
        let untouched: TaskInput = serde_json::from_str(r#"{}"#).unwrap();
        let set: TaskInput = serde_json::from_str(r#"{"deadline": "2025-03-01"}"#).unwrap();

        assert_eq!(cleared.deadline, Some(None));
        assert_eq!(untouched.deadline, None);
        assert_eq!(set.deadline_value(), Some("2025-03-01"));
    }

    #[test]
    fn can_distinguish_null_text_from_missing_text() {
        let nulled: TaskInput = serde_json::from_str(r#"{"text": null}"#).unwrap();
        let missing: TaskInput = serde_json::from_str(r#"{"completed": true}"#).unwrap();

        assert_eq!(nulled.text, Some(None));
        assert_eq!(nulled.text_value(), None);
        assert_eq!(missing.text, None);
    }

    #[test]
    fn can_load_unrecognised_priority_and_category() {
        let priority: Priority = serde_json::from_str(r#""urgent""#).unwrap();
        let category: Category = serde_json::from_str(r#""hobby""#).unwrap();

        assert_eq!(priority, Priority::Unknown);
        assert_eq!(priority.rank(), 0);
        assert!(!priority.is_named("unknown"));
        assert_eq!(category, Category::Unknown);
        assert!(!category.is_named("unknown"));
        assert!("unknown".parse::<Priority>().is_err());
        assert!("unknown".parse::<Category>().is_err());
    }

    #[test]
    fn can_ignore_tags_that_are_not_a_list() {
        let input: TaskInput =
            serde_json::from_str(r#"{"text": "Buy milk", "tags": "groceries"}"#).unwrap();
        assert_eq!(input.tags, None);

        let input: TaskInput =
            serde_json::from_str(r#"{"text": "Buy milk", "tags": ["groceries", 7]}"#).unwrap();
        assert_eq!(input.tags, Some(vec!["groceries".to_string()]));
    }

    #[test]
    fn can_serialize_task_with_camel_case_keys() {
        let created = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let task = Task {
            id: "task-1".to_string(),
            text: "Buy milk".to_string(),
            description: String::new(),
            priority: Priority::High,
            category: Category::Shopping,
            deadline: None,
            tags: vec![],
            completed: false,
            created_at: created,
            updated_at: created,
            completed_at: None,
            order: 0,
        };

        let json = serde_json::to_value(&task).unwrap();

        assert_eq!(json["priority"], "high");
        assert_eq!(json["category"], "shopping");
        assert_eq!(json["createdAt"], "2025-01-02T03:04:05Z");
        assert!(json["completedAt"].is_null());
        assert_eq!(json["order"], 0);
    }

    #[test]
    fn can_detect_overdue_tasks() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut task = Task {
            id: "task-1".to_string(),
            text: "File taxes".to_string(),
            description: String::new(),
            priority: Priority::default(),
            category: Category::default(),
            deadline: Some("2025-05-31".to_string()),
            tags: vec![],
            completed: false,
            created_at: now,
            updated_at: now,
            completed_at: None,
            order: 0,
        };

        assert!(task.is_overdue(now));
        task.completed = true;
        assert!(!task.is_overdue(now));
        task.completed = false;
        task.deadline = Some("2025-06-02".to_string());
        assert!(!task.is_overdue(now));
    }
}
