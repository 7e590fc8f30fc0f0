use crate::task::store::{StoreError, TaskRepository};
use crate::task::validation::{validate_task, validate_task_patch};
use crate::task::{Category, Priority, Task, TaskInput, parse_deadline};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use utoipa::{IntoParams, ToSchema};

/// Error type for TaskService operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    /// The payload broke one or more field rules.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    /// No task has the requested ID.
    #[error("Task with ID {0} not found")]
    TaskNotFound(String),
    /// A bulk request named no action, no tasks or an unknown action.
    #[error("{0}")]
    InvalidBulkRequest(String),
    /// The task file could not be read or written.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Query parameters accepted when listing tasks.
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TaskQuery {
    /// `all`, `active` or `completed`
    pub status: Option<String>,
    /// Exact priority to keep, or `all`
    pub priority: Option<String>,
    /// Exact category to keep, or `all`
    pub category: Option<String>,
    /// Case-insensitive text matched against text, description and tags
    pub search: Option<String>,
    /// `date`, `name`, `priority`, `category` or `deadline`
    pub sort_by: Option<String>,
    /// `asc` (default) or `desc`
    pub sort_order: Option<String>,
}

/// Tasks matching a query together with collection counts.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskListing {
    pub tasks: Vec<Task>,
    /// Size of the whole collection
    pub total: usize,
    /// Number of tasks left after filtering
    pub filtered: usize,
}

/// Mutation applied by a bulk request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    Complete,
    Incomplete,
    Delete,
}

impl BulkAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkAction::Complete => "complete",
            BulkAction::Incomplete => "incomplete",
            BulkAction::Delete => "delete",
        }
    }
}

impl FromStr for BulkAction {
    type Err = TaskServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "complete" => Ok(BulkAction::Complete),
            "incomplete" => Ok(BulkAction::Incomplete),
            "delete" => Ok(BulkAction::Delete),
            _ => Err(TaskServiceError::InvalidBulkRequest(
                "Invalid bulk action".to_string(),
            )),
        }
    }
}

/// Result of a bulk request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkOutcome {
    pub action: BulkAction,
    /// Number of tasks the action changed
    pub updated_count: usize,
    /// Size of the collection afterwards
    pub total_tasks: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PriorityCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct CategoryCounts {
    pub personal: usize,
    pub work: usize,
    pub shopping: usize,
    pub health: usize,
}

/// Aggregate counts over the whole collection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    /// Open tasks whose deadline has passed
    pub overdue: usize,
    pub by_priority: PriorityCounts,
    pub by_category: CategoryCounts,
    /// Tasks completed during the last 24 hours
    pub recently_completed: usize,
}

/// Task operations over a [`TaskRepository`].
///
/// Mutations load, change and save the whole collection while holding a
/// write lock, so concurrent requests handled by one service never lose
/// each other's updates.
pub struct TaskService {
    repository: Arc<dyn TaskRepository>,
    write_lock: Mutex<()>,
}

impl TaskService {
    pub fn new(repository: Arc<dyn TaskRepository>) -> Self {
        Self {
            repository,
            write_lock: Mutex::new(()),
        }
    }

    /// Lists tasks matching the query.
    ///
    /// # Returns
    ///
    /// A `Result` containing the matching tasks and the total and filtered counts.
    #[tracing::instrument(skip(self))]
    pub async fn list_tasks(&self, query: &TaskQuery) -> Result<TaskListing, TaskServiceError> {
        let tasks = self.repository.load().await?;
        let total = tasks.len();
        let tasks = apply_query(tasks, query);
        Ok(TaskListing {
            filtered: tasks.len(),
            total,
            tasks,
        })
    }

    /// Retrieves a task by its ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_task_by_id(&self, id: &str) -> Result<Task, TaskServiceError> {
        self.repository
            .load()
            .await?
            .into_iter()
            .find(|task| task.id == id)
            .ok_or_else(|| TaskServiceError::TaskNotFound(id.to_string()))
    }

    /// Creates a task at the end of the collection.
    ///
    /// # Arguments
    ///
    /// * `input` - The fields of the new task. `text` is required.
    ///
    /// # Returns
    ///
    /// A `Result` containing the created `Task` if successful, or the validation
    /// errors otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn create_task(&self, input: TaskInput) -> Result<Task, TaskServiceError> {
        let errors = validate_task(&input);
        if !errors.is_empty() {
            return Err(TaskServiceError::Validation(errors));
        }

        let _guard = self.write_lock.lock().await;
        let mut tasks = self.repository.load().await?;
        let now = Utc::now();
        let task = Task {
            id: uuid::Uuid::new_v4().to_string(),
            text: input.text_value().unwrap_or_default().trim().to_string(),
            description: input
                .description
                .as_deref()
                .unwrap_or_default()
                .trim()
                .to_string(),
            priority: parse_choice(&input.priority).unwrap_or_default(),
            category: parse_choice(&input.category).unwrap_or_default(),
            deadline: input.deadline_value().map(str::to_string),
            tags: input.tags.unwrap_or_default(),
            completed: false,
            created_at: now,
            updated_at: now,
            completed_at: None,
            order: tasks.len(),
        };

        tasks.push(task.clone());
        self.repository.save(&tasks).await?;
        tracing::info!(id = %task.id, "Created task");
        Ok(task)
    }

    /// Applies a patch to an existing task.
    ///
    /// Only fields present in the patch change. Setting `completed` to true on
    /// an open task stamps `completedAt`; setting it to false clears it; a
    /// patch without `completed` leaves both untouched.
    #[tracing::instrument(skip(self))]
    pub async fn update_task(&self, id: &str, patch: TaskInput) -> Result<Task, TaskServiceError> {
        let _guard = self.write_lock.lock().await;
        let mut tasks = self.repository.load().await?;
        let task = tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| TaskServiceError::TaskNotFound(id.to_string()))?;

        let errors = validate_task_patch(&patch);
        if !errors.is_empty() {
            return Err(TaskServiceError::Validation(errors));
        }

        apply_patch(task, patch, Utc::now());
        let updated = task.clone();
        self.repository.save(&tasks).await?;
        tracing::info!(id = %updated.id, "Updated task");
        Ok(updated)
    }

    /// Deletes a task and closes the gap it leaves in the ordering.
    ///
    /// # Returns
    ///
    /// A `Result` containing the deleted `Task` if successful, or an error otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn delete_task(&self, id: &str) -> Result<Task, TaskServiceError> {
        let _guard = self.write_lock.lock().await;
        let mut tasks = self.repository.load().await?;
        let index = tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| TaskServiceError::TaskNotFound(id.to_string()))?;

        let deleted = tasks.remove(index);
        renumber(&mut tasks);
        self.repository.save(&tasks).await?;
        tracing::info!(id = %deleted.id, "Deleted task");
        Ok(deleted)
    }

    /// Completes, reopens or deletes every task whose ID is listed.
    ///
    /// # Arguments
    ///
    /// * `action` - `complete`, `incomplete` or `delete`.
    /// * `ids` - IDs of the tasks to change. Unknown IDs are skipped.
    ///
    /// # Returns
    ///
    /// A `Result` containing how many tasks changed and the new collection size.
    #[tracing::instrument(skip(self))]
    pub async fn bulk_update(
        &self,
        action: &str,
        ids: &[String],
    ) -> Result<BulkOutcome, TaskServiceError> {
        if action.is_empty() || ids.is_empty() {
            return Err(TaskServiceError::InvalidBulkRequest(
                "Invalid bulk operation request".to_string(),
            ));
        }
        let action: BulkAction = action.parse()?;
        let selected: HashSet<&str> = ids.iter().map(String::as_str).collect();

        let _guard = self.write_lock.lock().await;
        let mut tasks = self.repository.load().await?;
        let now = Utc::now();
        let mut updated_count = 0;

        match action {
            BulkAction::Complete | BulkAction::Incomplete => {
                let completed = action == BulkAction::Complete;
                for task in tasks.iter_mut() {
                    if selected.contains(task.id.as_str()) && task.completed != completed {
                        task.completed = completed;
                        task.completed_at = completed.then_some(now);
                        task.updated_at = now;
                        updated_count += 1;
                    }
                }
            }
            BulkAction::Delete => {
                let before = tasks.len();
                tasks.retain(|task| !selected.contains(task.id.as_str()));
                updated_count = before - tasks.len();
                renumber(&mut tasks);
            }
        }

        self.repository.save(&tasks).await?;
        tracing::info!(
            action = action.as_str(),
            updated_count,
            "Applied bulk operation"
        );
        Ok(BulkOutcome {
            action,
            updated_count,
            total_tasks: tasks.len(),
        })
    }

    /// Moves the listed tasks to the front in the given order.
    ///
    /// Tasks not mentioned keep their relative order after the listed ones.
    /// Unknown and repeated IDs are skipped.
    ///
    /// # Returns
    ///
    /// A `Result` containing the size of the collection.
    #[tracing::instrument(skip(self))]
    pub async fn reorder_tasks(&self, ids: &[String]) -> Result<usize, TaskServiceError> {
        let _guard = self.write_lock.lock().await;
        let tasks = self.repository.load().await?;
        let reordered = reorder(tasks, ids, Utc::now());
        self.repository.save(&reordered).await?;
        tracing::info!(count = reordered.len(), "Reordered tasks");
        Ok(reordered.len())
    }

    /// Computes aggregate counts over the whole collection.
    #[tracing::instrument(skip(self))]
    pub async fn stats(&self) -> Result<TaskStats, TaskServiceError> {
        let tasks = self.repository.load().await?;
        Ok(compute_stats(&tasks, Utc::now()))
    }
}

fn parse_choice<T: FromStr>(value: &Option<String>) -> Option<T> {
    value.as_deref().and_then(|value| value.parse().ok())
}

fn apply_patch(task: &mut Task, patch: TaskInput, now: DateTime<Utc>) {
    if let Some(text) = patch.text_value() {
        task.text = text.trim().to_string();
    }
    if let Some(description) = &patch.description {
        task.description = description.trim().to_string();
    }
    if let Some(priority) = parse_choice(&patch.priority) {
        task.priority = priority;
    }
    if let Some(category) = parse_choice(&patch.category) {
        task.category = category;
    }
    if patch.deadline.is_some() {
        task.deadline = patch.deadline_value().map(str::to_string);
    }
    if let Some(tags) = patch.tags {
        task.tags = tags;
    }
    match patch.completed {
        Some(true) if !task.completed => {
            task.completed = true;
            task.completed_at = Some(now);
        }
        Some(true) => {}
        Some(false) => {
            task.completed = false;
            task.completed_at = None;
        }
        None => {}
    }
    task.updated_at = now;
}

/// Rewrites `order` so it matches each task's index.
fn renumber(tasks: &mut [Task]) {
    for (index, task) in tasks.iter_mut().enumerate() {
        task.order = index;
    }
}

/// Builds the collection produced by a reorder request.
pub fn reorder(tasks: Vec<Task>, ids: &[String], now: DateTime<Utc>) -> Vec<Task> {
    let mut remaining: Vec<Option<Task>> = tasks.into_iter().map(Some).collect();
    let mut reordered = Vec::with_capacity(remaining.len());

    for id in ids {
        let slot = remaining
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|task| &task.id == id));
        if let Some(mut task) = slot.and_then(Option::take) {
            task.order = reordered.len();
            task.updated_at = now;
            reordered.push(task);
        }
    }

    for mut task in remaining.into_iter().flatten() {
        task.order = reordered.len();
        reordered.push(task);
    }
    reordered
}

/// Filters and sorts tasks according to the query.
pub fn apply_query(tasks: Vec<Task>, query: &TaskQuery) -> Vec<Task> {
    let priority = selected(&query.priority);
    let category = selected(&query.category);
    let search = query
        .search
        .as_deref()
        .filter(|search| !search.is_empty())
        .map(str::to_lowercase);

    let mut tasks: Vec<Task> = tasks
        .into_iter()
        .filter(|task| match query.status.as_deref() {
            Some("active") => !task.completed,
            Some("completed") => task.completed,
            _ => true,
        })
        .filter(|task| priority.is_none_or(|priority| task.priority.is_named(priority)))
        .filter(|task| category.is_none_or(|category| task.category.is_named(category)))
        .filter(|task| {
            search
                .as_deref()
                .is_none_or(|search| matches_search(task, search))
        })
        .collect();

    if let Some(sort_by) = query.sort_by.as_deref().filter(|sort_by| !sort_by.is_empty()) {
        let descending = query.sort_order.as_deref() == Some("desc");
        tasks.sort_by(|a, b| {
            let ordering = compare_by(sort_by, a, b);
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }
    tasks
}

fn selected(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .filter(|value| !value.is_empty() && *value != "all")
}

fn matches_search(task: &Task, search: &str) -> bool {
    task.text.to_lowercase().contains(search)
        || task.description.to_lowercase().contains(search)
        || task
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(search))
}

fn compare_by(sort_by: &str, a: &Task, b: &Task) -> Ordering {
    match sort_by {
        "name" => a.text.to_lowercase().cmp(&b.text.to_lowercase()),
        "priority" => a.priority.rank().cmp(&b.priority.rank()),
        "category" => a.category.as_str().cmp(b.category.as_str()),
        "deadline" => sort_deadline(a).cmp(&sort_deadline(b)),
        _ => a.created_at.cmp(&b.created_at),
    }
}

/// Deadline used for sorting; tasks without one sort last.
fn sort_deadline(task: &Task) -> DateTime<Utc> {
    task.deadline
        .as_deref()
        .and_then(parse_deadline)
        .unwrap_or_else(far_future)
}

fn far_future() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Computes aggregate counts for `tasks` as seen at `now`.
pub fn compute_stats(tasks: &[Task], now: DateTime<Utc>) -> TaskStats {
    let day_ago = now - Duration::days(1);
    let mut stats = TaskStats {
        total: tasks.len(),
        ..Default::default()
    };

    for task in tasks {
        if task.completed {
            stats.completed += 1;
        } else {
            stats.active += 1;
        }
        if task.is_overdue(now) {
            stats.overdue += 1;
        }
        match task.priority {
            Priority::High => stats.by_priority.high += 1,
            Priority::Medium => stats.by_priority.medium += 1,
            Priority::Low => stats.by_priority.low += 1,
            Priority::Unknown => {}
        }
        match task.category {
            Category::Personal => stats.by_category.personal += 1,
            Category::Work => stats.by_category.work += 1,
            Category::Shopping => stats.by_category.shopping += 1,
            Category::Health => stats.by_category.health += 1,
            Category::Unknown => {}
        }
        if task
            .completed_at
            .is_some_and(|completed_at| completed_at > day_ago)
        {
            stats.recently_completed += 1;
        }
    }
    stats
}
