//! Whole-collection persistence for tasks.
//!
//! The collection is a single JSON array. Every save replaces the file
//! through a temporary sibling and a rename, so readers never observe a
//! partially written document.

use crate::task::Task;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Errors raised while reading or writing the task file.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The task file exists but could not be read.
    #[error("Failed to read task file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The task file or its directory could not be written.
    #[error("Failed to write task file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The task file does not contain a valid task list.
    #[error("Malformed task file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// The in-memory collection could not be encoded.
    #[error("Failed to serialize tasks: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Loads and saves the full task collection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Returns every stored task in storage order, or an empty list when
    /// nothing has been stored yet.
    async fn load(&self) -> Result<Vec<Task>, StoreError>;

    /// Replaces the stored collection with `tasks`.
    async fn save(&self, tasks: &[Task]) -> Result<(), StoreError>;
}

/// Repository keeping the collection in a pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileTaskRepository {
    path: PathBuf,
}

impl JsonFileTaskRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tasks.json".to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()))
    }

    fn write_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl TaskRepository for JsonFileTaskRepository {
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> Result<Vec<Task>, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!("Task file does not exist yet, starting empty");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    #[tracing::instrument(skip(self, tasks), fields(path = %self.path.display(), count = tasks.len()))]
    async fn save(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(tasks)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.write_error(source))?;
        }

        let temp_path = self.temp_path();
        if let Err(source) = tokio::fs::write(&temp_path, contents).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(self.write_error(source));
        }
        if let Err(source) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(self.write_error(source));
        }

        tracing::debug!("Saved task collection");
        Ok(())
    }
}
