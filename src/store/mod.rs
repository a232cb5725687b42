//! Repository traits over the record store.
//!
//! The lifecycle and view layers are written against these traits so the
//! SQLite store can be swapped for [`memory::MemoryStore`] in tests. Absent
//! rows come back as `None`; the caller decides whether that is a 404.

pub mod memory;

use crate::types::{
    Batch, BatchUpdate, NewBatch, NewProject, Project, ProjectUpdate, SlaStatus, Task, TaskStatus,
};
use anyhow::Result;

/// Filter for task listings. All criteria are conjunctive; results are
/// newest first.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub batch_id: Option<String>,
    pub assigned_user: Option<String>,
    pub task_type: Option<String>,
    pub statuses: Option<Vec<TaskStatus>>,
}

pub trait ProjectRepository {
    fn create_project(&self, new: NewProject) -> Result<Project>;
    fn get_project(&self, id: &str) -> Result<Option<Project>>;
    /// All projects, newest first.
    fn list_projects(&self) -> Result<Vec<Project>>;
    fn update_project(&self, id: &str, update: ProjectUpdate) -> Result<Option<Project>>;
    /// Persist the derived progress fraction. No-op when the row is gone.
    fn set_project_progress(&self, id: &str, progress: f64) -> Result<()>;
    /// Returns false when the id was absent. Cascades to batches and tasks.
    fn delete_project(&self, id: &str) -> Result<bool>;
}

pub trait BatchRepository {
    fn create_batch(&self, new: NewBatch) -> Result<Batch>;
    fn get_batch(&self, id: &str) -> Result<Option<Batch>>;
    /// Batches, optionally scoped to one project, newest first.
    fn list_batches(&self, project_id: Option<&str>) -> Result<Vec<Batch>>;
    fn update_batch(&self, id: &str, update: BatchUpdate) -> Result<Option<Batch>>;
    /// Persist the derived progress percentage and SLA classification.
    fn set_batch_metrics(&self, id: &str, progress: i64, sla_status: SlaStatus) -> Result<()>;
    /// Returns false when the id was absent. Cascades to tasks.
    fn delete_batch(&self, id: &str) -> Result<bool>;
}

pub trait TaskRepository {
    /// Insert a fully-formed task row (ids and timestamps already set).
    fn insert_task(&self, task: &Task) -> Result<()>;
    fn get_task(&self, id: &str) -> Result<Option<Task>>;
    fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>>;
    /// Open work for one annotator: pending and in-progress tasks, pending
    /// first, newest first within a status.
    fn tasks_for_annotator(&self, assigned_user: &str) -> Result<Vec<Task>>;
    fn tasks_in_batch(&self, batch_id: &str) -> Result<Vec<Task>>;
    fn tasks_in_project(&self, project_id: &str) -> Result<Vec<Task>>;
    /// Full-row update keyed on `task.id`. Returns false when absent.
    fn write_task(&self, task: &Task) -> Result<bool>;
    /// Returns false when the id was absent.
    fn delete_task(&self, id: &str) -> Result<bool>;
}

/// The full record store the core operates on.
pub trait RecordStore: ProjectRepository + BatchRepository + TaskRepository {}

impl<T: ProjectRepository + BatchRepository + TaskRepository> RecordStore for T {}
