//! In-memory record store used as a test double for the SQLite store.
//!
//! Keeps the same ordering and cascade semantics so lifecycle and view
//! tests exercise realistic behavior without a database file.

use super::{BatchRepository, ProjectRepository, TaskFilter, TaskRepository};
use crate::db::now_ms;
use crate::types::{
    Batch, BatchUpdate, NewBatch, NewProject, Project, ProjectUpdate, SlaStatus, Task, TaskStatus,
};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    projects: HashMap<String, Project>,
    batches: HashMap<String, Batch>,
    tasks: HashMap<String, Task>,
}

/// Thread-safe in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T, K: Fn(&T) -> (i64, String)>(items: &mut [T], key: K) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

impl ProjectRepository for MemoryStore {
    fn create_project(&self, new: NewProject) -> Result<Project> {
        let now = now_ms();
        let project = Project {
            id: Uuid::now_v7().to_string(),
            name: new.name,
            owner: new.owner,
            progress: 0.0,
            created_at: now,
            updated_at: now,
        };
        let mut inner = self.inner.lock().unwrap();
        inner.projects.insert(project.id.clone(), project.clone());
        Ok(project)
    }

    fn get_project(&self, id: &str) -> Result<Option<Project>> {
        Ok(self.inner.lock().unwrap().projects.get(id).cloned())
    }

    fn list_projects(&self) -> Result<Vec<Project>> {
        let inner = self.inner.lock().unwrap();
        let mut projects: Vec<Project> = inner.projects.values().cloned().collect();
        newest_first(&mut projects, |p| (p.created_at, p.id.clone()));
        Ok(projects)
    }

    fn update_project(&self, id: &str, update: ProjectUpdate) -> Result<Option<Project>> {
        let mut inner = self.inner.lock().unwrap();
        let Some(project) = inner.projects.get_mut(id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            project.name = name;
        }
        if let Some(owner) = update.owner {
            project.owner = owner;
        }
        project.updated_at = now_ms();
        Ok(Some(project.clone()))
    }

    fn set_project_progress(&self, id: &str, progress: f64) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(project) = inner.projects.get_mut(id) {
            project.progress = progress;
            project.updated_at = now_ms();
        }
        Ok(())
    }

    fn delete_project(&self, id: &str) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        if inner.projects.remove(id).is_none() {
            return Ok(false);
        }
        let batch_ids: Vec<String> = inner
            .batches
            .values()
            .filter(|b| b.project_id == id)
            .map(|b| b.id.clone())
            .collect();
        inner.batches.retain(|_, b| b.project_id != id);
        inner
            .tasks
            .retain(|_, t| !batch_ids.contains(&t.batch_id));
        Ok(true)
    }
}

impl BatchRepository for MemoryStore {
    fn create_batch(&self, new: NewBatch) -> Result<Batch> {
        let now = now_ms();
        let batch = Batch {
            id: Uuid::now_v7().to_string(),
            project_id: new.project_id,
            name: new.name,
            due_date: new.due_date,
            progress: 0,
            sla_status: SlaStatus::OnTrack,
            created_at: now,
            updated_at: now,
        };
        let mut inner = self.inner.lock().unwrap();
        inner.batches.insert(batch.id.clone(), batch.clone());
        Ok(batch)
    }

    fn get_batch(&self, id: &str) -> Result<Option<Batch>> {
        Ok(self.inner.lock().unwrap().batches.get(id).cloned())
    }

    fn list_batches(&self, project_id: Option<&str>) -> Result<Vec<Batch>> {
        let inner = self.inner.lock().unwrap();
        let mut batches: Vec<Batch> = inner
            .batches
            .values()
            .filter(|b| project_id.is_none_or(|p| b.project_id == p))
            .cloned()
            .collect();
        newest_first(&mut batches, |b| (b.created_at, b.id.clone()));
        Ok(batches)
    }

    fn update_batch(&self, id: &str, update: BatchUpdate) -> Result<Option<Batch>> {
        let mut inner = self.inner.lock().unwrap();
        let Some(batch) = inner.batches.get_mut(id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            batch.name = name;
        }
        if let Some(due_date) = update.due_date {
            batch.due_date = due_date;
        }
        batch.updated_at = now_ms();
        Ok(Some(batch.clone()))
    }

    fn set_batch_metrics(&self, id: &str, progress: i64, sla_status: SlaStatus) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(batch) = inner.batches.get_mut(id) {
            batch.progress = progress;
            batch.sla_status = sla_status;
            batch.updated_at = now_ms();
        }
        Ok(())
    }

    fn delete_batch(&self, id: &str) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        if inner.batches.remove(id).is_none() {
            return Ok(false);
        }
        inner.tasks.retain(|_, t| t.batch_id != id);
        Ok(true)
    }
}

impl TaskRepository for MemoryStore {
    fn insert_task(&self, task: &Task) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.tasks.insert(task.id.clone(), task.clone());
        Ok(())
    }

    fn get_task(&self, id: &str) -> Result<Option<Task>> {
        Ok(self.inner.lock().unwrap().tasks.get(id).cloned())
    }

    fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let inner = self.inner.lock().unwrap();
        let mut tasks: Vec<Task> = inner
            .tasks
            .values()
            .filter(|t| {
                filter
                    .batch_id
                    .as_deref()
                    .is_none_or(|b| t.batch_id == b)
                    && filter
                        .assigned_user
                        .as_deref()
                        .is_none_or(|u| t.assigned_user.as_deref() == Some(u))
                    && filter
                        .task_type
                        .as_deref()
                        .is_none_or(|ty| t.task_type == ty)
                    && filter
                        .statuses
                        .as_ref()
                        .is_none_or(|s| s.contains(&t.status))
            })
            .cloned()
            .collect();
        newest_first(&mut tasks, |t| (t.created_at, t.id.clone()));
        Ok(tasks)
    }

    fn tasks_for_annotator(&self, assigned_user: &str) -> Result<Vec<Task>> {
        let mut tasks = self.list_tasks(&TaskFilter {
            assigned_user: Some(assigned_user.to_string()),
            statuses: Some(vec![TaskStatus::Pending, TaskStatus::InProgress]),
            ..Default::default()
        })?;
        // Pending first, then newest first within a status.
        tasks.sort_by(|a, b| {
            let rank = |t: &Task| if t.status == TaskStatus::Pending { 0 } else { 1 };
            rank(a)
                .cmp(&rank(b))
                .then((b.created_at, b.id.clone()).cmp(&(a.created_at, a.id.clone())))
        });
        Ok(tasks)
    }

    fn tasks_in_batch(&self, batch_id: &str) -> Result<Vec<Task>> {
        self.list_tasks(&TaskFilter {
            batch_id: Some(batch_id.to_string()),
            ..Default::default()
        })
    }

    fn tasks_in_project(&self, project_id: &str) -> Result<Vec<Task>> {
        let inner = self.inner.lock().unwrap();
        let batch_ids: Vec<String> = inner
            .batches
            .values()
            .filter(|b| b.project_id == project_id)
            .map(|b| b.id.clone())
            .collect();
        let mut tasks: Vec<Task> = inner
            .tasks
            .values()
            .filter(|t| batch_ids.contains(&t.batch_id))
            .cloned()
            .collect();
        newest_first(&mut tasks, |t| (t.created_at, t.id.clone()));
        Ok(tasks)
    }

    fn write_task(&self, task: &Task) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.tasks.contains_key(&task.id) {
            return Ok(false);
        }
        inner.tasks.insert(task.id.clone(), task.clone());
        Ok(true)
    }

    fn delete_task(&self, id: &str) -> Result<bool> {
        Ok(self.inner.lock().unwrap().tasks.remove(id).is_some())
    }
}
