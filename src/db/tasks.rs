//! Task rows.

use super::Database;
use crate::store::{TaskFilter, TaskRepository};
use crate::types::{Task, TaskStatus};
use anyhow::Result;
use rusqlite::{Row, params};

pub(crate) fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let status_raw: String = row.get("status")?;
    let decision_json: Option<String> = row.get("annotation_decision")?;
    let template_json: Option<String> = row.get("template")?;
    let inputs_json: String = row.get("inputs")?;
    let outputs_json: String = row.get("outputs")?;

    Ok(Task {
        id: row.get("id")?,
        batch_id: row.get("batch_id")?,
        task_type: row.get("task_type")?,
        assigned_user: row.get("assigned_user")?,
        status: TaskStatus::parse_lenient(&status_raw).unwrap_or(TaskStatus::Pending),
        completed_at: row.get("completed_at")?,
        annotation_decision: decision_json.and_then(|s| serde_json::from_str(&s).ok()),
        template: template_json.and_then(|s| serde_json::from_str(&s).ok()),
        inputs: serde_json::from_str(&inputs_json).unwrap_or_default(),
        outputs: serde_json::from_str(&outputs_json).unwrap_or_default(),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

impl TaskRepository for Database {
    fn insert_task(&self, task: &Task) -> Result<()> {
        let decision_json = task
            .annotation_decision
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let template_json = task.template.as_ref().map(serde_json::to_string).transpose()?;
        let inputs_json = serde_json::to_string(&task.inputs)?;
        let outputs_json = serde_json::to_string(&task.outputs)?;

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (
                    id, batch_id, task_type, assigned_user, status, completed_at,
                    annotation_decision, template, inputs, outputs, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    &task.id,
                    &task.batch_id,
                    &task.task_type,
                    &task.assigned_user,
                    task.status.as_str(),
                    task.completed_at,
                    decision_json,
                    template_json,
                    inputs_json,
                    outputs_json,
                    task.created_at,
                    task.updated_at,
                ],
            )?;
            Ok(())
        })
    }

    fn get_task(&self, id: &str) -> Result<Option<Task>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM tasks WHERE id = ?1")?;
            match stmt.query_row(params![id], parse_task_row) {
                Ok(task) => Ok(Some(task)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            // Build query dynamically based on filters
            let mut sql = String::from("SELECT * FROM tasks WHERE 1=1");
            let mut param_values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(ref batch_id) = filter.batch_id {
                sql.push_str(&format!(" AND batch_id = ?{}", param_values.len() + 1));
                param_values.push(Box::new(batch_id.clone()));
            }

            if let Some(ref assigned_user) = filter.assigned_user {
                sql.push_str(&format!(" AND assigned_user = ?{}", param_values.len() + 1));
                param_values.push(Box::new(assigned_user.clone()));
            }

            if let Some(ref task_type) = filter.task_type {
                sql.push_str(&format!(" AND task_type = ?{}", param_values.len() + 1));
                param_values.push(Box::new(task_type.clone()));
            }

            if let Some(ref statuses) = filter.statuses
                && !statuses.is_empty()
            {
                let placeholders: Vec<String> = statuses
                    .iter()
                    .enumerate()
                    .map(|(i, _)| format!("?{}", param_values.len() + i + 1))
                    .collect();
                sql.push_str(&format!(" AND status IN ({})", placeholders.join(", ")));
                for status in statuses {
                    param_values.push(Box::new(status.as_str().to_string()));
                }
            }

            sql.push_str(" ORDER BY created_at DESC, id DESC");

            let mut stmt = conn.prepare(&sql)?;
            let param_refs: Vec<&dyn rusqlite::ToSql> =
                param_values.iter().map(|b| b.as_ref()).collect();

            let tasks = stmt
                .query_map(param_refs.as_slice(), parse_task_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tasks)
        })
    }

    fn tasks_for_annotator(&self, assigned_user: &str) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM tasks
                 WHERE assigned_user = ?1 AND status IN ('pending', 'in_progress')
                 ORDER BY CASE WHEN status = 'pending' THEN 0 ELSE 1 END,
                          created_at DESC, id DESC",
            )?;
            let tasks = stmt
                .query_map(params![assigned_user], parse_task_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tasks)
        })
    }

    fn tasks_in_batch(&self, batch_id: &str) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM tasks WHERE batch_id = ?1 ORDER BY created_at DESC, id DESC",
            )?;
            let tasks = stmt
                .query_map(params![batch_id], parse_task_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tasks)
        })
    }

    fn tasks_in_project(&self, project_id: &str) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t.* FROM tasks t
                 INNER JOIN batches b ON t.batch_id = b.id
                 WHERE b.project_id = ?1
                 ORDER BY t.created_at DESC, t.id DESC",
            )?;
            let tasks = stmt
                .query_map(params![project_id], parse_task_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tasks)
        })
    }

    fn write_task(&self, task: &Task) -> Result<bool> {
        let decision_json = task
            .annotation_decision
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let template_json = task.template.as_ref().map(serde_json::to_string).transpose()?;
        let inputs_json = serde_json::to_string(&task.inputs)?;
        let outputs_json = serde_json::to_string(&task.outputs)?;

        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE tasks SET
                    task_type = ?1, assigned_user = ?2, status = ?3, completed_at = ?4,
                    annotation_decision = ?5, template = ?6, inputs = ?7, outputs = ?8,
                    updated_at = ?9
                 WHERE id = ?10",
                params![
                    &task.task_type,
                    &task.assigned_user,
                    task.status.as_str(),
                    task.completed_at,
                    decision_json,
                    template_json,
                    inputs_json,
                    outputs_json,
                    task.updated_at,
                    &task.id,
                ],
            )?;
            Ok(affected > 0)
        })
    }

    fn delete_task(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
            Ok(affected > 0)
        })
    }
}
