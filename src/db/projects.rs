//! Project rows.

use super::{Database, now_ms};
use crate::store::ProjectRepository;
use crate::types::{NewProject, Project, ProjectUpdate};
use anyhow::Result;
use rusqlite::{Row, params};
use uuid::Uuid;

pub(crate) fn parse_project_row(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get("id")?,
        name: row.get("name")?,
        owner: row.get("owner")?,
        progress: row.get("progress")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

impl ProjectRepository for Database {
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
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO projects (id, name, owner, progress, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    &project.id,
                    &project.name,
                    &project.owner,
                    project.progress,
                    project.created_at,
                    project.updated_at,
                ],
            )?;
            Ok(project)
        })
    }

    fn get_project(&self, id: &str) -> Result<Option<Project>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM projects WHERE id = ?1")?;
            match stmt.query_row(params![id], parse_project_row) {
                Ok(project) => Ok(Some(project)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn list_projects(&self) -> Result<Vec<Project>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT * FROM projects ORDER BY created_at DESC, id DESC")?;
            let projects = stmt
                .query_map([], parse_project_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(projects)
        })
    }

    fn update_project(&self, id: &str, update: ProjectUpdate) -> Result<Option<Project>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM projects WHERE id = ?1")?;
            let mut project = match stmt.query_row(params![id], parse_project_row) {
                Ok(p) => p,
                Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                Err(e) => return Err(e.into()),
            };

            if let Some(name) = update.name {
                project.name = name;
            }
            if let Some(owner) = update.owner {
                project.owner = owner;
            }
            project.updated_at = now_ms();

            conn.execute(
                "UPDATE projects SET name = ?1, owner = ?2, updated_at = ?3 WHERE id = ?4",
                params![&project.name, &project.owner, project.updated_at, id],
            )?;
            Ok(Some(project))
        })
    }

    fn set_project_progress(&self, id: &str, progress: f64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE projects SET progress = ?1, updated_at = ?2 WHERE id = ?3",
                params![progress, now_ms(), id],
            )?;
            Ok(())
        })
    }

    fn delete_project(&self, id: &str) -> Result<bool> {
        // ON DELETE CASCADE removes descendant batches and tasks.
        self.with_conn(|conn| {
            let affected = conn.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
            Ok(affected > 0)
        })
    }
}
