//! Batch rows.

use super::{Database, now_ms};
use crate::store::BatchRepository;
use crate::types::{Batch, BatchUpdate, NewBatch, SlaStatus};
use anyhow::Result;
use rusqlite::{Row, params};
use uuid::Uuid;

pub(crate) fn parse_batch_row(row: &Row) -> rusqlite::Result<Batch> {
    let sla_raw: String = row.get("sla_status")?;
    Ok(Batch {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        name: row.get("name")?,
        due_date: row.get("due_date")?,
        progress: row.get("progress")?,
        sla_status: SlaStatus::parse(&sla_raw).unwrap_or(SlaStatus::OnTrack),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

impl BatchRepository for Database {
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
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO batches (id, project_id, name, due_date, progress, sla_status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    &batch.id,
                    &batch.project_id,
                    &batch.name,
                    batch.due_date,
                    batch.progress,
                    batch.sla_status.as_str(),
                    batch.created_at,
                    batch.updated_at,
                ],
            )?;
            Ok(batch)
        })
    }

    fn get_batch(&self, id: &str) -> Result<Option<Batch>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM batches WHERE id = ?1")?;
            match stmt.query_row(params![id], parse_batch_row) {
                Ok(batch) => Ok(Some(batch)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn list_batches(&self, project_id: Option<&str>) -> Result<Vec<Batch>> {
        self.with_conn(|conn| {
            let batches = match project_id {
                Some(pid) => {
                    let mut stmt = conn.prepare(
                        "SELECT * FROM batches WHERE project_id = ?1
                         ORDER BY created_at DESC, id DESC",
                    )?;
                    stmt.query_map(params![pid], parse_batch_row)?
                        .collect::<Result<Vec<_>, _>>()?
                }
                None => {
                    let mut stmt =
                        conn.prepare("SELECT * FROM batches ORDER BY created_at DESC, id DESC")?;
                    stmt.query_map([], parse_batch_row)?
                        .collect::<Result<Vec<_>, _>>()?
                }
            };
            Ok(batches)
        })
    }

    fn update_batch(&self, id: &str, update: BatchUpdate) -> Result<Option<Batch>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM batches WHERE id = ?1")?;
            let mut batch = match stmt.query_row(params![id], parse_batch_row) {
                Ok(b) => b,
                Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                Err(e) => return Err(e.into()),
            };

            if let Some(name) = update.name {
                batch.name = name;
            }
            if let Some(due_date) = update.due_date {
                batch.due_date = due_date;
            }
            batch.updated_at = now_ms();

            conn.execute(
                "UPDATE batches SET name = ?1, due_date = ?2, updated_at = ?3 WHERE id = ?4",
                params![&batch.name, batch.due_date, batch.updated_at, id],
            )?;
            Ok(Some(batch))
        })
    }

    fn set_batch_metrics(&self, id: &str, progress: i64, sla_status: SlaStatus) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE batches SET progress = ?1, sla_status = ?2, updated_at = ?3 WHERE id = ?4",
                params![progress, sla_status.as_str(), now_ms(), id],
            )?;
            Ok(())
        })
    }

    fn delete_batch(&self, id: &str) -> Result<bool> {
        // ON DELETE CASCADE removes descendant tasks.
        self.with_conn(|conn| {
            let affected = conn.execute("DELETE FROM batches WHERE id = ?1", params![id])?;
            Ok(affected > 0)
        })
    }
}
