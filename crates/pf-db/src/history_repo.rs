use crate::util::{decode_json, encode_json, from_rfc3339, to_rfc3339};
use pf_core::error::TaskError;
use pf_core::history::TaskHistoryRepository;
use pf_core::types::{HistoryId, TaskHistoryEntry, TaskId};
use rusqlite::Connection;
use std::str::FromStr;

pub struct HistoryRepo<'a> {
    pub conn: &'a Connection,
}

impl<'a> HistoryRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

fn storage(err: impl ToString) -> TaskError {
    TaskError::Storage {
        message: err.to_string(),
    }
}

impl<'a> TaskHistoryRepository for HistoryRepo<'a> {
    fn append(&self, entry: TaskHistoryEntry) -> Result<(), TaskError> {
        let sql = "INSERT INTO task_history (id, task_id, change_json, at) VALUES (?1, ?2, ?3, ?4)";
        self.conn
            .execute(
                sql,
                (
                    entry.id.as_str(),
                    entry.task_id.as_str(),
                    encode_json(&entry.change).map_err(storage)?,
                    to_rfc3339(&entry.at),
                ),
            )
            .map_err(storage)?;
        Ok(())
    }

    fn list(&self, task_id: &TaskId) -> Result<Vec<TaskHistoryEntry>, TaskError> {
        let sql = "SELECT id, task_id, change_json, at FROM task_history \
                   WHERE task_id = ?1 ORDER BY at ASC, id ASC";
        let mut stmt = self.conn.prepare(sql).map_err(storage)?;
        let mut rows = stmt.query([task_id.as_str()]).map_err(storage)?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next().map_err(storage)? {
            let id: String = row.get(0).map_err(storage)?;
            let task_id: String = row.get(1).map_err(storage)?;
            let change: String = row.get(2).map_err(storage)?;
            let at: String = row.get(3).map_err(storage)?;
            entries.push(TaskHistoryEntry {
                id: HistoryId::from_str(&id).map_err(storage)?,
                task_id: TaskId::from_str(&task_id).map_err(storage)?,
                change: decode_json(&change).map_err(storage)?,
                at: from_rfc3339(&at).map_err(storage)?,
            });
        }
        Ok(entries)
    }
}
