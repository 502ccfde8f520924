use crate::util::{decode_enum, decode_json, encode_enum, encode_json, from_rfc3339, to_rfc3339};
use pf_core::error::EventLogError;
use pf_core::eventlog::EventLogRepository;
use pf_core::types::{EventId, EventLogEntry, GroupId};
use rusqlite::Connection;
use std::str::FromStr;

pub struct EventRepo<'a> {
    pub conn: &'a Connection,
}

impl<'a> EventRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

fn storage(err: impl ToString) -> EventLogError {
    EventLogError::Storage {
        message: err.to_string(),
    }
}

impl<'a> EventLogRepository for EventRepo<'a> {
    fn append(&self, entry: EventLogEntry) -> Result<(), EventLogError> {
        let sql = "INSERT INTO event_log (id, group_id, source, payload_json, created_at) \
                   VALUES (?1, ?2, ?3, ?4, ?5)";
        self.conn
            .execute(
                sql,
                (
                    entry.id.as_str(),
                    entry.group_id.as_str(),
                    encode_enum(&entry.source).map_err(storage)?,
                    encode_json(&entry.payload).map_err(storage)?,
                    to_rfc3339(&entry.created_at),
                ),
            )
            .map_err(storage)?;
        Ok(())
    }

    fn list(&self, group_id: &GroupId, limit: u32) -> Result<Vec<EventLogEntry>, EventLogError> {
        let sql = "SELECT id, group_id, source, payload_json, created_at FROM event_log \
                   WHERE group_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2";
        let mut stmt = self.conn.prepare(sql).map_err(storage)?;
        let mut rows = stmt
            .query((group_id.as_str(), limit))
            .map_err(storage)?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next().map_err(storage)? {
            let id: String = row.get(0).map_err(storage)?;
            let group_id: String = row.get(1).map_err(storage)?;
            let source: String = row.get(2).map_err(storage)?;
            let payload: String = row.get(3).map_err(storage)?;
            let created_at: String = row.get(4).map_err(storage)?;
            entries.push(EventLogEntry {
                id: EventId::from_str(&id).map_err(storage)?,
                group_id: GroupId::new(group_id),
                source: decode_enum(&source).map_err(storage)?,
                payload: decode_json(&payload).map_err(storage)?,
                created_at: from_rfc3339(&created_at).map_err(storage)?,
            });
        }
        Ok(entries)
    }
}
