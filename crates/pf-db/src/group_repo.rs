use crate::util::to_rfc3339;
use chrono::{DateTime, Utc};
use pf_core::error::GroupError;
use pf_core::groups::GroupRepository;
use pf_core::types::{GroupId, MemberInfo};
use rusqlite::Connection;

pub struct GroupRepo<'a> {
    pub conn: &'a Connection,
}

impl<'a> GroupRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

fn storage(err: impl ToString) -> GroupError {
    GroupError::Storage {
        message: err.to_string(),
    }
}

impl<'a> GroupRepository for GroupRepo<'a> {
    fn context(&self, id: &GroupId) -> Result<Option<String>, GroupError> {
        let mut stmt = self
            .conn
            .prepare("SELECT context FROM groups WHERE id = ?1")
            .map_err(storage)?;
        let mut rows = stmt.query([id.as_str()]).map_err(storage)?;
        let Some(row) = rows.next().map_err(storage)? else {
            return Ok(None);
        };
        let context: Option<String> = row.get(0).map_err(storage)?;
        Ok(context)
    }

    fn set_context(
        &self,
        id: &GroupId,
        context: &str,
        at: DateTime<Utc>,
    ) -> Result<(), GroupError> {
        let sql = "INSERT INTO groups (id, context, context_updated_at) VALUES (?1, ?2, ?3) \
                   ON CONFLICT(id) DO UPDATE SET context = ?2, context_updated_at = ?3";
        self.conn
            .execute(sql, (id.as_str(), context, to_rfc3339(&at)))
            .map_err(storage)?;
        Ok(())
    }

    fn members(&self, id: &GroupId) -> Result<Vec<MemberInfo>, GroupError> {
        let mut stmt = self
            .conn
            .prepare("SELECT member_id, name FROM group_members WHERE group_id = ?1 ORDER BY member_id")
            .map_err(storage)?;
        let mut rows = stmt.query([id.as_str()]).map_err(storage)?;
        let mut members = Vec::new();
        while let Some(row) = rows.next().map_err(storage)? {
            members.push(MemberInfo {
                id: row.get(0).map_err(storage)?,
                name: row.get(1).map_err(storage)?,
            });
        }
        Ok(members)
    }

    fn put_member(&self, id: &GroupId, member: MemberInfo) -> Result<(), GroupError> {
        let sql = "INSERT INTO group_members (group_id, member_id, name) VALUES (?1, ?2, ?3) \
                   ON CONFLICT(group_id, member_id) DO UPDATE SET name = ?3";
        self.conn
            .execute(sql, (id.as_str(), member.id, member.name))
            .map_err(storage)?;
        Ok(())
    }
}
