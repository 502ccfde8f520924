use crate::util::{decode_enum, encode_enum, from_date_str, from_rfc3339, to_date_str, to_rfc3339};
use chrono::Utc;
use pf_core::error::MilestoneError;
use pf_core::milestones::MilestoneRepository;
use pf_core::types::{
    CreateMilestoneInput, Milestone, MilestoneFieldChanges, MilestoneFilter, MilestoneId,
    ProjectId,
};
use rusqlite::Connection;
use std::str::FromStr;

pub struct MilestoneRepo<'a> {
    pub conn: &'a Connection,
}

impl<'a> MilestoneRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

fn storage(err: impl ToString) -> MilestoneError {
    MilestoneError::Storage {
        message: err.to_string(),
    }
}

const COLUMNS: &str = "id, project_id, title, date, status, description, created_at, updated_at";

impl<'a> MilestoneRepository for MilestoneRepo<'a> {
    fn create(&self, input: CreateMilestoneInput) -> Result<Milestone, MilestoneError> {
        let now = Utc::now();
        let milestone = Milestone {
            id: MilestoneId::generate(),
            project_id: input.project_id,
            title: input.title,
            date: input.date,
            status: input.status,
            description: input.description,
            created_at: now,
            updated_at: now,
        };
        let sql = "INSERT INTO milestones (id, project_id, title, date, status, description, created_at, updated_at) \
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";
        self.conn
            .execute(
                sql,
                (
                    milestone.id.as_str(),
                    milestone.project_id.as_str(),
                    milestone.title.clone(),
                    to_date_str(&milestone.date),
                    encode_enum(&milestone.status).map_err(storage)?,
                    milestone.description.clone(),
                    to_rfc3339(&milestone.created_at),
                    to_rfc3339(&milestone.updated_at),
                ),
            )
            .map_err(storage)?;
        Ok(milestone)
    }

    fn list(&self, filter: MilestoneFilter) -> Result<Vec<Milestone>, MilestoneError> {
        let mut sql = format!("SELECT {COLUMNS} FROM milestones");
        let mut clauses = Vec::new();
        let mut params: Vec<rusqlite::types::Value> = Vec::new();
        if let Some(project_id) = &filter.project_id {
            params.push(project_id.as_str().to_string().into());
            clauses.push(format!("project_id = ?{}", params.len()));
        }
        if let Some(statuses) = &filter.status {
            let mut placeholders = Vec::new();
            for status in statuses {
                params.push(encode_enum(status).map_err(storage)?.into());
                placeholders.push(format!("?{}", params.len()));
            }
            clauses.push(format!("status IN ({})", placeholders.join(", ")));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY date ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql).map_err(storage)?;
        let mut rows = stmt
            .query(rusqlite::params_from_iter(params))
            .map_err(storage)?;
        let mut milestones = Vec::new();
        while let Some(row) = rows.next().map_err(storage)? {
            milestones.push(map_milestone_row(row)?);
        }
        Ok(milestones)
    }

    fn apply(
        &self,
        id: &MilestoneId,
        changes: &MilestoneFieldChanges,
    ) -> Result<Milestone, MilestoneError> {
        let current = self.get(id)?.ok_or(MilestoneError::NotFound)?;
        if changes.is_empty() {
            return Ok(current);
        }

        let mut updated = current;
        if let Some(status) = changes.status {
            updated.status = status;
        }
        if let Some(date) = changes.date {
            updated.date = date;
        }
        if let Some(description) = &changes.description {
            updated.description = description.clone();
        }
        updated.updated_at = Utc::now();

        let sql = "UPDATE milestones SET date = ?2, status = ?3, description = ?4, updated_at = ?5 \
                   WHERE id = ?1";
        self.conn
            .execute(
                sql,
                (
                    id.as_str(),
                    to_date_str(&updated.date),
                    encode_enum(&updated.status).map_err(storage)?,
                    updated.description.clone(),
                    to_rfc3339(&updated.updated_at),
                ),
            )
            .map_err(storage)?;
        Ok(updated)
    }
}

impl<'a> MilestoneRepo<'a> {
    fn get(&self, id: &MilestoneId) -> Result<Option<Milestone>, MilestoneError> {
        let sql = format!("SELECT {COLUMNS} FROM milestones WHERE id = ?1");
        let mut stmt = self.conn.prepare(&sql).map_err(storage)?;
        let mut rows = stmt.query([id.as_str()]).map_err(storage)?;
        let Some(row) = rows.next().map_err(storage)? else {
            return Ok(None);
        };
        map_milestone_row(row).map(Some)
    }
}

fn map_milestone_row(row: &rusqlite::Row<'_>) -> Result<Milestone, MilestoneError> {
    let id: String = row.get(0).map_err(storage)?;
    let project_id: String = row.get(1).map_err(storage)?;
    let date: String = row.get(3).map_err(storage)?;
    let status: String = row.get(4).map_err(storage)?;
    let created_at: String = row.get(6).map_err(storage)?;
    let updated_at: String = row.get(7).map_err(storage)?;
    Ok(Milestone {
        id: MilestoneId::from_str(&id).map_err(storage)?,
        project_id: ProjectId::from_str(&project_id).map_err(storage)?,
        title: row.get(2).map_err(storage)?,
        date: from_date_str(&date).map_err(storage)?,
        status: decode_enum(&status).map_err(storage)?,
        description: row.get(5).map_err(storage)?,
        created_at: from_rfc3339(&created_at).map_err(storage)?,
        updated_at: from_rfc3339(&updated_at).map_err(storage)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::with_test_db;
    use chrono::NaiveDate;
    use pf_core::types::MilestoneStatus;

    fn input(project_id: &ProjectId, title: &str, date: NaiveDate) -> CreateMilestoneInput {
        CreateMilestoneInput {
            project_id: project_id.clone(),
            title: title.to_string(),
            date,
            status: MilestoneStatus::Upcoming,
            description: None,
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn list_orders_by_date() {
        let conn = with_test_db().unwrap();
        let repo = MilestoneRepo::new(&conn);
        let project_id = ProjectId::generate();

        let later = repo
            .create(input(&project_id, "Launch", date("2026-10-01")))
            .unwrap();
        let earlier = repo
            .create(input(&project_id, "Beta", date("2026-09-01")))
            .unwrap();

        let listed = repo
            .list(MilestoneFilter {
                project_id: Some(project_id),
                status: None,
            })
            .unwrap();
        assert_eq!(listed, vec![earlier, later]);
    }

    #[test]
    fn apply_moves_date_and_status() {
        let conn = with_test_db().unwrap();
        let repo = MilestoneRepo::new(&conn);
        let project_id = ProjectId::generate();

        let milestone = repo
            .create(input(&project_id, "Launch", date("2026-10-01")))
            .unwrap();
        let updated = repo
            .apply(
                &milestone.id,
                &MilestoneFieldChanges {
                    status: Some(MilestoneStatus::InProgress),
                    date: Some(date("2026-10-15")),
                    description: None,
                },
            )
            .unwrap();
        assert_eq!(updated.status, MilestoneStatus::InProgress);
        assert_eq!(updated.date, date("2026-10-15"));
        assert_eq!(updated.title, milestone.title);
    }

    #[test]
    fn apply_missing_milestone_errors() {
        let conn = with_test_db().unwrap();
        let repo = MilestoneRepo::new(&conn);
        let err = repo
            .apply(&MilestoneId::generate(), &MilestoneFieldChanges::default())
            .unwrap_err();
        assert!(matches!(err, MilestoneError::NotFound));
    }
}
