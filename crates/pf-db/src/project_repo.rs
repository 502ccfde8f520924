use crate::util::{from_rfc3339, to_rfc3339};
use chrono::Utc;
use pf_core::error::ProjectError;
use pf_core::projects::ProjectRepository;
use pf_core::types::{CreateProjectInput, GroupId, PlanUpdate, Project, ProjectId};
use rusqlite::Connection;
use std::str::FromStr;

pub struct ProjectRepo<'a> {
    pub conn: &'a Connection,
}

impl<'a> ProjectRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

fn storage(err: impl ToString) -> ProjectError {
    ProjectError::Storage {
        message: err.to_string(),
    }
}

const COLUMNS: &str = "id, group_id, name, plan_graph, rationale, version, created_at, updated_at";

impl<'a> ProjectRepository for ProjectRepo<'a> {
    fn create(&self, input: CreateProjectInput) -> Result<Project, ProjectError> {
        let now = Utc::now();
        let project = Project {
            id: ProjectId::generate(),
            group_id: input.group_id,
            name: input.name,
            plan_graph: None,
            rationale: None,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        let sql = "INSERT INTO projects (id, group_id, name, plan_graph, rationale, version, created_at, updated_at) \
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";
        self.conn
            .execute(
                sql,
                (
                    project.id.as_str(),
                    project.group_id.as_str(),
                    project.name.clone(),
                    project.plan_graph.clone(),
                    project.rationale.clone(),
                    project.version,
                    to_rfc3339(&project.created_at),
                    to_rfc3339(&project.updated_at),
                ),
            )
            .map_err(storage)?;
        Ok(project)
    }

    fn get(&self, id: &ProjectId) -> Result<Option<Project>, ProjectError> {
        let sql = format!("SELECT {COLUMNS} FROM projects WHERE id = ?1");
        let mut stmt = self.conn.prepare(&sql).map_err(storage)?;
        let mut rows = stmt.query([id.as_str()]).map_err(storage)?;
        let Some(row) = rows.next().map_err(storage)? else {
            return Ok(None);
        };
        map_project_row(row).map(Some)
    }

    fn list_by_group(&self, group_id: &GroupId) -> Result<Vec<Project>, ProjectError> {
        let sql = format!("SELECT {COLUMNS} FROM projects WHERE group_id = ?1 ORDER BY created_at ASC");
        let mut stmt = self.conn.prepare(&sql).map_err(storage)?;
        let mut rows = stmt.query([group_id.as_str()]).map_err(storage)?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next().map_err(storage)? {
            projects.push(map_project_row(row)?);
        }
        Ok(projects)
    }

    fn update_plan(&self, id: &ProjectId, update: PlanUpdate) -> Result<Project, ProjectError> {
        let sql = "UPDATE projects SET plan_graph = ?2, rationale = ?3, version = ?4, updated_at = ?5 \
                   WHERE id = ?1";
        let affected = self
            .conn
            .execute(
                sql,
                (
                    id.as_str(),
                    update.plan_graph,
                    update.rationale,
                    update.version,
                    to_rfc3339(&update.updated_at),
                ),
            )
            .map_err(storage)?;
        if affected == 0 {
            return Err(ProjectError::NotFound);
        }
        self.get(id)?.ok_or(ProjectError::NotFound)
    }
}

fn map_project_row(row: &rusqlite::Row<'_>) -> Result<Project, ProjectError> {
    let id: String = row.get(0).map_err(storage)?;
    let group_id: String = row.get(1).map_err(storage)?;
    let created_at: String = row.get(6).map_err(storage)?;
    let updated_at: String = row.get(7).map_err(storage)?;
    Ok(Project {
        id: ProjectId::from_str(&id).map_err(storage)?,
        group_id: GroupId::new(group_id),
        name: row.get(2).map_err(storage)?,
        plan_graph: row.get(3).map_err(storage)?,
        rationale: row.get(4).map_err(storage)?,
        version: row.get(5).map_err(storage)?,
        created_at: from_rfc3339(&created_at).map_err(storage)?,
        updated_at: from_rfc3339(&updated_at).map_err(storage)?,
    })
}
