use crate::util::{encode_enum, decode_enum, from_date_str, from_rfc3339, to_date_str, to_rfc3339};
use chrono::Utc;
use pf_core::error::TaskError;
use pf_core::tasks::TaskRepository;
use pf_core::types::{
    CreateTaskInput, Priority, ProjectId, Task, TaskFieldChanges, TaskFilter, TaskId,
};
use rusqlite::Connection;
use std::str::FromStr;

pub struct TaskRepo<'a> {
    pub conn: &'a Connection,
}

impl<'a> TaskRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

fn storage(err: impl ToString) -> TaskError {
    TaskError::Storage {
        message: err.to_string(),
    }
}

const COLUMNS: &str =
    "id, project_id, title, description, status, priority, assignee, deadline, created_at, updated_at";

impl<'a> TaskRepository for TaskRepo<'a> {
    fn create(&self, input: CreateTaskInput) -> Result<Task, TaskError> {
        let now = Utc::now();
        let task = Task {
            id: TaskId::generate(),
            project_id: input.project_id,
            title: input.title,
            description: input.description,
            status: input.status,
            priority: input.priority,
            assignee: input.assignee,
            deadline: input.deadline,
            created_at: now,
            updated_at: now,
        };
        let sql = "INSERT INTO tasks (id, project_id, title, description, status, priority, assignee, deadline, created_at, updated_at) \
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)";
        self.conn
            .execute(
                sql,
                (
                    task.id.as_str(),
                    task.project_id.as_str(),
                    task.title.clone(),
                    task.description.clone(),
                    encode_enum(&task.status).map_err(storage)?,
                    task.priority.as_u8(),
                    task.assignee.clone(),
                    task.deadline.as_ref().map(to_date_str),
                    to_rfc3339(&task.created_at),
                    to_rfc3339(&task.updated_at),
                ),
            )
            .map_err(storage)?;
        Ok(task)
    }

    fn get(&self, id: &TaskId) -> Result<Option<Task>, TaskError> {
        let sql = format!("SELECT {COLUMNS} FROM tasks WHERE id = ?1");
        let mut stmt = self.conn.prepare(&sql).map_err(storage)?;
        let mut rows = stmt.query([id.as_str()]).map_err(storage)?;
        let Some(row) = rows.next().map_err(storage)? else {
            return Ok(None);
        };
        map_task_row(row).map(Some)
    }

    fn list(&self, filter: TaskFilter) -> Result<Vec<Task>, TaskError> {
        let mut sql = format!("SELECT {COLUMNS} FROM tasks");
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
        sql.push_str(" ORDER BY created_at ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql).map_err(storage)?;
        let mut rows = stmt
            .query(rusqlite::params_from_iter(params))
            .map_err(storage)?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next().map_err(storage)? {
            tasks.push(map_task_row(row)?);
        }
        Ok(tasks)
    }

    fn apply(&self, id: &TaskId, changes: &TaskFieldChanges) -> Result<Task, TaskError> {
        let current = self.get(id)?.ok_or(TaskError::NotFound)?;
        if changes.is_empty() {
            return Ok(current);
        }

        let mut updated = current;
        if let Some(status) = changes.status {
            updated.status = status;
        }
        if let Some(priority) = changes.priority {
            updated.priority = priority;
        }
        if let Some(assignee) = &changes.assignee {
            updated.assignee = assignee.clone();
        }
        if let Some(deadline) = changes.deadline {
            updated.deadline = deadline;
        }
        if let Some(description) = &changes.description {
            updated.description = description.clone();
        }
        updated.updated_at = Utc::now();

        let sql = "UPDATE tasks SET status = ?2, priority = ?3, assignee = ?4, deadline = ?5, \
                   description = ?6, updated_at = ?7 WHERE id = ?1";
        self.conn
            .execute(
                sql,
                (
                    id.as_str(),
                    encode_enum(&updated.status).map_err(storage)?,
                    updated.priority.as_u8(),
                    updated.assignee.clone(),
                    updated.deadline.as_ref().map(to_date_str),
                    updated.description.clone(),
                    to_rfc3339(&updated.updated_at),
                ),
            )
            .map_err(storage)?;
        Ok(updated)
    }
}

fn map_task_row(row: &rusqlite::Row<'_>) -> Result<Task, TaskError> {
    let id: String = row.get(0).map_err(storage)?;
    let project_id: String = row.get(1).map_err(storage)?;
    let status: String = row.get(4).map_err(storage)?;
    let priority: u8 = row.get(5).map_err(storage)?;
    let deadline: Option<String> = row.get(7).map_err(storage)?;
    let created_at: String = row.get(8).map_err(storage)?;
    let updated_at: String = row.get(9).map_err(storage)?;
    Ok(Task {
        id: TaskId::from_str(&id).map_err(storage)?,
        project_id: ProjectId::from_str(&project_id).map_err(storage)?,
        title: row.get(2).map_err(storage)?,
        description: row.get(3).map_err(storage)?,
        status: decode_enum(&status).map_err(storage)?,
        priority: Priority::try_from(priority).map_err(|message| TaskError::InvalidInput { message })?,
        assignee: row.get(6).map_err(storage)?,
        deadline: deadline
            .as_deref()
            .map(from_date_str)
            .transpose()
            .map_err(storage)?,
        created_at: from_rfc3339(&created_at).map_err(storage)?,
        updated_at: from_rfc3339(&updated_at).map_err(storage)?,
    })
}
