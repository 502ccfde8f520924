use crate::types::enums::{MilestoneStatus, Priority, TaskStatus};
use crate::types::ids::{GroupId, ProjectId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProjectInput {
    pub group_id: GroupId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTaskInput {
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub assignee: Option<String>,
    pub deadline: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFilter {
    pub project_id: Option<ProjectId>,
    pub status: Option<Vec<TaskStatus>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMilestoneInput {
    pub project_id: ProjectId,
    pub title: String,
    pub date: NaiveDate,
    pub status: MilestoneStatus,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneFilter {
    pub project_id: Option<ProjectId>,
    pub status: Option<Vec<MilestoneStatus>>,
}

/// Plan supersession written atomically after the task/milestone upserts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanUpdate {
    pub plan_graph: String,
    pub rationale: String,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}
