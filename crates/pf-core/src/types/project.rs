use crate::types::ids::{GroupId, ProjectId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Owner of the reconciled plan for one group. The plan fields are only
/// written through `ProjectRepository::update_plan`; `version` starts at 0
/// and increases by exactly one per successful reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub group_id: GroupId,
    pub name: String,
    pub plan_graph: Option<String>,
    pub rationale: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
