use crate::error::OracleError;
use crate::types::{
    MemberInfo, MessageDelta, Milestone, MilestoneStatus, Priority, Task, TaskStatus,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Snapshot handed to the external reasoning service. One request, one
/// response; retry policy lives with the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationRequest {
    pub context: String,
    pub current_tasks: Vec<Task>,
    pub current_milestones: Vec<Milestone>,
    pub member_roster: Vec<MemberInfo>,
    pub recent_messages: Vec<MessageDelta>,
    pub previous_plan_graph: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProposedTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProposedMilestone {
    pub title: String,
    pub date: NaiveDate,
    pub status: MilestoneStatus,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OracleResponse {
    pub tasks: Vec<ProposedTask>,
    pub milestones: Vec<ProposedMilestone>,
    pub plan_graph: String,
    pub rationale: String,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl OracleResponse {
    /// Strict parse of a raw oracle payload. Unknown fields and shape
    /// mismatches are failures, never silently ignored.
    pub fn from_value(value: Value) -> Result<Self, OracleError> {
        let response: Self =
            serde_json::from_value(value).map_err(|err| OracleError::InvalidResponse {
                message: err.to_string(),
            })?;
        response.validate()?;
        Ok(response)
    }

    /// A response without a renderable plan graph is unusable and counts
    /// as an oracle failure.
    pub fn validate(&self) -> Result<(), OracleError> {
        if self.plan_graph.trim().is_empty() {
            return Err(OracleError::MissingPlanGraph);
        }
        Ok(())
    }
}

#[async_trait]
pub trait ReasoningOracle: Send + Sync {
    async fn reconcile(
        &self,
        request: ReconciliationRequest,
    ) -> Result<OracleResponse, OracleError>;
}
