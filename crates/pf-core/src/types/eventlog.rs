use crate::types::changes::TaskFieldChanges;
use crate::types::enums::DeltaKind;
use crate::types::ids::{EventId, GroupId, HistoryId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Append-only audit record of one accepted delta, written before the
/// delta is queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: EventId,
    pub group_id: GroupId,
    pub source: DeltaKind,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

/// What a reconciliation did to one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TaskChange {
    Created { title: String },
    Updated { fields: TaskFieldChanges },
}

/// Append-only per-task mutation record. Write-once, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHistoryEntry {
    pub id: HistoryId,
    pub task_id: TaskId,
    pub change: TaskChange,
    pub at: DateTime<Utc>,
}

impl TaskHistoryEntry {
    pub fn created(task_id: TaskId, title: String) -> Self {
        Self {
            id: HistoryId::generate(),
            task_id,
            change: TaskChange::Created { title },
            at: Utc::now(),
        }
    }

    pub fn updated(task_id: TaskId, fields: TaskFieldChanges) -> Self {
        Self {
            id: HistoryId::generate(),
            task_id,
            change: TaskChange::Updated { fields },
            at: Utc::now(),
        }
    }
}
