use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One notification emitted by the engine for external UI/IPC listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub group_id: String,
    pub at: DateTime<Utc>,
    pub body: NotificationBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum NotificationBody {
    /// A reconciliation succeeded and the plan row was superseded.
    PlanUpdated { project_id: String, version: i64 },
    /// Processing for the group is paused (open circuit or fresh trip).
    ProcessingPaused {
        consecutive_failures: u32,
        retry_in_ms: i64,
    },
}

impl Notification {
    pub fn plan_updated(group_id: String, project_id: String, version: i64) -> Self {
        Self {
            group_id,
            at: Utc::now(),
            body: NotificationBody::PlanUpdated {
                project_id,
                version,
            },
        }
    }

    pub fn processing_paused(
        group_id: String,
        consecutive_failures: u32,
        retry_in_ms: i64,
    ) -> Self {
        Self {
            group_id,
            at: Utc::now(),
            body: NotificationBody::ProcessingPaused {
                consecutive_failures,
                retry_in_ms,
            },
        }
    }
}
