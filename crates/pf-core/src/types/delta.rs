use crate::types::enums::DeltaKind;
use crate::types::ids::GroupId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Full replacement of a group's project context. Not a diff; the latest
/// delta wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextDelta {
    pub group_id: GroupId,
    pub full_context: String,
    pub at: DateTime<Utc>,
}

/// One inbound chat message. `is_from_me` marks self-authored traffic,
/// which never enters the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDelta {
    pub group_id: GroupId,
    pub author: String,
    pub author_name: Option<String>,
    pub text: String,
    pub at: DateTime<Utc>,
    pub is_from_me: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum DeltaPayload {
    Context(ContextDelta),
    Message(MessageDelta),
}

impl DeltaPayload {
    pub fn kind(&self) -> DeltaKind {
        match self {
            Self::Context(_) => DeltaKind::Context,
            Self::Message(_) => DeltaKind::Message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedEvent {
    pub enqueued_at: DateTime<Utc>,
    pub payload: DeltaPayload,
}

impl QueuedEvent {
    pub fn new(payload: DeltaPayload) -> Self {
        Self {
            enqueued_at: Utc::now(),
            payload,
        }
    }

    pub fn is_message(&self) -> bool {
        matches!(self.payload, DeltaPayload::Message(_))
    }
}
