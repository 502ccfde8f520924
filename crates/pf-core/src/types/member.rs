use serde::{Deserialize, Serialize};

/// Roster entry handed to the oracle so it can resolve assignees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub id: String,
    pub name: Option<String>,
}
