use crate::error::EventLogError;
use crate::types::{EventLogEntry, GroupId};

pub trait EventLogRepository {
    fn append(&self, entry: EventLogEntry) -> Result<(), EventLogError>;
    /// Most recent entries first, capped at `limit`.
    fn list(&self, group_id: &GroupId, limit: u32) -> Result<Vec<EventLogEntry>, EventLogError>;
}
