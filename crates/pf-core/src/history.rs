use crate::error::TaskError;
use crate::types::{TaskHistoryEntry, TaskId};

pub trait TaskHistoryRepository {
    fn append(&self, entry: TaskHistoryEntry) -> Result<(), TaskError>;
    fn list(&self, task_id: &TaskId) -> Result<Vec<TaskHistoryEntry>, TaskError>;
}
