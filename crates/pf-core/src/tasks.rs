use crate::error::TaskError;
use crate::types::{CreateTaskInput, Task, TaskFieldChanges, TaskFilter, TaskId};

pub trait TaskRepository {
    fn create(&self, input: CreateTaskInput) -> Result<Task, TaskError>;
    fn get(&self, id: &TaskId) -> Result<Option<Task>, TaskError>;
    fn list(&self, filter: TaskFilter) -> Result<Vec<Task>, TaskError>;
    /// Applies only the fields present in `changes`; untouched fields keep
    /// their values and an empty diff must not churn `updated_at`.
    fn apply(&self, id: &TaskId, changes: &TaskFieldChanges) -> Result<Task, TaskError>;
}
