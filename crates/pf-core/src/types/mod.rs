pub mod changes;
pub mod delta;
pub mod enums;
pub mod eventlog;
pub mod ids;
pub mod io;
pub mod member;
pub mod milestone;
pub mod project;
pub mod task;

pub use changes::{MilestoneFieldChanges, TaskFieldChanges};
pub use delta::{ContextDelta, DeltaPayload, MessageDelta, QueuedEvent};
pub use enums::{DeltaKind, MilestoneStatus, Priority, TaskStatus};
pub use eventlog::{EventLogEntry, TaskChange, TaskHistoryEntry};
pub use ids::{EventId, GroupId, HistoryId, IdError, MilestoneId, ProjectId, TaskId};
pub use io::{
    CreateMilestoneInput, CreateProjectInput, CreateTaskInput, MilestoneFilter, PlanUpdate,
    TaskFilter,
};
pub use member::MemberInfo;
pub use milestone::Milestone;
pub use project::Project;
pub use task::Task;
