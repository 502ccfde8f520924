use crate::error::PlanError;
use crate::eventlog::EventLogRepository;
use crate::groups::GroupRepository;
use crate::history::TaskHistoryRepository;
use crate::milestones::MilestoneRepository;
use crate::projects::ProjectRepository;
use crate::tasks::TaskRepository;

pub trait Store {
    type Groups<'a>: GroupRepository
    where
        Self: 'a;
    type Projects<'a>: ProjectRepository
    where
        Self: 'a;
    type Tasks<'a>: TaskRepository
    where
        Self: 'a;
    type Milestones<'a>: MilestoneRepository
    where
        Self: 'a;
    type EventLog<'a>: EventLogRepository
    where
        Self: 'a;
    type History<'a>: TaskHistoryRepository
    where
        Self: 'a;

    fn groups(&self) -> Self::Groups<'_>;
    fn projects(&self) -> Self::Projects<'_>;
    fn tasks(&self) -> Self::Tasks<'_>;
    fn milestones(&self) -> Self::Milestones<'_>;
    fn event_log(&self) -> Self::EventLog<'_>;
    fn history(&self) -> Self::History<'_>;

    fn with_tx<F, T>(&self, f: F) -> Result<T, PlanError>
    where
        F: FnOnce(&Self) -> Result<T, PlanError>;
}
