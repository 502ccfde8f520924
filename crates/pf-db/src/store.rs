use pf_core::error::PlanError;
use pf_core::store::Store;
use rusqlite::Connection;

use crate::event_repo::EventRepo;
use crate::group_repo::GroupRepo;
use crate::history_repo::HistoryRepo;
use crate::milestone_repo::MilestoneRepo;
use crate::project_repo::ProjectRepo;
use crate::task_repo::TaskRepo;

pub struct DbStore {
    conn: Connection,
}

impl DbStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: &str) -> Result<Self, PlanError> {
        let conn = crate::schema::open_and_migrate(path).map_err(internal)?;
        Ok(Self::new(conn))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn internal(err: impl ToString) -> PlanError {
    PlanError::Internal {
        message: err.to_string(),
    }
}

impl Store for DbStore {
    type Groups<'a>
        = GroupRepo<'a>
    where
        Self: 'a;
    type Projects<'a>
        = ProjectRepo<'a>
    where
        Self: 'a;
    type Tasks<'a>
        = TaskRepo<'a>
    where
        Self: 'a;
    type Milestones<'a>
        = MilestoneRepo<'a>
    where
        Self: 'a;
    type EventLog<'a>
        = EventRepo<'a>
    where
        Self: 'a;
    type History<'a>
        = HistoryRepo<'a>
    where
        Self: 'a;

    fn groups(&self) -> Self::Groups<'_> {
        GroupRepo::new(&self.conn)
    }

    fn projects(&self) -> Self::Projects<'_> {
        ProjectRepo::new(&self.conn)
    }

    fn tasks(&self) -> Self::Tasks<'_> {
        TaskRepo::new(&self.conn)
    }

    fn milestones(&self) -> Self::Milestones<'_> {
        MilestoneRepo::new(&self.conn)
    }

    fn event_log(&self) -> Self::EventLog<'_> {
        EventRepo::new(&self.conn)
    }

    fn history(&self) -> Self::History<'_> {
        HistoryRepo::new(&self.conn)
    }

    fn with_tx<F, T>(&self, f: F) -> Result<T, PlanError>
    where
        F: FnOnce(&Self) -> Result<T, PlanError>,
    {
        self.conn.execute_batch("BEGIN IMMEDIATE").map_err(internal)?;
        let result = f(self);
        match result {
            Ok(value) => {
                self.conn.execute_batch("COMMIT").map_err(internal)?;
                Ok(value)
            }
            Err(err) => {
                self.conn.execute_batch("ROLLBACK").map_err(internal)?;
                Err(err)
            }
        }
    }
}
