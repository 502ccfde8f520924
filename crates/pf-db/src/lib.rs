pub mod event_repo;
pub mod group_repo;
pub mod history_repo;
pub mod milestone_repo;
pub mod project_repo;
pub mod schema;
pub mod store;
pub mod task_repo;
pub mod util;

pub use crate::store::DbStore;
