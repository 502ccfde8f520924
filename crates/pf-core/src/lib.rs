pub mod error;
pub mod eventlog;
pub mod groups;
pub mod history;
pub mod merge;
pub mod milestones;
pub mod oracle;
pub mod projects;
pub mod store;
pub mod tasks;

pub mod types;

pub use crate::error::PlanError;
pub use crate::oracle::{OracleResponse, ReasoningOracle, ReconciliationRequest};
pub use crate::store::Store;
