use thiserror::Error;

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("group not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("storage error: {message}")]
    Storage { message: String },
}

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("project not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("storage error: {message}")]
    Storage { message: String },
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("storage error: {message}")]
    Storage { message: String },
}

#[derive(Debug, Error)]
pub enum MilestoneError {
    #[error("milestone not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("storage error: {message}")]
    Storage { message: String },
}

#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("storage error: {message}")]
    Storage { message: String },
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle unavailable: {message}")]
    Unavailable { message: String },
    #[error("invalid oracle response: {message}")]
    InvalidResponse { message: String },
    #[error("oracle response has no plan graph")]
    MissingPlanGraph,
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Group(#[from] GroupError),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Milestone(#[from] MilestoneError),
    #[error(transparent)]
    EventLog(#[from] EventLogError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error("internal error: {message}")]
    Internal { message: String },
}
