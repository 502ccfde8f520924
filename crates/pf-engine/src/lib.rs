pub mod config;
pub mod engine;
pub mod queue;
pub mod state;

pub use crate::config::EngineConfig;
pub use crate::engine::PlanEngine;
pub use crate::state::{GroupSnapshot, ProcessingMetrics};
