use crate::queue::GroupQueue;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// In-memory health counters for one group. Deliberately not persisted;
/// a restart comes back circuit-closed.
#[derive(Debug, Clone, Default)]
pub struct ProcessingMetrics {
    pub last_processed_at: Option<Instant>,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    pub circuit_open_until: Option<Instant>,
}

/// Everything the engine tracks per group, behind the registry lock.
pub struct GroupState {
    pub queue: GroupQueue,
    pub metrics: ProcessingMetrics,
    pub processing: bool,
    pub timer: Option<JoinHandle<()>>,
}

impl GroupState {
    pub fn new(max_queued_messages: usize) -> Self {
        Self {
            queue: GroupQueue::new(max_queued_messages),
            metrics: ProcessingMetrics::default(),
            processing: false,
            timer: None,
        }
    }

    pub fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Point-in-time view returned by `PlanEngine::state`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSnapshot {
    pub queue_depth: usize,
    pub processing: bool,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    pub circuit_open: bool,
}
