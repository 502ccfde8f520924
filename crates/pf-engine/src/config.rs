use std::time::Duration;

/// Tuning knobs for the per-group scheduler and admission control.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Quiet period after the last delta before a reconciliation fires.
    pub debounce: Duration,
    /// Cap on queued message deltas per group; oldest are evicted first.
    pub max_queued_messages: usize,
    /// Minimum spacing between two reconciliations for one group.
    pub min_process_interval: Duration,
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// How long an open circuit stays open.
    pub failure_backoff: Duration,
    /// Broadcast channel capacity for notifications.
    pub notify_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(8),
            max_queued_messages: 50,
            min_process_interval: Duration::from_millis(5000),
            failure_threshold: 3,
            failure_backoff: Duration::from_secs(60),
            notify_capacity: 256,
        }
    }
}
