use crate::config::EngineConfig;
use crate::state::{GroupSnapshot, GroupState};
use chrono::Utc;
use pf_core::error::PlanError;
use pf_core::eventlog::EventLogRepository;
use pf_core::groups::GroupRepository;
use pf_core::history::TaskHistoryRepository;
use pf_core::merge::plan_merge;
use pf_core::milestones::MilestoneRepository;
use pf_core::oracle::{ReasoningOracle, ReconciliationRequest};
use pf_core::projects::ProjectRepository;
use pf_core::store::Store;
use pf_core::tasks::TaskRepository;
use pf_core::types::{
    ContextDelta, DeltaPayload, EventId, EventLogEntry, GroupId, MessageDelta, MilestoneFilter,
    PlanUpdate, ProjectId, QueuedEvent, TaskFilter, TaskHistoryEntry,
};
use pf_events::{Notification, NotificationBus};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// Per-group debounce scheduler and reconciliation driver.
///
/// Cheap to clone; all state lives behind one `Arc`. Groups are fully
/// independent pipelines: one group's open circuit or slow oracle call
/// never delays another.
pub struct PlanEngine<S, O> {
    inner: Arc<Inner<S, O>>,
}

struct Inner<S, O> {
    store: tokio::sync::Mutex<S>,
    oracle: O,
    config: EngineConfig,
    bus: NotificationBus,
    groups: Mutex<HashMap<GroupId, GroupState>>,
}

impl<S, O> Clone for PlanEngine<S, O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, O> PlanEngine<S, O>
where
    S: Store + Send + 'static,
    O: ReasoningOracle + 'static,
{
    pub fn new(store: S, oracle: O, config: EngineConfig) -> Self {
        let bus = NotificationBus::new(config.notify_capacity);
        Self {
            inner: Arc::new(Inner {
                store: tokio::sync::Mutex::new(store),
                oracle,
                config,
                bus,
                groups: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Notification> {
        self.inner.bus.subscribe()
    }

    /// Read access for embedding layers (UI queries, admin tooling).
    pub fn store(&self) -> &tokio::sync::Mutex<S> {
        &self.inner.store
    }

    /// Accepts a full-context replacement. The context is persisted
    /// immediately (latest wins) so reconciliation always sees the
    /// freshest version, then the delta joins the debounced queue.
    pub async fn on_context_delta(&self, delta: ContextDelta) {
        let group_id = delta.group_id.clone();
        {
            let store = self.inner.store.lock().await;
            self.log_event(&*store, &group_id, &DeltaPayload::Context(delta.clone()));
            if let Err(err) = store
                .groups()
                .set_context(&group_id, &delta.full_context, delta.at)
            {
                warn!(group = %group_id, %err, "context upsert failed");
            }
        }
        self.enqueue(&group_id, QueuedEvent::new(DeltaPayload::Context(delta)));
    }

    /// Accepts one inbound chat message. Self-authored messages are
    /// rejected before they touch the log or the queue.
    pub async fn on_message_delta(&self, delta: MessageDelta) {
        if delta.is_from_me {
            return;
        }
        let group_id = delta.group_id.clone();
        {
            let store = self.inner.store.lock().await;
            self.log_event(&*store, &group_id, &DeltaPayload::Message(delta.clone()));
        }
        self.enqueue(&group_id, QueuedEvent::new(DeltaPayload::Message(delta)));
    }

    /// Skips the debounce wait and runs the admission pipeline now.
    /// An empty queue is a legal no-op.
    pub async fn force_refresh(&self, group_id: &GroupId) {
        {
            let mut groups = self.lock_groups();
            if let Some(state) = groups.get_mut(group_id) {
                state.cancel_timer();
            }
        }
        self.try_process(group_id).await;
    }

    pub fn state(&self, group_id: &GroupId) -> GroupSnapshot {
        let groups = self.lock_groups();
        match groups.get(group_id) {
            Some(state) => GroupSnapshot {
                queue_depth: state.queue.len(),
                processing: state.processing,
                consecutive_failures: state.metrics.consecutive_failures,
                last_error: state.metrics.last_error.clone(),
                circuit_open: state
                    .metrics
                    .circuit_open_until
                    .is_some_and(|until| Instant::now() < until),
            },
            None => GroupSnapshot {
                queue_depth: 0,
                processing: false,
                consecutive_failures: 0,
                last_error: None,
                circuit_open: false,
            },
        }
    }

    /// Aborts all pending timers. In-flight reconciliations may be
    /// abandoned mid-await; the merge is idempotent so nothing is lost.
    pub fn shutdown(&self) {
        let mut groups = self.lock_groups();
        for state in groups.values_mut() {
            state.cancel_timer();
        }
    }

    fn log_event(&self, store: &S, group_id: &GroupId, payload: &DeltaPayload) {
        let value = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(err) => {
                warn!(group = %group_id, %err, "event payload serialization failed");
                return;
            }
        };
        let entry = EventLogEntry {
            id: EventId::generate(),
            group_id: group_id.clone(),
            source: payload.kind(),
            payload: value,
            created_at: Utc::now(),
        };
        if let Err(err) = store.event_log().append(entry) {
            warn!(group = %group_id, %err, "event log append failed");
        }
    }

    fn enqueue(&self, group_id: &GroupId, event: QueuedEvent) {
        let timer = self.spawn_timer(group_id.clone(), self.inner.config.debounce);
        let mut groups = self.lock_groups();
        let state = groups
            .entry(group_id.clone())
            .or_insert_with(|| GroupState::new(self.inner.config.max_queued_messages));
        state.queue.push(event);
        state.cancel_timer();
        state.timer = Some(timer);
    }

    fn spawn_timer(&self, group_id: GroupId, delay: Duration) -> tokio::task::JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            engine.try_process(&group_id).await;
        })
    }

    /// The admission pipeline: circuit breaker, then rate limiter, then
    /// per-group mutual exclusion. Runs at most one reconciliation.
    async fn try_process(&self, group_id: &GroupId) {
        let now = Instant::now();
        let events = {
            let mut groups = self.lock_groups();
            let Some(state) = groups.get_mut(group_id) else {
                return;
            };
            if state.queue.is_empty() {
                debug!(group = %group_id, "nothing queued, skipping");
                return;
            }

            if let Some(until) = state.metrics.circuit_open_until {
                if now < until {
                    let retry_in = until - now;
                    debug!(group = %group_id, ?retry_in, "circuit open, skipping");
                    let _ = self.inner.bus.publish(Notification::processing_paused(
                        group_id.to_string(),
                        state.metrics.consecutive_failures,
                        millis(retry_in),
                    ));
                    // Retry on our own once the backoff elapses; queued
                    // events must not depend on fresh traffic to surface.
                    state.cancel_timer();
                    state.timer = Some(self.spawn_timer(group_id.clone(), retry_in));
                    return;
                }
                // Half-open: let one attempt through with a clean slate.
                state.metrics.circuit_open_until = None;
                state.metrics.consecutive_failures = 0;
            }

            if let Some(last) = state.metrics.last_processed_at {
                let since = now - last;
                if since < self.inner.config.min_process_interval {
                    let remainder = self.inner.config.min_process_interval - since;
                    debug!(group = %group_id, ?remainder, "rate limited, rescheduling");
                    state.cancel_timer();
                    state.timer = Some(self.spawn_timer(group_id.clone(), remainder));
                    return;
                }
            }

            if state.processing {
                return;
            }
            state.processing = true;
            state.queue.snapshot()
        };
        let snapshot_len = events.len();

        let result = self.reconcile(group_id, events).await;

        let mut groups = self.lock_groups();
        let Some(state) = groups.get_mut(group_id) else {
            return;
        };
        state.processing = false;
        match result {
            Ok(Some((project_id, version))) => {
                state.metrics.consecutive_failures = 0;
                state.metrics.last_error = None;
                state.metrics.last_processed_at = Some(Instant::now());
                // Only the snapshot that was reconciled is consumed;
                // deltas that arrived mid-flight wait for the next cycle.
                state.queue.drain_first(snapshot_len);
                if !state.queue.is_empty() {
                    state.cancel_timer();
                    state.timer =
                        Some(self.spawn_timer(group_id.clone(), self.inner.config.debounce));
                }
                let _ = self.inner.bus.publish(Notification::plan_updated(
                    group_id.to_string(),
                    project_id.as_str().to_string(),
                    version,
                ));
            }
            Ok(None) => {
                // Precondition miss. The queue waits for the next trigger.
            }
            Err(err) => {
                state.metrics.consecutive_failures += 1;
                state.metrics.last_error = Some(err.to_string());
                warn!(group = %group_id, %err, failures = state.metrics.consecutive_failures, "reconciliation failed");
                let retry_in = if state.metrics.consecutive_failures
                    >= self.inner.config.failure_threshold
                {
                    let backoff = self.inner.config.failure_backoff;
                    state.metrics.circuit_open_until = Some(Instant::now() + backoff);
                    error!(group = %group_id, ?backoff, "circuit opened");
                    let _ = self.inner.bus.publish(Notification::processing_paused(
                        group_id.to_string(),
                        state.metrics.consecutive_failures,
                        millis(backoff),
                    ));
                    backoff
                } else {
                    self.inner.config.debounce
                };
                // The retained queue retries on a timer, not on the next
                // unrelated delta.
                state.cancel_timer();
                state.timer = Some(self.spawn_timer(group_id.clone(), retry_in));
            }
        }
    }

    /// One full reconciliation pass. Returns `Ok(None)` when a
    /// precondition is missing (no project, no context); the caller
    /// treats that as neither success nor failure.
    async fn reconcile(
        &self,
        group_id: &GroupId,
        events: Vec<QueuedEvent>,
    ) -> Result<Option<(ProjectId, i64)>, PlanError> {
        let (project, context, current_tasks, current_milestones, member_roster) = {
            let store = self.inner.store.lock().await;
            let Some(project) = store
                .projects()
                .list_by_group(group_id)?
                .into_iter()
                .next()
            else {
                debug!(group = %group_id, "no project for group");
                return Ok(None);
            };
            let context = match store.groups().context(group_id)? {
                Some(context) if !context.trim().is_empty() => context,
                _ => {
                    debug!(group = %group_id, "no context for group");
                    return Ok(None);
                }
            };
            let tasks = store.tasks().list(TaskFilter {
                project_id: Some(project.id.clone()),
                status: None,
            })?;
            let milestones = store.milestones().list(MilestoneFilter {
                project_id: Some(project.id.clone()),
                status: None,
            })?;
            let roster = store.groups().members(group_id)?;
            (project, context, tasks, milestones, roster)
        };

        let mut recent_messages: Vec<MessageDelta> = events
            .into_iter()
            .filter_map(|event| match event.payload {
                DeltaPayload::Message(message) => Some(message),
                DeltaPayload::Context(_) => None,
            })
            .collect();
        let overflow = recent_messages
            .len()
            .saturating_sub(self.inner.config.max_queued_messages);
        recent_messages.drain(..overflow);

        let request = ReconciliationRequest {
            context,
            current_tasks: current_tasks.clone(),
            current_milestones: current_milestones.clone(),
            member_roster,
            recent_messages,
            previous_plan_graph: project.plan_graph.clone(),
        };

        // The store lock is released here; a slow oracle never blocks
        // ingestion or other groups' persistence.
        let response = self.inner.oracle.reconcile(request).await?;
        response.validate()?;
        for warning in &response.warnings {
            warn!(group = %group_id, %warning, "oracle warning");
        }

        let merge = plan_merge(&project.id, &current_tasks, &current_milestones, &response);

        let store = self.inner.store.lock().await;
        let version = store.with_tx(|store| {
            for input in merge.task_creates {
                let task = store.tasks().create(input)?;
                store
                    .history()
                    .append(TaskHistoryEntry::created(task.id, task.title))?;
            }
            for (id, changes) in merge.task_updates {
                store.tasks().apply(&id, &changes)?;
                store
                    .history()
                    .append(TaskHistoryEntry::updated(id, changes))?;
            }
            for input in merge.milestone_creates {
                store.milestones().create(input)?;
            }
            for (id, changes) in merge.milestone_updates {
                store.milestones().apply(&id, &changes)?;
            }

            let current = store
                .projects()
                .get(&project.id)?
                .ok_or(pf_core::error::ProjectError::NotFound)?;
            let updated = store.projects().update_plan(
                &project.id,
                PlanUpdate {
                    plan_graph: response.plan_graph.clone(),
                    rationale: response.rationale.clone(),
                    version: current.version + 1,
                    updated_at: Utc::now(),
                },
            )?;
            Ok(updated.version)
        })?;

        Ok(Some((project.id, version)))
    }

    fn lock_groups(&self) -> MutexGuard<'_, HashMap<GroupId, GroupState>> {
        self.inner
            .groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pf_core::error::OracleError;
    use pf_core::eventlog::EventLogRepository;
    use pf_core::history::TaskHistoryRepository;
    use pf_core::milestones::MilestoneRepository;
    use pf_core::oracle::{OracleResponse, ProposedTask};
    use pf_core::projects::ProjectRepository;
    use pf_core::tasks::TaskRepository;
    use pf_core::types::{CreateProjectInput, Priority, TaskChange, TaskStatus};
    use pf_db::DbStore;
    use pf_db::schema::with_test_db;
    use pf_events::NotificationBody;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;
    use tokio::task::yield_now;

    #[derive(Clone)]
    struct ScriptedOracle {
        responses: Arc<Mutex<VecDeque<Result<OracleResponse, OracleError>>>>,
        calls: Arc<AtomicUsize>,
        last_request: Arc<Mutex<Option<ReconciliationRequest>>>,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedOracle {
        fn new(responses: Vec<Result<OracleResponse, OracleError>>) -> Self {
            Self {
                responses: Arc::new(Mutex::new(responses.into())),
                calls: Arc::new(AtomicUsize::new(0)),
                last_request: Arc::new(Mutex::new(None)),
                gate: None,
            }
        }

        fn gated(responses: Vec<Result<OracleResponse, OracleError>>) -> (Self, Arc<Notify>) {
            let gate = Arc::new(Notify::new());
            let mut oracle = Self::new(responses);
            oracle.gate = Some(Arc::clone(&gate));
            (oracle, gate)
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_request(&self) -> Option<ReconciliationRequest> {
            self.last_request.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReasoningOracle for ScriptedOracle {
        async fn reconcile(
            &self,
            request: ReconciliationRequest,
        ) -> Result<OracleResponse, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("oracle script exhausted")
        }
    }

    fn failure() -> Result<OracleResponse, OracleError> {
        Err(OracleError::Unavailable {
            message: "timeout".to_string(),
        })
    }

    fn task_response(title: &str, status: TaskStatus) -> Result<OracleResponse, OracleError> {
        Ok(OracleResponse {
            tasks: vec![ProposedTask {
                title: title.to_string(),
                description: None,
                status,
                priority: Priority::High,
                assignee: None,
                deadline: None,
            }],
            milestones: vec![],
            plan_graph: "gantt".to_string(),
            rationale: "scripted".to_string(),
            warnings: vec![],
        })
    }

    fn context_delta(group: &GroupId) -> ContextDelta {
        ContextDelta {
            group_id: group.clone(),
            full_context: "ship v1 by october".to_string(),
            at: Utc::now(),
        }
    }

    fn message(group: &GroupId, text: &str) -> MessageDelta {
        MessageDelta {
            group_id: group.clone(),
            author: "alice@chat".to_string(),
            author_name: Some("Alice".to_string()),
            text: text.to_string(),
            at: Utc::now(),
            is_from_me: false,
        }
    }

    async fn setup(
        oracle: ScriptedOracle,
    ) -> (PlanEngine<DbStore, ScriptedOracle>, GroupId, ProjectId) {
        let store = DbStore::new(with_test_db().unwrap());
        let group = GroupId::new("g1");
        let project = store
            .projects()
            .create(CreateProjectInput {
                group_id: group.clone(),
                name: "Demo".to_string(),
            })
            .unwrap();
        let engine = PlanEngine::new(store, oracle, EngineConfig::default());
        (engine, group, project.id)
    }

    async fn settle(secs: u64) {
        tokio::time::sleep(Duration::from_secs(secs)).await;
        yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_coalesces_a_burst_into_one_call() {
        let oracle = ScriptedOracle::new(vec![task_response("Write spec", TaskStatus::Todo)]);
        let (engine, group, project_id) = setup(oracle.clone()).await;

        engine.on_context_delta(context_delta(&group)).await;
        for text in ["kickoff", "deadline moved", "alice takes the spec"] {
            tokio::time::sleep(Duration::from_secs(1)).await;
            engine.on_message_delta(message(&group, text)).await;
        }
        assert_eq!(oracle.calls(), 0);

        settle(9).await;
        assert_eq!(oracle.calls(), 1);

        let store = engine.store().lock().await;
        let project = store.projects().get(&project_id).unwrap().unwrap();
        assert_eq!(project.version, 1);
        drop(store);
        assert_eq!(engine.state(&group).queue_depth, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn self_messages_never_reach_log_queue_or_oracle() {
        let oracle = ScriptedOracle::new(vec![task_response("Write spec", TaskStatus::Todo)]);
        let (engine, group, _) = setup(oracle.clone()).await;

        let mut mine = message(&group, "note to self");
        mine.is_from_me = true;
        engine.on_message_delta(mine).await;
        assert_eq!(engine.state(&group).queue_depth, 0);

        engine.on_context_delta(context_delta(&group)).await;
        engine.on_message_delta(message(&group, "from alice")).await;
        engine.force_refresh(&group).await;

        let request = oracle.last_request().unwrap();
        assert_eq!(request.recent_messages.len(), 1);
        assert_eq!(request.recent_messages[0].text, "from alice");

        let store = engine.store().lock().await;
        let log = store.event_log().list(&group, 100).unwrap();
        assert_eq!(log.len(), 2);
        assert!(!log.iter().any(|e| e.payload.to_string().contains("note to self")));
    }

    #[tokio::test(start_paused = true)]
    async fn force_refresh_with_empty_queue_is_a_noop() {
        let oracle = ScriptedOracle::new(vec![]);
        let (engine, group, _) = setup(oracle.clone()).await;

        engine.force_refresh(&group).await;
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_context_is_a_silent_noop_that_keeps_the_queue() {
        let oracle = ScriptedOracle::new(vec![]);
        let (engine, group, _) = setup(oracle.clone()).await;

        engine.on_message_delta(message(&group, "hello")).await;
        engine.force_refresh(&group).await;

        assert_eq!(oracle.calls(), 0);
        let state = engine.state(&group);
        assert_eq!(state.queue_depth, 1);
        assert_eq!(state.consecutive_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_refresh_is_single_flight() {
        let (oracle, gate) = ScriptedOracle::gated(vec![task_response("Write spec", TaskStatus::Todo)]);
        let (engine, group, _) = setup(oracle.clone()).await;

        engine.on_context_delta(context_delta(&group)).await;
        let background = {
            let engine = engine.clone();
            let group = group.clone();
            tokio::spawn(async move { engine.force_refresh(&group).await })
        };
        for _ in 0..10 {
            yield_now().await;
        }
        assert!(engine.state(&group).processing);

        engine.force_refresh(&group).await;
        assert_eq!(oracle.calls(), 1);

        gate.notify_one();
        background.await.unwrap();
        assert_eq!(oracle.calls(), 1);
        assert!(!engine.state(&group).processing);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limiter_reschedules_instead_of_dropping() {
        let oracle = ScriptedOracle::new(vec![
            task_response("Write spec", TaskStatus::Todo),
            task_response("Write spec", TaskStatus::Done),
        ]);
        let (engine, group, project_id) = setup(oracle.clone()).await;

        engine.on_context_delta(context_delta(&group)).await;
        engine.force_refresh(&group).await;
        assert_eq!(oracle.calls(), 1);

        engine.on_message_delta(message(&group, "done already")).await;
        engine.force_refresh(&group).await;
        assert_eq!(oracle.calls(), 1);
        assert_eq!(engine.state(&group).queue_depth, 1);

        settle(6).await;
        assert_eq!(oracle.calls(), 2);

        let store = engine.store().lock().await;
        let project = store.projects().get(&project_id).unwrap().unwrap();
        assert_eq!(project.version, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn circuit_trips_after_three_failures_and_recovers() {
        let oracle = ScriptedOracle::new(vec![
            failure(),
            failure(),
            failure(),
            task_response("Write spec", TaskStatus::Todo),
        ]);
        let (engine, group, project_id) = setup(oracle.clone()).await;
        let mut notifications = engine.subscribe();

        engine.on_context_delta(context_delta(&group)).await;
        for _ in 0..3 {
            engine.force_refresh(&group).await;
        }
        assert_eq!(oracle.calls(), 3);
        let state = engine.state(&group);
        assert!(state.circuit_open);
        assert_eq!(state.consecutive_failures, 3);

        let paused = notifications.try_recv().unwrap();
        assert!(matches!(
            paused.body,
            NotificationBody::ProcessingPaused {
                consecutive_failures: 3,
                retry_in_ms: 60_000,
            }
        ));

        // Inside the backoff window the oracle is not consulted.
        engine.force_refresh(&group).await;
        assert_eq!(oracle.calls(), 3);
        assert!(matches!(
            notifications.try_recv().unwrap().body,
            NotificationBody::ProcessingPaused { .. }
        ));

        {
            let store = engine.store().lock().await;
            let project = store.projects().get(&project_id).unwrap().unwrap();
            assert_eq!(project.version, 0);
        }

        settle(61).await;
        engine.force_refresh(&group).await;
        assert_eq!(oracle.calls(), 4);
        let state = engine.state(&group);
        assert!(!state.circuit_open);
        assert_eq!(state.consecutive_failures, 0);

        let updated = notifications.try_recv().unwrap();
        assert!(matches!(
            updated.body,
            NotificationBody::PlanUpdated { version: 1, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn midflight_events_survive_a_successful_run() {
        let (oracle, gate) = ScriptedOracle::gated(vec![
            task_response("Write spec", TaskStatus::Todo),
            task_response("Write spec", TaskStatus::Done),
        ]);
        let (engine, group, project_id) = setup(oracle.clone()).await;

        engine.on_context_delta(context_delta(&group)).await;
        let background = {
            let engine = engine.clone();
            let group = group.clone();
            tokio::spawn(async move { engine.force_refresh(&group).await })
        };
        for _ in 0..10 {
            yield_now().await;
        }
        assert!(engine.state(&group).processing);

        engine
            .on_message_delta(message(&group, "late-breaking"))
            .await;
        gate.notify_one();
        background.await.unwrap();
        assert_eq!(oracle.calls(), 1);
        assert_eq!(engine.state(&group).queue_depth, 1);

        gate.notify_one();
        settle(30).await;
        assert_eq!(oracle.calls(), 2);
        assert_eq!(engine.state(&group).queue_depth, 0);

        let store = engine.store().lock().await;
        let project = store.projects().get(&project_id).unwrap().unwrap();
        assert_eq!(project.version, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_attempt_retries_without_new_traffic() {
        let oracle = ScriptedOracle::new(vec![
            failure(),
            task_response("Write spec", TaskStatus::Todo),
        ]);
        let (engine, group, project_id) = setup(oracle.clone()).await;

        engine.on_context_delta(context_delta(&group)).await;
        engine.force_refresh(&group).await;
        assert_eq!(oracle.calls(), 1);
        assert_eq!(engine.state(&group).consecutive_failures, 1);

        settle(600).await;
        assert_eq!(oracle.calls(), 2);
        let state = engine.state(&group);
        assert_eq!(state.consecutive_failures, 0);
        assert_eq!(state.queue_depth, 0);

        let store = engine.store().lock().await;
        let project = store.projects().get(&project_id).unwrap().unwrap();
        assert_eq!(project.version, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn open_circuit_self_heals_after_backoff() {
        let oracle = ScriptedOracle::new(vec![
            failure(),
            failure(),
            failure(),
            task_response("Write spec", TaskStatus::Todo),
        ]);
        let (engine, group, project_id) = setup(oracle.clone()).await;

        engine.on_context_delta(context_delta(&group)).await;
        for _ in 0..3 {
            engine.force_refresh(&group).await;
        }
        assert_eq!(oracle.calls(), 3);
        assert!(engine.state(&group).circuit_open);

        // No further ingestion; the backoff timer alone drives the retry.
        settle(61).await;
        assert_eq!(oracle.calls(), 4);
        let state = engine.state(&group);
        assert!(!state.circuit_open);
        assert_eq!(state.consecutive_failures, 0);
        assert_eq!(state.queue_depth, 0);

        let store = engine.store().lock().await;
        let project = store.projects().get(&project_id).unwrap().unwrap();
        assert_eq!(project.version, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn create_then_update_then_idempotent_repeat() {
        let oracle = ScriptedOracle::new(vec![
            task_response("Write spec", TaskStatus::Todo),
            task_response("Write spec", TaskStatus::Done),
            task_response("Write spec", TaskStatus::Done),
        ]);
        let (engine, group, project_id) = setup(oracle.clone()).await;

        engine.on_context_delta(context_delta(&group)).await;
        engine.force_refresh(&group).await;

        let task = {
            let store = engine.store().lock().await;
            let tasks = store
                .tasks()
                .list(TaskFilter {
                    project_id: Some(project_id.clone()),
                    status: None,
                })
                .unwrap();
            assert_eq!(tasks.len(), 1);
            assert_eq!(tasks[0].title, "Write spec");
            assert_eq!(tasks[0].status, TaskStatus::Todo);
            assert_eq!(
                store.projects().get(&project_id).unwrap().unwrap().version,
                1
            );
            let history = store.history().list(&tasks[0].id).unwrap();
            assert_eq!(history.len(), 1);
            assert!(matches!(history[0].change, TaskChange::Created { .. }));
            tasks.into_iter().next().unwrap()
        };

        settle(6).await;
        engine.on_message_delta(message(&group, "spec is done")).await;
        engine.force_refresh(&group).await;

        {
            let store = engine.store().lock().await;
            let tasks = store
                .tasks()
                .list(TaskFilter {
                    project_id: Some(project_id.clone()),
                    status: None,
                })
                .unwrap();
            assert_eq!(tasks.len(), 1);
            assert_eq!(tasks[0].status, TaskStatus::Done);
            assert_eq!(
                store.projects().get(&project_id).unwrap().unwrap().version,
                2
            );
            let history = store.history().list(&task.id).unwrap();
            assert_eq!(history.len(), 2);
            match &history[1].change {
                TaskChange::Updated { fields } => {
                    assert_eq!(fields.status, Some(TaskStatus::Done));
                    assert!(fields.priority.is_none());
                    assert!(fields.assignee.is_none());
                    assert!(fields.deadline.is_none());
                    assert!(fields.description.is_none());
                }
                TaskChange::Created { .. } => panic!("expected an update record"),
            }
        }

        // An identical proposal bumps the plan version but writes no
        // task changes and no history.
        settle(6).await;
        engine.on_message_delta(message(&group, "nothing new")).await;
        engine.force_refresh(&group).await;

        let store = engine.store().lock().await;
        assert_eq!(
            store.projects().get(&project_id).unwrap().unwrap().version,
            3
        );
        assert_eq!(store.history().list(&task.id).unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn milestones_merge_alongside_tasks() {
        let mut response = task_response("Write spec", TaskStatus::Todo).unwrap();
        response.milestones.push(pf_core::oracle::ProposedMilestone {
            title: "Launch".to_string(),
            date: chrono::NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
            status: pf_core::types::MilestoneStatus::Upcoming,
            description: None,
        });
        let oracle = ScriptedOracle::new(vec![Ok(response)]);
        let (engine, group, project_id) = setup(oracle.clone()).await;

        engine.on_context_delta(context_delta(&group)).await;
        engine.force_refresh(&group).await;

        let store = engine.store().lock().await;
        let milestones = store
            .milestones()
            .list(MilestoneFilter {
                project_id: Some(project_id),
                status: None,
            })
            .unwrap();
        assert_eq!(milestones.len(), 1);
        assert_eq!(milestones[0].title, "Launch");
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending_timers() {
        let oracle = ScriptedOracle::new(vec![]);
        let (engine, group, _) = setup(oracle.clone()).await;

        engine.on_context_delta(context_delta(&group)).await;
        engine.shutdown();
        settle(10).await;
        assert_eq!(oracle.calls(), 0);
        assert_eq!(engine.state(&group).queue_depth, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_group_state_is_empty() {
        let oracle = ScriptedOracle::new(vec![]);
        let (engine, _, _) = setup(oracle).await;
        assert_eq!(
            engine.state(&GroupId::new("nobody")),
            GroupSnapshot {
                queue_depth: 0,
                processing: false,
                consecutive_failures: 0,
                last_error: None,
                circuit_open: false,
            }
        );
    }
}
