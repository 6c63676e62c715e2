//! Priority task scheduler.
//!
//! A single dispatcher task claims items from the ready queue under the
//! scheduler lock and hands each one to a worker task holding a semaphore
//! permit. Workers report back under the same lock, so every state change
//! of a work item is serialized.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, Semaphore, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shivai_config::SchedulerConfig;
use shivai_context::ContextStore;
use shivai_protocols::error::panic_message;
use shivai_protocols::{
    HandlerResolver, HistoryRecord, Intent, Outcome, OutcomeStatus, TaskError,
};

use crate::backoff::BackoffPolicy;
use crate::clock::{Clock, SystemClock};
use crate::item::{WorkHandle, WorkItem, WorkState};
use crate::queue::ReadyQueue;

#[path = "worker.rs"]
mod worker;

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;

/// Called once with the final snapshot of a work item.
pub type CompletionCallback = Box<dyn FnOnce(&WorkItem) + Send + 'static>;

/// Scheduler counters and current load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub submitted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub cancelled: u64,
    /// Attempts that were scheduled again after a failure.
    pub retried: u64,
    /// Attempts that hit their timeout.
    pub timed_out: u64,
    pub queued: usize,
    pub running: usize,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
    retried: AtomicU64,
    timed_out: AtomicU64,
}

struct Active {
    item: WorkItem,
    cancel: CancellationToken,
    callbacks: Vec<CompletionCallback>,
    done: watch::Sender<Option<Outcome>>,
}

/// A terminal item whose callbacks still have to run.
struct Finished {
    item: WorkItem,
    callbacks: Vec<CompletionCallback>,
}

struct State {
    active: HashMap<Uuid, Active>,
    finished: HashMap<Uuid, WorkItem>,
    finished_order: VecDeque<Uuid>,
    queue: ReadyQueue,
    running: usize,
    accepting: bool,
}

struct Inner {
    config: SchedulerConfig,
    state: Mutex<State>,
    resolver: Arc<dyn HandlerResolver>,
    context: Arc<ContextStore>,
    clock: Arc<dyn Clock>,
    backoff: BackoffPolicy,
    permits: Arc<Semaphore>,
    /// Queue changed: new item or retry scheduled.
    wake: Notify,
    /// Running count dropped to zero.
    idle: Notify,
    /// Stops the dispatcher; every item's cancel token is a child.
    stop: CancellationToken,
    counters: Counters,
}

/// Priority scheduler with bounded workers, retries and cancellation.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
    dispatcher: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Scheduler {
    pub fn new(
        config: SchedulerConfig,
        resolver: Arc<dyn HandlerResolver>,
        context: Arc<ContextStore>,
    ) -> Self {
        Self::with_clock(config, resolver, context, Arc::new(SystemClock::new()))
    }

    /// Create a scheduler whose retry eligibility follows `clock`.
    pub fn with_clock(
        config: SchedulerConfig,
        resolver: Arc<dyn HandlerResolver>,
        context: Arc<ContextStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let workers = config.max_concurrent_workers.max(1);
        let inner = Inner {
            backoff: BackoffPolicy::from_config(&config),
            permits: Arc::new(Semaphore::new(workers)),
            config,
            state: Mutex::new(State {
                active: HashMap::new(),
                finished: HashMap::new(),
                finished_order: VecDeque::new(),
                queue: ReadyQueue::new(),
                running: 0,
                accepting: true,
            }),
            resolver,
            context,
            clock,
            wake: Notify::new(),
            idle: Notify::new(),
            stop: CancellationToken::new(),
            counters: Counters::default(),
        };
        Self {
            inner: Arc::new(inner),
            dispatcher: Arc::new(Mutex::new(None)),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// A work item carrying the configured timeout and attempt limit.
    pub fn work_item(&self, intent: Intent, capability: impl Into<String>) -> WorkItem {
        WorkItem::new(intent, capability)
            .with_timeout(self.inner.config.task_timeout())
            .with_max_attempts(self.inner.config.default_max_attempts)
    }

    /// Spawn the dispatcher. Calling it again has no effect.
    pub fn start(&self) {
        let mut dispatcher = self.dispatcher.lock();
        if dispatcher.is_some() {
            return;
        }
        info!(
            "Scheduler started with {} workers",
            self.inner.config.max_concurrent_workers.max(1)
        );
        *dispatcher = Some(tokio::spawn(self.inner.clone().dispatch_loop()));
    }

    pub fn is_accepting(&self) -> bool {
        self.inner.state.lock().accepting
    }

    /// Queue an item for dispatch.
    pub fn submit(&self, mut item: WorkItem) -> Result<WorkHandle, TaskError> {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;

        if !state.accepting {
            return Err(TaskError::NotRunning);
        }
        let max = self.inner.config.max_queue_size;
        if max > 0 && state.queue.len() >= max {
            warn!("Work queue full ({} items), rejecting {}", max, item.id);
            return Err(TaskError::QueueFull);
        }

        if state.active.contains_key(&item.id) || state.finished.contains_key(&item.id) {
            item.id = Uuid::new_v4();
        }
        item.state = WorkState::Queued;
        item.transitions = vec![WorkState::Queued];
        item.attempt_count = 0;
        item.last_error = None;
        item.outcome = None;
        item.finished_at = None;
        item.eligible_at = self.inner.clock.now();

        let handle = item.handle();
        debug!(
            "Submitted work item {} ({} -> {}, priority {})",
            item.id,
            item.intent.category(),
            item.target_capability,
            item.priority
        );
        state.queue.push(item.id, item.priority, item.eligible_at);
        let (done, _) = watch::channel(None);
        state.active.insert(
            item.id,
            Active {
                item,
                cancel: self.inner.stop.child_token(),
                callbacks: Vec::new(),
                done,
            },
        );
        drop(guard);

        self.inner.counters.submitted.fetch_add(1, Ordering::Relaxed);
        self.inner.wake.notify_one();
        Ok(handle)
    }

    /// Request cancellation.
    ///
    /// A queued item is finalized `Cancelled` immediately. A running item is
    /// flagged and finalized once its handler returns or times out. Returns
    /// `false` for unknown or already finished items.
    pub fn cancel(&self, handle: WorkHandle) -> bool {
        let id = handle.id();
        let finished = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let Some(active) = state.active.get_mut(&id) else {
                return false;
            };
            active.cancel.cancel();

            if active.item.state == WorkState::Running {
                debug!("Cancellation requested for running item {}", id);
                return true;
            }

            active.item.transition(WorkState::Cancelled);
            let attempts = active.item.attempt_count;
            state.queue.remove(id);
            self.inner
                .finish_locked(state, id, Outcome::Cancelled { attempts })
        };

        if let Some(finished) = finished {
            self.inner.deliver(finished);
        }
        true
    }

    /// Wait up to `timeout` for the item's final outcome.
    pub async fn await_result(
        &self,
        handle: WorkHandle,
        timeout: Duration,
    ) -> Result<Outcome, TaskError> {
        let id = handle.id();
        let mut done = {
            let state = self.inner.state.lock();
            if let Some(item) = state.finished.get(&id) {
                return item.outcome.clone().ok_or(TaskError::UnknownHandle(id));
            }
            match state.active.get(&id) {
                Some(active) => active.done.subscribe(),
                None => return Err(TaskError::UnknownHandle(id)),
            }
        };

        match tokio::time::timeout(timeout, done.wait_for(Option::is_some)).await {
            Ok(Ok(outcome)) => outcome.clone().ok_or(TaskError::UnknownHandle(id)),
            Ok(Err(_)) => self
                .status(handle)
                .and_then(|item| item.outcome)
                .ok_or(TaskError::UnknownHandle(id)),
            Err(_) => Err(TaskError::AwaitTimeout(timeout)),
        }
    }

    /// Register a completion callback.
    ///
    /// Runs exactly once: on the terminal transition, or right away if the
    /// item has already finished.
    pub fn on_complete<F>(&self, handle: WorkHandle, callback: F) -> Result<(), TaskError>
    where
        F: FnOnce(&WorkItem) + Send + 'static,
    {
        let id = handle.id();
        let item = {
            let mut state = self.inner.state.lock();
            if let Some(active) = state.active.get_mut(&id) {
                active.callbacks.push(Box::new(callback));
                return Ok(());
            }
            match state.finished.get(&id) {
                Some(item) => item.clone(),
                None => return Err(TaskError::UnknownHandle(id)),
            }
        };
        run_callback(Box::new(callback), &item);
        Ok(())
    }

    /// Snapshot of a live or retained item.
    pub fn status(&self, handle: WorkHandle) -> Option<WorkItem> {
        let state = self.inner.state.lock();
        state
            .active
            .get(&handle.id())
            .map(|a| a.item.clone())
            .or_else(|| state.finished.get(&handle.id()).cloned())
    }

    pub fn stats(&self) -> SchedulerStats {
        let (queued, running) = {
            let state = self.inner.state.lock();
            (state.queue.len(), state.running)
        };
        let c = &self.inner.counters;
        SchedulerStats {
            submitted: c.submitted.load(Ordering::Relaxed),
            succeeded: c.succeeded.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            cancelled: c.cancelled.load(Ordering::Relaxed),
            retried: c.retried.load(Ordering::Relaxed),
            timed_out: c.timed_out.load(Ordering::Relaxed),
            queued,
            running,
        }
    }

    /// Stop dispatching, cancel queued items and wait up to `grace` for
    /// running ones.
    pub async fn shutdown(&self, grace: Duration) {
        let finished = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            state.accepting = false;

            let mut finished = Vec::new();
            for id in state.queue.drain() {
                let attempts = match state.active.get_mut(&id) {
                    Some(active) => {
                        active.item.transition(WorkState::Cancelled);
                        active.item.attempt_count
                    }
                    None => continue,
                };
                if let Some(f) = self
                    .inner
                    .finish_locked(state, id, Outcome::Cancelled { attempts })
                {
                    finished.push(f);
                }
            }
            finished
        };

        if !finished.is_empty() {
            info!("Cancelled {} queued items on shutdown", finished.len());
        }
        for f in finished {
            self.inner.deliver(f);
        }

        self.inner.stop.cancel();

        let deadline = tokio::time::Instant::now().checked_add(grace);
        loop {
            let idle = self.inner.idle.notified();
            let running = self.inner.state.lock().running;
            if running == 0 {
                break;
            }
            let expired = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, idle).await.is_err(),
                None => {
                    idle.await;
                    false
                }
            };
            if expired {
                warn!("{} items still running after shutdown grace period", running);
                break;
            }
        }

        let dispatcher = self.dispatcher.lock().take();
        if let Some(dispatcher) = dispatcher {
            let _ = dispatcher.await;
        }
        info!("Scheduler stopped");
    }
}

impl Inner {
    /// Move an active item to its terminal outcome.
    ///
    /// Records history and wakes result waiters; the returned callbacks must
    /// be run by the caller after releasing the lock.
    fn finish_locked(&self, state: &mut State, id: Uuid, outcome: Outcome) -> Option<Finished> {
        let mut active = state.active.remove(&id)?;
        let status = outcome.status();
        active.item.finish(outcome.clone());

        let counter = match status {
            OutcomeStatus::Succeeded => &self.counters.succeeded,
            OutcomeStatus::Failed => &self.counters.failed,
            OutcomeStatus::Cancelled => &self.counters.cancelled,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        self.context.record_history(HistoryRecord::new(
            id,
            active.item.intent.category(),
            status,
            outcome.failure_kind(),
        ));

        let retention = self.config.completed_retention;
        if retention > 0 {
            state.finished.insert(id, active.item.clone());
            state.finished_order.push_back(id);
            while state.finished_order.len() > retention {
                if let Some(evicted) = state.finished_order.pop_front() {
                    state.finished.remove(&evicted);
                }
            }
        }

        debug!("Work item {} finished: {}", id, active.item.state);
        active.done.send_replace(Some(outcome));

        Some(Finished {
            item: active.item,
            callbacks: active.callbacks,
        })
    }

    fn deliver(&self, finished: Finished) {
        for callback in finished.callbacks {
            run_callback(callback, &finished.item);
        }
    }
}

fn run_callback(callback: CompletionCallback, item: &WorkItem) {
    if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(|| callback(item))) {
        warn!(
            "Completion callback for {} panicked: {}",
            item.id,
            panic_message(panic.as_ref())
        );
    }
}
