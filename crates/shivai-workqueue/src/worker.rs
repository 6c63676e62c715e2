//! Dispatch loop and attempt execution.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::OwnedSemaphorePermit;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shivai_protocols::error::panic_message;
use shivai_protocols::{
    Failure, FailureKind, HandlerContext, Intent, Outcome, TaskError,
};

use super::{Finished, Inner, State};
use crate::item::WorkState;

/// One claimed attempt.
struct Job {
    id: Uuid,
    intent: Intent,
    capability: String,
    attempt: u32,
    timeout: Duration,
    cancel: CancellationToken,
}

enum Claim {
    Job(Job),
    /// Nothing eligible; the earliest queued eligibility, if any.
    Wait(Option<Duration>),
    /// Popped an id that is no longer active.
    Skip,
}

impl Inner {
    pub(super) async fn dispatch_loop(self: Arc<Self>) {
        loop {
            let permit = tokio::select! {
                _ = self.stop.cancelled() => break,
                permit = self.permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let claim = {
                let mut guard = self.state.lock();
                self.claim_next(&mut guard)
            };

            match claim {
                Claim::Job(job) => {
                    let inner = self.clone();
                    tokio::spawn(inner.execute(job, permit));
                }
                Claim::Skip => drop(permit),
                Claim::Wait(next) => {
                    drop(permit);
                    tokio::select! {
                        _ = self.stop.cancelled() => break,
                        _ = self.wake.notified() => {}
                        _ = self.sleep_until(next) => {}
                    }
                }
            }
        }
        debug!("Scheduler dispatcher exited");
    }

    async fn sleep_until(&self, deadline: Option<Duration>) {
        match deadline {
            Some(deadline) => self.clock.sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }

    fn claim_next(&self, state: &mut State) -> Claim {
        let Some(id) = state.queue.pop_ready(self.clock.now()) else {
            return Claim::Wait(state.queue.next_eligible_at());
        };
        let Some(active) = state.active.get_mut(&id) else {
            return Claim::Skip;
        };

        let item = &mut active.item;
        item.attempt_count += 1;
        item.transition(WorkState::Running);
        state.running += 1;

        debug!(
            "Dispatching {} to '{}' (attempt {}/{})",
            id, item.target_capability, item.attempt_count, item.max_attempts
        );
        Claim::Job(Job {
            id,
            intent: item.intent.clone(),
            capability: item.target_capability.clone(),
            attempt: item.attempt_count,
            timeout: item.timeout,
            cancel: active.cancel.clone(),
        })
    }

    async fn execute(self: Arc<Self>, job: Job, _permit: OwnedSemaphorePermit) {
        let result = self.run_attempt(&job).await;
        let finished = {
            let mut guard = self.state.lock();
            self.complete_attempt(&mut guard, &job, result)
        };
        if let Some(finished) = finished {
            self.deliver(finished);
        }
    }

    /// Resolve the capability and run the handler under the item's timeout.
    async fn run_attempt(&self, job: &Job) -> Result<serde_json::Value, TaskError> {
        if job.cancel.is_cancelled() {
            return Err(TaskError::Cancelled);
        }

        let resolved = self.resolver.resolve(&job.capability).map_err(|e| {
            warn!("No handler for '{}': {}", job.capability, e);
            TaskError::NoHandlerAvailable(job.capability.clone())
        })?;

        let ctx = HandlerContext::new(
            job.id,
            job.attempt,
            resolved.plugin,
            resolved.config,
            Arc::new(self.context.snapshot()),
            job.cancel.clone(),
        );
        let handler = resolved.handler;
        let intent = job.intent.clone();
        let task = tokio::spawn(async move { handler.handle(&intent, &ctx).await });
        let abort = task.abort_handle();

        match tokio::time::timeout(job.timeout, task).await {
            Ok(Ok(result)) => result.map_err(TaskError::from),
            Ok(Err(e)) if e.is_panic() => {
                let message = panic_message(e.into_panic().as_ref());
                error!("Handler for '{}' panicked: {}", job.capability, message);
                Err(TaskError::HandlerPanicked(message))
            }
            Ok(Err(_)) => Err(TaskError::Cancelled),
            Err(_) => {
                abort.abort();
                Err(TaskError::Timeout(job.timeout))
            }
        }
    }

    /// Record an attempt result: finalize, or schedule the retry.
    fn complete_attempt(
        &self,
        state: &mut State,
        job: &Job,
        result: Result<serde_json::Value, TaskError>,
    ) -> Option<Finished> {
        state.running = state.running.saturating_sub(1);
        if state.running == 0 {
            self.idle.notify_waiters();
        }

        let active = state.active.get_mut(&job.id)?;
        let cancelled = active.cancel.is_cancelled();
        let item = &mut active.item;
        let attempts = item.attempt_count;

        let outcome = match result {
            Ok(value) if !cancelled => {
                item.transition(WorkState::Succeeded);
                info!("Work item {} succeeded on attempt {}", job.id, attempts);
                Outcome::succeeded(value)
            }
            Ok(_) => {
                item.transition(WorkState::Cancelled);
                Outcome::Cancelled { attempts }
            }
            Err(err) => {
                let timed_out = matches!(err, TaskError::Timeout(_));
                if timed_out {
                    self.counters.timed_out.fetch_add(1, Ordering::Relaxed);
                }

                if cancelled || err.kind() == FailureKind::CancellationRequested {
                    item.transition(WorkState::Cancelled);
                    Outcome::Cancelled { attempts }
                } else {
                    item.transition(if timed_out {
                        WorkState::TimedOut
                    } else {
                        WorkState::Failed
                    });
                    item.last_error = Some(err.to_failure(attempts));

                    if err.is_retryable() && attempts < item.max_attempts {
                        let delay = self.backoff.delay(attempts);
                        item.eligible_at = self.clock.now().saturating_add(delay);
                        item.transition(WorkState::Queued);
                        state.queue.push_retry(job.id, item.priority, item.eligible_at);
                        self.counters.retried.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            "Attempt {}/{} of {} failed ({}), retrying in {:?}",
                            attempts, item.max_attempts, job.id, err, delay
                        );
                        self.wake.notify_one();
                        return None;
                    }

                    if timed_out {
                        item.transition(WorkState::Failed);
                    }
                    let failure = if err.is_retryable() && item.max_attempts > 1 {
                        Failure::new(
                            FailureKind::TaskRetryExhausted,
                            format!("gave up after {} attempts: {}", attempts, err),
                            attempts,
                        )
                        .with_cause(err.kind())
                    } else {
                        err.to_failure(attempts)
                    };
                    error!("Work item {} failed: {}", job.id, failure.message);
                    Outcome::failed(failure)
                }
            }
        };

        self.finish_locked(state, job.id, outcome)
    }
}
