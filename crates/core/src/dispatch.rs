//! Acknowledge-then-dispatch hand-off.
//!
//! The webhook path submits a [`Command`] with a non-blocking call and returns. A
//! background loop takes each submission, decodes the JSON payload and runs it on a
//! [`CommandWorker`] in its own task, under a per-attempt timeout. Failed attempts
//! are retried a bounded number of times; an attempt that would start after the
//! maximum event age is dropped. Delivery is at-least-once: there is no
//! deduplication, so a retried command can produce a second announcement.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::DispatchConfig;
use crate::domain::command::Command;
use crate::errors::{DispatchError, WorkerError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchPolicy {
    /// Retries after the first attempt.
    pub retry_attempts: u32,
    pub max_event_age: Duration,
    pub worker_timeout: Duration,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            retry_attempts: 2,
            max_event_age: Duration::from_secs(120),
            worker_timeout: Duration::from_secs(30),
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(30_000),
        }
    }
}

impl From<&DispatchConfig> for DispatchPolicy {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            retry_attempts: config.retry_attempts,
            max_event_age: Duration::from_secs(config.max_event_age_secs),
            worker_timeout: Duration::from_secs(config.worker_timeout_secs),
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
        }
    }
}

impl DispatchPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u32 << exponent;
        self.base_delay.saturating_mul(multiplier).min(self.max_delay)
    }
}

/// The slow path. One call is one attempt; returning an error asks for a retry.
#[async_trait]
pub trait CommandWorker: Send + Sync {
    async fn execute(&self, command: Command) -> Result<(), WorkerError>;
}

/// Accept-for-later-execution. Must not block.
pub trait TaskDispatcher: Send + Sync {
    fn dispatch(&self, command: &Command) -> Result<DispatchReceipt, DispatchError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchReceipt {
    pub task_id: String,
}

#[derive(Debug, Default)]
struct DispatchCounters {
    accepted: AtomicU64,
    completed: AtomicU64,
    failed_attempts: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub accepted: u64,
    pub completed: u64,
    pub failed_attempts: u64,
    pub dropped: u64,
}

struct QueuedTask {
    task_id: String,
    payload: String,
    enqueued_at: Instant,
}

/// Bounded in-process queue feeding a worker loop.
#[derive(Clone)]
pub struct QueuedDispatcher {
    sender: mpsc::Sender<QueuedTask>,
    counters: Arc<DispatchCounters>,
}

/// Handle on the background loop started by [`QueuedDispatcher::spawn`].
pub struct DispatchRuntime {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl QueuedDispatcher {
    pub fn spawn(
        worker: Arc<dyn CommandWorker>,
        policy: DispatchPolicy,
        capacity: usize,
    ) -> (Self, DispatchRuntime) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let counters = Arc::new(DispatchCounters::default());

        let handle = tokio::spawn(run_dispatch_loop(
            receiver,
            shutdown_rx,
            worker,
            Arc::new(policy),
            counters.clone(),
        ));

        (Self { sender, counters }, DispatchRuntime { shutdown: shutdown_tx, handle })
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            accepted: self.counters.accepted.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed_attempts: self.counters.failed_attempts.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub fn queued(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }
}

impl TaskDispatcher for QueuedDispatcher {
    fn dispatch(&self, command: &Command) -> Result<DispatchReceipt, DispatchError> {
        let payload = serde_json::to_string(command)
            .map_err(|error| DispatchError::Serialize(error.to_string()))?;
        let task_id = Uuid::new_v4().to_string();

        self.sender
            .try_send(QueuedTask { task_id: task_id.clone(), payload, enqueued_at: Instant::now() })
            .map_err(|error| match error {
                mpsc::error::TrySendError::Full(_) => DispatchError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => DispatchError::Closed,
            })?;

        self.counters.accepted.fetch_add(1, Ordering::Relaxed);
        info!(
            event_name = "dispatch.task.accepted",
            task_id = %task_id,
            correlation_id = %command.correlation_id(),
            group_id = %command.channel_id,
            "command accepted for async execution"
        );
        Ok(DispatchReceipt { task_id })
    }
}

impl DispatchRuntime {
    /// Stops accepting new tasks, drains what is queued and waits up to `grace` for
    /// in-flight attempts.
    pub async fn shutdown(self, grace: Duration) {
        let _ = self.shutdown.send(());
        if tokio::time::timeout(grace, self.handle).await.is_err() {
            warn!(
                event_name = "dispatch.shutdown.timeout",
                grace_secs = grace.as_secs(),
                "in-flight workers did not finish before the shutdown grace period"
            );
        }
    }
}

async fn run_dispatch_loop(
    mut receiver: mpsc::Receiver<QueuedTask>,
    mut shutdown: oneshot::Receiver<()>,
    worker: Arc<dyn CommandWorker>,
    policy: Arc<DispatchPolicy>,
    counters: Arc<DispatchCounters>,
) {
    let mut in_flight = JoinSet::new();
    let mut closing = false;

    loop {
        tokio::select! {
            _ = &mut shutdown, if !closing => {
                closing = true;
                receiver.close();
                debug!(event_name = "dispatch.loop.closing", "dispatch queue closed");
            }
            task = receiver.recv() => match task {
                Some(task) => {
                    in_flight.spawn(run_task(
                        task,
                        worker.clone(),
                        policy.clone(),
                        counters.clone(),
                    ));
                }
                None => break,
            },
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(join_error) = joined {
                    error!(
                        event_name = "dispatch.task.panicked",
                        error = %join_error,
                        "dispatch task terminated abnormally"
                    );
                }
            }
        }
    }

    while in_flight.join_next().await.is_some() {}
    debug!(event_name = "dispatch.loop.stopped", "dispatch loop stopped");
}

async fn run_task(
    task: QueuedTask,
    worker: Arc<dyn CommandWorker>,
    policy: Arc<DispatchPolicy>,
    counters: Arc<DispatchCounters>,
) {
    let command = match serde_json::from_str::<Command>(&task.payload) {
        Ok(command) => command,
        Err(error) => {
            counters.dropped.fetch_add(1, Ordering::Relaxed);
            error!(
                event_name = "dispatch.task.undecodable",
                task_id = %task.task_id,
                error = %error,
                "dropping task with undecodable payload"
            );
            return;
        }
    };

    for attempt in 0..=policy.retry_attempts {
        let age = task.enqueued_at.elapsed();
        if age > policy.max_event_age {
            counters.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(
                event_name = "dispatch.task.expired",
                task_id = %task.task_id,
                correlation_id = %command.correlation_id(),
                attempt,
                age_ms = u64::try_from(age.as_millis()).unwrap_or(u64::MAX),
                "dropping task older than the maximum event age"
            );
            return;
        }

        let outcome = tokio::time::timeout(policy.worker_timeout, worker.execute(command.clone()))
            .await
            .unwrap_or(Err(WorkerError::Timeout { secs: policy.worker_timeout.as_secs() }));

        match outcome {
            Ok(()) => {
                counters.completed.fetch_add(1, Ordering::Relaxed);
                info!(
                    event_name = "dispatch.task.completed",
                    task_id = %task.task_id,
                    correlation_id = %command.correlation_id(),
                    attempt,
                    "worker completed"
                );
                return;
            }
            Err(worker_error) => {
                counters.failed_attempts.fetch_add(1, Ordering::Relaxed);
                warn!(
                    event_name = "dispatch.task.attempt_failed",
                    task_id = %task.task_id,
                    correlation_id = %command.correlation_id(),
                    attempt,
                    retry_attempts = policy.retry_attempts,
                    error = %worker_error,
                    "worker attempt failed"
                );
                if !worker_error.is_retryable() {
                    counters.dropped.fetch_add(1, Ordering::Relaxed);
                    return;
                }
            }
        }

        if attempt < policy.retry_attempts {
            let delay = policy.backoff(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    counters.dropped.fetch_add(1, Ordering::Relaxed);
    warn!(
        event_name = "dispatch.task.exhausted",
        task_id = %task.task_id,
        correlation_id = %command.correlation_id(),
        retry_attempts = policy.retry_attempts,
        "retries exhausted; dropping task"
    );
}
