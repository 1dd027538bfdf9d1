//! # Job Worker
//!
//! Background loop that executes queued tasks. Each cycle claims the oldest
//! `queued` task (moving it to `running`), simulates the work by sleeping
//! `|params.wait|` seconds and records the outcome: a non-negative wait
//! succeeds, a negative one fails. Tasks canceled while running keep their
//! `canceled` status.
//!
//! Several workers may share one database; claiming uses `SKIP LOCKED` so a
//! task is never picked up twice.

use sqlx::PgPool;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::WorkerConfig;
use crate::constants::TaskStatus;
use crate::logging::{log_error, log_task_operation};
use crate::models::Task;

/// Pause after a database error before polling again
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Result of a single worker cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing was queued
    Idle,
    /// A task ran; `status` is `None` when it was canceled meanwhile
    Processed {
        task_id: Uuid,
        status: Option<TaskStatus>,
    },
}

/// Outcome of a simulated execution for a given `wait`
pub fn simulated_outcome(wait: i64) -> (TaskStatus, Option<String>) {
    if wait >= 0 {
        (TaskStatus::Succeeded, None)
    } else {
        (
            TaskStatus::Failed,
            Some(format!("Failed after waiting {} seconds", wait.unsigned_abs())),
        )
    }
}

#[derive(Debug)]
pub struct JobWorker {
    pool: PgPool,
    poll_interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl JobWorker {
    pub fn new(pool: PgPool, config: &WorkerConfig, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            pool,
            poll_interval: config.poll_interval(),
            shutdown,
        }
    }

    fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Claim and execute at most one task
    pub async fn run_once(&self) -> Result<CycleOutcome, sqlx::Error> {
        let Some(task) = Task::claim_next(&self.pool).await? else {
            return Ok(CycleOutcome::Idle);
        };

        let wait = task.wait_seconds();
        log_task_operation("claim", Some(task.id), TaskStatus::Running.as_str(), None);
        debug!(task_id = %task.id, wait, "Executing task");

        tokio::time::sleep(Duration::from_secs(wait.unsigned_abs())).await;

        let (status, message) = simulated_outcome(wait);
        let finished = Task::finish(&self.pool, &task, status, message).await?;
        match &finished {
            Some(done) => log_task_operation("finish", Some(done.id), &done.status, done.error.as_deref()),
            None => info!(task_id = %task.id, "Task was canceled or reclaimed while running"),
        }

        Ok(CycleOutcome::Processed {
            task_id: task.id,
            status: finished.and_then(|t| t.task_status()),
        })
    }

    /// Poll until shutdown is signalled. Shutdown is observed between tasks.
    pub async fn run(mut self) {
        info!(poll_interval_secs = self.poll_interval.as_secs(), "Job worker started");

        while !self.shutdown_requested() {
            let pause = match self.run_once().await {
                Ok(CycleOutcome::Processed { .. }) => continue,
                Ok(CycleOutcome::Idle) => self.poll_interval,
                Err(e) => {
                    log_error("worker", "run_once", &e.to_string(), None);
                    ERROR_BACKOFF
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                changed = self.shutdown.changed() => {
                    if changed.is_err() {
                        warn!("Worker shutdown channel closed");
                        break;
                    }
                }
            }
        }

        info!("Job worker stopped");
    }
}

/// Running worker plus the means to stop it
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Spawn a [`JobWorker`] on the current runtime
    pub fn spawn(pool: PgPool, config: &WorkerConfig) -> Self {
        let (shutdown, receiver) = watch::channel(false);
        let worker = JobWorker::new(pool, config, receiver);
        let join = tokio::spawn(worker.run());
        Self { shutdown, join }
    }

    /// Signal shutdown and wait for the current task to finish
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.join.await {
            error!(error = %e, "Job worker task panicked");
        }
    }
}
