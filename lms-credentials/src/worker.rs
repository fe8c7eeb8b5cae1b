//! Background award queue
//!
//! Reconciliations run as independent background jobs, one per user event.
//! Jobs are coalesced per username: while a username is queued or running,
//! further requests for it only mark it for one more run once the current
//! one finishes. Two reconciliations for the same user therefore never race
//! on the "already awarded" check inside this process.
//!
//! A run that fails with a retryable error, or that leaves issuance failures
//! in its report, is retried with exponential backoff. Retries are safe:
//! programs awarded by an earlier attempt are filtered out on the next one.

use crate::config::WorkerConfig;
use crate::error::ReconcileError;
use crate::reconciler::{AwardReport, Reconciler};
use chrono::Utc;
use lms_common::{EventBus, LmsEvent};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

/// Why a job could not be queued
#[derive(Debug, Error, PartialEq)]
pub enum QueueError {
    #[error("Award queue is full")]
    Full,

    #[error("Award queue is shut down")]
    Closed,
}

/// Result of asking for a reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// A new job was queued
    Queued,
    /// A job for this user was already queued or running
    Coalesced,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum JobState {
    Pending,
    Running { rerun: bool },
}

type JobTable = Arc<Mutex<HashMap<String, JobState>>>;

/// Handle for submitting reconciliation jobs
#[derive(Clone)]
pub struct AwardQueue {
    tx: mpsc::Sender<String>,
    jobs: JobTable,
}

impl AwardQueue {
    /// Start `config.concurrency` workers draining a new queue
    pub fn start(
        reconciler: Arc<dyn Reconciler>,
        config: WorkerConfig,
        event_bus: EventBus,
    ) -> (Self, Vec<JoinHandle<()>>) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let jobs: JobTable = Arc::new(Mutex::new(HashMap::new()));

        let handles = (0..config.concurrency.max(1))
            .map(|worker_id| {
                let worker = Worker {
                    id: worker_id,
                    reconciler: Arc::clone(&reconciler),
                    config: config.clone(),
                    event_bus: event_bus.clone(),
                    jobs: Arc::clone(&jobs),
                };
                let rx = Arc::clone(&rx);
                tokio::spawn(async move { worker.run(rx).await })
            })
            .collect();

        info!(
            workers = config.concurrency.max(1),
            capacity = config.queue_capacity,
            "Award queue started"
        );

        (Self { tx, jobs }, handles)
    }

    /// Request a reconciliation for `username`
    pub fn enqueue(&self, username: &str) -> Result<Enqueued, QueueError> {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());

        match jobs.get_mut(username) {
            Some(JobState::Pending) => {
                debug!(username, "Reconciliation already queued");
                return Ok(Enqueued::Coalesced);
            }
            Some(JobState::Running { rerun }) => {
                debug!(username, "Reconciliation running, scheduling one more run");
                *rerun = true;
                return Ok(Enqueued::Coalesced);
            }
            None => {}
        }

        match self.tx.try_send(username.to_string()) {
            Ok(()) => {
                jobs.insert(username.to_string(), JobState::Pending);
                debug!(username, "Reconciliation queued");
                Ok(Enqueued::Queued)
            }
            Err(mpsc::error::TrySendError::Full(_)) => Err(QueueError::Full),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(QueueError::Closed),
        }
    }

    /// Number of usernames queued or running
    pub fn in_flight(&self) -> usize {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Enqueue users whose course certificates get awarded
    pub fn listen(&self, event_bus: &EventBus) -> JoinHandle<()> {
        let mut rx = event_bus.subscribe();
        let queue = self.clone();

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(LmsEvent::CourseCertificateAwarded { username, course_id, .. }) => {
                        debug!(%username, %course_id, "Course certificate awarded");
                        if let Err(e) = queue.enqueue(&username) {
                            error!(%username, error = %e, "Could not queue reconciliation");
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Award queue listener lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("Award queue listener stopped");
        })
    }
}

struct Worker {
    id: usize,
    reconciler: Arc<dyn Reconciler>,
    config: WorkerConfig,
    event_bus: EventBus,
    jobs: JobTable,
}

impl Worker {
    async fn run(self, rx: Arc<tokio::sync::Mutex<mpsc::Receiver<String>>>) {
        loop {
            let next = { rx.lock().await.recv().await };
            let Some(username) = next else { break };

            loop {
                self.set_state(&username, JobState::Running { rerun: false });
                self.process(&username).await;
                if !self.finish(&username) {
                    break;
                }
            }
        }
        debug!(worker = self.id, "Award worker stopped");
    }

    fn set_state(&self, username: &str, state: JobState) {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        jobs.insert(username.to_string(), state);
    }

    /// Clear the job; true when another run was requested meanwhile
    fn finish(&self, username: &str) -> bool {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        match jobs.get(username) {
            Some(JobState::Running { rerun: true }) => true,
            _ => {
                jobs.remove(username);
                false
            }
        }
    }

    /// Run one job to completion, retrying as configured
    async fn process(&self, username: &str) {
        let max_attempts = self.config.max_retries + 1;

        for attempt in 1..=max_attempts {
            let outcome = match self.reconcile_isolated(username).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(worker = self.id, username, error = %e, "Reconciliation panicked");
                    self.publish_failure(username, format!("reconciliation panicked: {}", e), attempt);
                    return;
                }
            };

            let failure = match outcome {
                Ok(report) => {
                    self.publish_awards(&report);
                    if report.is_complete() {
                        info!(
                            worker = self.id,
                            username,
                            attempt,
                            awarded = report.awarded.len(),
                            "Reconciliation finished"
                        );
                        return;
                    }
                    format!("{} credential issuance(s) failed", report.failed.len())
                }
                Err(e) if !e.is_retryable() => {
                    error!(worker = self.id, username, error = %e, "Reconciliation aborted");
                    self.publish_failure(username, e.to_string(), attempt);
                    return;
                }
                Err(e) => e.to_string(),
            };

            if attempt == max_attempts {
                error!(
                    worker = self.id,
                    username,
                    attempts = attempt,
                    error = %failure,
                    "Reconciliation failed, retries exhausted"
                );
                self.publish_failure(username, failure, attempt);
                return;
            }

            let delay = retry_delay(&self.config, attempt);
            warn!(
                worker = self.id,
                username,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "Reconciliation failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Run one attempt on its own task so a panic cannot take the worker
    /// down with the job still marked running
    async fn reconcile_isolated(
        &self,
        username: &str,
    ) -> Result<Result<AwardReport, ReconcileError>, JoinError> {
        let reconciler = Arc::clone(&self.reconciler);
        let username = username.to_string();
        tokio::spawn(async move { reconciler.reconcile(&username).await }).await
    }

    fn publish_awards(&self, report: &AwardReport) {
        for program_id in &report.awarded {
            self.event_bus.emit_lossy(LmsEvent::ProgramCredentialAwarded {
                username: report.username.clone(),
                program_id: program_id.to_string(),
                timestamp: Utc::now(),
            });
        }
    }

    fn publish_failure(&self, username: &str, error: String, attempts: u32) {
        self.event_bus.emit_lossy(LmsEvent::ReconciliationFailed {
            username: username.to_string(),
            error,
            attempts,
            timestamp: Utc::now(),
        });
    }
}

/// Backoff before retry number `attempt` (1-based): initial × 2^(attempt−1), capped
pub fn retry_delay(config: &WorkerConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    let delay_ms = config
        .initial_backoff_ms
        .saturating_mul(1u64 << exponent)
        .min(config.max_backoff_ms);
    Duration::from_millis(delay_ms)
}
