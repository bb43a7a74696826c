//! campusfix-dispatch library
//!
//! Moves owner notifications and issue-creation records off the request
//! path. The engine talks to a [`DispatchHandle`], which only enqueues; a
//! single worker task drains the queue and makes one delivery attempt per
//! job. Failures are logged and dropped.
//!
//! ```no_run
//! # async fn demo() -> anyhow::Result<()> {
//! use campusfix::issue_log::NoopIssueLog;
//! use campusfix_dispatch::{transport::LogTransport, Dispatcher};
//! use std::sync::Arc;
//!
//! let dispatcher = Dispatcher::spawn(Arc::new(LogTransport), Arc::new(NoopIssueLog));
//! let handle = dispatcher.handle();
//! // engine.with_notifier(Arc::new(handle.clone())).with_issue_log(Arc::new(handle))
//! # drop(handle);
//! let report = dispatcher.shutdown().await;
//! println!("{} delivered, {} failed", report.delivered, report.failed);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod transport;

pub use config::{DispatchConfig, TransportKind};
pub use transport::{LogTransport, MemoryTransport, Transport, WebhookTransport};

use campusfix::issue_log::{IssueLog, IssueLogRecord};
use campusfix::notify::{Notification, Notifier};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A unit of deferred work
#[derive(Debug, Clone)]
pub enum Job {
    Notify(Notification),
    LogCreated(IssueLogRecord),
    /// Stop accepting jobs; drain what is already queued
    Stop,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("dispatcher is shut down")]
    Closed,
}

/// Counts reported when the worker exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Cheap, cloneable sender side of the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchHandle {
    tx: mpsc::UnboundedSender<Job>,
}

impl DispatchHandle {
    /// Queue a job without waiting.
    pub fn enqueue(&self, job: Job) -> Result<(), DispatchError> {
        self.tx.send(job).map_err(|_| DispatchError::Closed)
    }

    fn enqueue_or_log(&self, job: Job) {
        if let Err(e) = self.enqueue(job) {
            tracing::warn!(error = %e, "job dropped");
        }
    }
}

impl Notifier for DispatchHandle {
    fn notify(&self, notification: Notification) {
        self.enqueue_or_log(Job::Notify(notification));
    }
}

impl IssueLog for DispatchHandle {
    fn log_created(&self, record: IssueLogRecord) {
        self.enqueue_or_log(Job::LogCreated(record));
    }
}

/// Owns the worker task. Must be created inside a tokio runtime.
pub struct Dispatcher {
    handle: DispatchHandle,
    worker: JoinHandle<DispatchReport>,
}

impl Dispatcher {
    pub fn spawn(transport: Arc<dyn Transport>, issue_log: Arc<dyn IssueLog>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(rx, transport, issue_log));
        Self {
            handle: DispatchHandle { tx },
            worker,
        }
    }

    /// Spawn with the transport selected by `config`.
    pub fn from_config(
        config: &DispatchConfig,
        issue_log: Arc<dyn IssueLog>,
    ) -> anyhow::Result<Self> {
        let transport = transport::from_config(config)?;
        tracing::info!(transport = transport.name(), "dispatcher started");
        Ok(Self::spawn(transport, issue_log))
    }

    pub fn handle(&self) -> DispatchHandle {
        self.handle.clone()
    }

    /// Close the queue and wait for already-queued jobs to finish.
    ///
    /// Handles still held elsewhere keep working as values, but anything
    /// they enqueue after this point is dropped with a warning.
    pub async fn shutdown(self) -> DispatchReport {
        // The worker may already be gone if it panicked
        let _ = self.handle.enqueue(Job::Stop);
        match self.worker.await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(error = %e, "dispatch worker ended abnormally");
                DispatchReport::default()
            }
        }
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<Job>,
    transport: Arc<dyn Transport>,
    issue_log: Arc<dyn IssueLog>,
) -> DispatchReport {
    let mut report = DispatchReport::default();

    while let Some(job) = rx.recv().await {
        let ok = match job {
            Job::Stop => {
                rx.close();
                continue;
            }
            Job::Notify(notification) => {
                let transport = Arc::clone(&transport);
                let result = tokio::task::spawn_blocking(move || {
                    transport
                        .deliver(&notification)
                        .map_err(|e| (notification.address, e))
                })
                .await;
                match result {
                    Ok(Ok(())) => true,
                    Ok(Err((address, e))) => {
                        tracing::warn!(to = %address, error = %e, "notification failed");
                        false
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "notification task failed");
                        false
                    }
                }
            }
            Job::LogCreated(record) => {
                let issue_log = Arc::clone(&issue_log);
                let ticket = record.ticket_id.clone();
                match tokio::task::spawn_blocking(move || issue_log.log_created(record)).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(ticket = %ticket, error = %e, "issue log task failed");
                        false
                    }
                }
            }
        };

        if ok {
            report.delivered += 1;
        } else {
            report.failed += 1;
        }
    }

    tracing::debug!(delivered = report.delivered, failed = report.failed, "dispatch worker stopped");
    report
}
