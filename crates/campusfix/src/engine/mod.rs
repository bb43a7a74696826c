//! The issue lifecycle engine.
//!
//! `LifecycleEngine` is the single entry point for every operation on issues,
//! users, and mess ratings. Transports (the CLI and the REST server) resolve a
//! caller, call one method, and map the [`LifecycleError`] kind to their own
//! status codes.
//!
//! This module is organized into submodules by functional area:
//! - `issue`: create, list (with escalation), delete, comments, dashboard
//! - `status`: guarded status transitions and trust scoring
//! - `rating`: post-resolution ratings
//! - `mess`: weekly mess ratings and analytics
//! - `users`: identity lookup, registration, hostel requests

mod issue;
mod mess;
mod rating;
mod status;
mod users;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use status::TransitionOutcome;

// Common imports used across modules
use crate::clock::{Clock, SystemClock};
use crate::config::CampusConfig;
use crate::domain::{Issue, User};
use crate::errors::LifecycleError;
use crate::escalation::PriorityEscalator;
use crate::issue_log::{IssueLog, NoopIssueLog};
use crate::ledger::TrustScoreLedger;
use crate::notify::{NoopNotifier, Notification, Notifier};
use crate::rating::RatingGate;
use crate::storage::{IssueStore, WriteBatch};
use crate::transition::StatusTransitionGuard;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Executes lifecycle operations against a storage backend.
///
/// Generic over storage backend to support different implementations
/// (JSON files, in-memory, etc.). Collaborators are injected once at
/// construction; the defaults drop notifications and creation records and
/// read the system clock.
pub struct LifecycleEngine<S: IssueStore> {
    storage: S,
    config: CampusConfig,
    notifier: Arc<dyn Notifier>,
    issue_log: Arc<dyn IssueLog>,
    clock: Arc<dyn Clock>,
    escalator: PriorityEscalator,
    guard: StatusTransitionGuard,
    ledger: TrustScoreLedger,
    rating_gate: RatingGate,
}

impl<S: IssueStore> LifecycleEngine<S> {
    /// Create an engine with explicit configuration.
    pub fn new(storage: S, config: CampusConfig) -> Self {
        Self {
            escalator: PriorityEscalator::from_config(&config),
            ledger: TrustScoreLedger::from_config(&config),
            guard: StatusTransitionGuard,
            rating_gate: RatingGate,
            notifier: Arc::new(NoopNotifier),
            issue_log: Arc::new(NoopIssueLog),
            clock: Arc::new(SystemClock),
            storage,
            config,
        }
    }

    /// Create an engine configured from `config.toml` in the storage root.
    pub fn open(storage: S) -> anyhow::Result<Self> {
        let config = CampusConfig::load(storage.root())?;
        Ok(Self::new(storage, config))
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_issue_log(mut self, issue_log: Arc<dyn IssueLog>) -> Self {
        self.issue_log = issue_log;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Get reference to the storage backend
    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &CampusConfig {
        &self.config
    }

    /// Initialize the storage backend (idempotent).
    pub fn init(&self) -> Result<(), LifecycleError> {
        self.storage.init()?;
        tracing::info!(root = %self.storage.root().display(), "storage initialized");
        Ok(())
    }

    /// Expand a short issue ID to the full one.
    pub fn resolve_issue_id(&self, partial_id: &str) -> Result<String, LifecycleError> {
        self.storage
            .resolve_issue_id(partial_id)
            .map_err(|e| LifecycleError::NotFound(format!("issue {} ({})", partial_id, e)))
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Health check for read and report paths.
    fn ensure_available(&self) -> Result<(), LifecycleError> {
        self.storage.ping().map_err(|e| {
            tracing::warn!(error = %e, "storage health check failed");
            LifecycleError::StorageUnavailable(e.to_string())
        })
    }

    fn load_issue_or_not_found(&self, id: &str) -> Result<Issue, LifecycleError> {
        self.storage
            .load_issue(id)?
            .ok_or_else(|| LifecycleError::not_found_issue(id))
    }

    fn users_by_id(&self) -> Result<HashMap<String, User>, LifecycleError> {
        Ok(self
            .storage
            .list_users()?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect())
    }

    /// Hand a notification to the notifier if the recipient has an address.
    ///
    /// Called only after the triggering change is committed.
    fn notify_user(&self, recipient: &User, build: impl FnOnce(&str) -> Notification) {
        if !self.config.notifications_enabled() {
            return;
        }
        match recipient.contact_address() {
            Some(address) => self.notifier.notify(build(address)),
            None => tracing::debug!(user = %recipient.id, "no contact address, notification skipped"),
        }
    }
}
