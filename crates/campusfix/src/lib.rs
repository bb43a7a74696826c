//! CampusFix issue lifecycle library
//!
//! Core of the campus maintenance tracker: issue status transitions with
//! role checks, staleness-driven priority escalation on every read, and the
//! reporter trust score tied to resolution outcomes. Used by the `campusfix`
//! CLI, the REST server, and the notification dispatcher.

pub mod cli;
pub mod clock;
pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod escalation;
pub mod issue_log;
pub mod ledger;
pub mod mess;
pub mod notify;
pub mod output;
pub mod rating;
pub mod storage;
pub mod transition;

// Re-export commonly used types
pub use config::CampusConfig;
pub use domain::{
    Comment, DashboardStats, Issue, IssueDraft, IssueView, Priority, ProfileUpdate, Role, Status, User,
};
pub use engine::{LifecycleEngine, TransitionOutcome};
pub use errors::{ActionableError, LifecycleError};
pub use output::{ExitCode, JsonError, JsonOutput};
pub use storage::{InMemoryStorage, IssueStore, JsonFileStorage, WriteBatch};
