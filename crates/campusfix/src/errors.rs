//! Error types for lifecycle operations.
//!
//! [`LifecycleError`] is the tagged outcome every engine operation returns, so
//! callers can branch on a stable kind. [`ActionableError`] renders one of
//! those failures for humans, with possible causes and remediation steps.

use std::fmt;
use thiserror::Error;

/// Failure of a lifecycle operation.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// No caller identity, or one that does not resolve to a user.
    #[error("authentication required")]
    Unauthenticated,

    /// The caller's role does not permit the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A referenced record does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Input is missing or out of range.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The record is not in a state that allows the operation.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Storage failed its health check; the caller may retry with backoff.
    #[error("storage temporarily unavailable: {0}")]
    StorageUnavailable(String),

    /// Any other storage failure.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl LifecycleError {
    pub fn not_found_issue(id: &str) -> Self {
        LifecycleError::NotFound(format!("issue {}", id))
    }

    /// Stable, machine-readable tag for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleError::Unauthenticated => "unauthenticated",
            LifecycleError::Forbidden(_) => "forbidden",
            LifecycleError::NotFound(_) => "not_found",
            LifecycleError::Validation(_) => "validation",
            LifecycleError::InvalidState(_) => "invalid_state",
            LifecycleError::StorageUnavailable(_) => "storage_unavailable",
            LifecycleError::Storage(_) => "storage",
        }
    }

    /// Whether retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, LifecycleError::StorageUnavailable(_))
    }
}

/// An error with diagnostic context and remediation steps.
///
/// # Example
///
/// ```
/// use campusfix::errors::ActionableError;
///
/// let error = ActionableError::new("Issue 1a2b3c4d not found")
///     .with_cause("The issue may have been deleted by its owner or staff")
///     .with_remedy("List visible issues: campusfix issue list --as <user-id>");
///
/// eprintln!("{}", error);
/// ```
#[derive(Debug, Clone)]
pub struct ActionableError {
    error: String,
    causes: Vec<String>,
    remediation: Vec<String>,
}

impl ActionableError {
    /// Create a new actionable error with the given message.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            causes: Vec::new(),
            remediation: Vec::new(),
        }
    }

    /// Add a possible cause (diagnostic hint).
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }

    /// Add a remediation step (actionable fix).
    pub fn with_remedy(mut self, remedy: impl Into<String>) -> Self {
        self.remediation.push(remedy.into());
        self
    }

    /// Convert to a formatted error message suitable for display.
    pub fn to_error_message(&self) -> String {
        let mut msg = format!("Error: {}\n", self.error);

        if !self.causes.is_empty() {
            msg.push_str("\nPossible causes:\n");
            for cause in &self.causes {
                msg.push_str(&format!("  • {}\n", cause));
            }
        }

        if !self.remediation.is_empty() {
            msg.push_str("\nTo fix:\n");
            for remedy in &self.remediation {
                msg.push_str(&format!("  • {}\n", remedy));
            }
        }

        msg
    }
}

impl fmt::Display for ActionableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_error_message())
    }
}

impl std::error::Error for ActionableError {}

impl From<&LifecycleError> for ActionableError {
    fn from(err: &LifecycleError) -> Self {
        let base = ActionableError::new(err.to_string());
        match err {
            LifecycleError::Unauthenticated => base
                .with_cause("No --as user was given, or the user ID is unknown")
                .with_remedy("List registered users: campusfix user list")
                .with_remedy("Pass a registered ID: campusfix --as <user-id> ..."),
            LifecycleError::Forbidden(_) => base
                .with_cause("Students may only mark issues resolved or unnecessary")
                .with_cause("Students may only delete issues they reported")
                .with_remedy("Ask a staff member to perform the change"),
            LifecycleError::NotFound(_) => base
                .with_cause("The ID may be mistyped")
                .with_cause("The issue may have been deleted")
                .with_remedy("List visible issues: campusfix issue list --as <user-id>"),
            LifecycleError::Validation(_) => {
                base.with_remedy("Check required fields and that ratings are between 1 and 5")
            }
            LifecycleError::InvalidState(_) => base
                .with_cause("Only resolved issues can be rated")
                .with_remedy("Wait for staff to resolve the issue, then rate it"),
            LifecycleError::StorageUnavailable(_) => base
                .with_cause("The data directory is missing or unreadable")
                .with_remedy("Initialize storage: campusfix init")
                .with_remedy("Retry shortly; this failure is usually transient"),
            LifecycleError::Storage(_) => base
                .with_cause("A record could not be read or written")
                .with_remedy("Check permissions on the data directory (CAMPUSFIX_DATA_DIR)"),
        }
    }
}
