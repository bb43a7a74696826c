//! Role-gated status transitions.
//!
//! The status machine has no adjacency restrictions: staff may move an issue
//! to any status from any status, including reopening resolved issues.
//! Students may only close issues, as resolved or as unnecessary. A request
//! for the status an issue already has succeeds without effect.

use crate::domain::{Role, Status};
use crate::errors::LifecycleError;

/// Authorizes a requested status change against the caller's role.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusTransitionGuard;

impl StatusTransitionGuard {
    /// Statuses a student may request.
    pub const STUDENT_TARGETS: [Status; 2] = [Status::Resolved, Status::Unnecessary];

    /// Check whether `role` may request `target`, regardless of the current status.
    pub fn authorize(&self, role: Role, target: Status) -> Result<(), LifecycleError> {
        match role {
            Role::Staff => Ok(()),
            Role::Student if Self::STUDENT_TARGETS.contains(&target) => Ok(()),
            Role::Student => Err(LifecycleError::Forbidden(format!(
                "students cannot set status to {}",
                target.label()
            ))),
        }
    }

    /// A transition only has side effects when it actually changes the status.
    pub fn is_effective(&self, current: Status, target: Status) -> bool {
        current != target
    }
}
