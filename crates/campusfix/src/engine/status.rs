//! Guarded status transitions and trust scoring

use super::*;
use crate::domain::Status;
use serde::Serialize;

/// What a status change request did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransitionOutcome {
    pub from: Status,
    pub to: Status,
    /// Score change applied to the owner, if any
    pub trust_delta: Option<f64>,
    /// False when the issue already had the requested status
    pub effective: bool,
}

impl<S: IssueStore> LifecycleEngine<S> {
    /// Set an issue's status on behalf of `caller`.
    ///
    /// Staff may choose any status; students only Resolved or Unnecessary.
    /// Requesting the current status succeeds without side effects. An
    /// effective staff transition into Resolved or Defected adjusts the
    /// owner's trust score, and the issue and owner are committed together.
    /// The owner is notified after the commit.
    pub fn change_status(
        &self,
        id: &str,
        target: Status,
        caller: &User,
    ) -> Result<TransitionOutcome, LifecycleError> {
        let mut issue = self.load_issue_or_not_found(id)?;
        self.guard.authorize(caller.role, target)?;

        let from = issue.status;
        if !self.guard.is_effective(from, target) {
            tracing::debug!(issue = %issue.short_id(), status = %target, "status unchanged");
            return Ok(TransitionOutcome {
                from,
                to: target,
                trust_delta: None,
                effective: false,
            });
        }

        issue.status = target;
        let mut owner = self.storage.load_user(&issue.owner_id)?;
        let mut batch = WriteBatch::new().issue(issue.clone());

        let trust_delta = match (self.ledger.delta(from, target, caller.role), owner.as_mut()) {
            (Some(delta), Some(owner)) => {
                self.ledger.apply(owner, delta);
                batch = batch.user(owner.clone());
                Some(delta)
            }
            (Some(_), None) => {
                tracing::warn!(issue = %issue.short_id(), owner = %issue.owner_id, "owner missing, trust score not adjusted");
                None
            }
            (None, _) => None,
        };

        self.storage.apply(&batch)?;
        tracing::info!(
            issue = %issue.short_id(),
            from = %from,
            to = %target,
            by = %caller.id,
            trust_delta = ?trust_delta,
            "status changed"
        );

        if let Some(owner) = &owner {
            self.notify_user(owner, |address| {
                Notification::status_changed(address, owner, &issue, target, trust_delta)
            });
        }

        Ok(TransitionOutcome {
            from,
            to: target,
            trust_delta,
            effective: true,
        })
    }
}
