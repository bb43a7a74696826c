//! Issue CRUD operations and the escalating read path

use super::*;
use crate::domain::queries::{dashboard_stats, issue_view, sort_for_listing, visible_issues};
use crate::domain::{Comment, DashboardStats, IssueDraft, IssueView};
use crate::issue_log::IssueLogRecord;

impl<S: IssueStore> LifecycleEngine<S> {
    /// Report a new issue owned by `caller`.
    ///
    /// The issue starts Pending with the submitted priority. A creation record
    /// is handed to the issue log afterwards; the log absorbs its own failures.
    pub fn create_issue(&self, draft: IssueDraft, caller: &User) -> Result<IssueView, LifecycleError> {
        if let Some(field) = draft.missing_field() {
            return Err(LifecycleError::Validation(format!("{} is required", field)));
        }

        let issue = Issue::new(draft, caller.id.clone(), self.now());
        self.storage.save_issue(&issue)?;
        tracing::info!(
            issue = %issue.short_id(),
            owner = %caller.id,
            priority = ?issue.priority,
            "issue created"
        );

        self.issue_log
            .log_created(IssueLogRecord::new(&issue, caller, &self.config.local_offset()));

        let users = HashMap::from([(caller.id.clone(), caller.clone())]);
        Ok(issue_view(issue, &users))
    }

    /// Load every issue after escalating stale ones.
    ///
    /// Runs the escalator over the full, unfiltered set, then asks storage to
    /// promote the candidates. Storage re-checks each row against the
    /// escalator under its write lock and touches only the priority. If that
    /// commit fails the pre-escalation rows are returned; the read itself
    /// still succeeds.
    pub fn escalated_issues(&self) -> Result<Vec<Issue>, LifecycleError> {
        let mut issues = self.storage.list_issues()?;
        let now = self.now();
        let candidates: Vec<String> = self
            .escalator
            .escalate(&issues, now)
            .into_iter()
            .map(|issue| issue.id)
            .collect();
        if candidates.is_empty() {
            return Ok(issues);
        }

        let still_stale = |issue: &Issue| self.escalator.should_escalate(issue, now);
        match self.storage.promote_to_high(&candidates, &still_stale) {
            Ok(promoted) => {
                let count = promoted.len();
                let mut promoted: HashMap<String, Issue> =
                    promoted.into_iter().map(|i| (i.id.clone(), i)).collect();
                for issue in issues.iter_mut() {
                    if let Some(updated) = promoted.remove(&issue.id) {
                        *issue = updated;
                    }
                }
                tracing::info!(count, "escalated stale issues to high priority");
            }
            Err(e) => {
                tracing::warn!(
                    count = candidates.len(),
                    error = %e,
                    "escalation commit failed, serving unescalated issues"
                );
            }
        }
        Ok(issues)
    }

    /// List the issues `caller` may see, highest priority first.
    pub fn list_issues(&self, caller: &User) -> Result<Vec<IssueView>, LifecycleError> {
        self.ensure_available()?;

        let issues = self.escalated_issues()?;
        let mut visible = visible_issues(issues, caller, &self.config.shared_categories());
        sort_for_listing(&mut visible);

        let users = self.users_by_id()?;
        Ok(visible
            .into_iter()
            .map(|issue| issue_view(issue, &users))
            .collect())
    }

    /// Permanently delete an issue and its comments.
    ///
    /// Students may delete only issues they own; staff may delete any.
    pub fn delete_issue(&self, id: &str, caller: &User) -> Result<(), LifecycleError> {
        let issue = self.load_issue_or_not_found(id)?;
        if !caller.role.is_staff() && issue.owner_id != caller.id {
            return Err(LifecycleError::Forbidden(
                "only the owner or staff may delete this issue".to_string(),
            ));
        }

        if !self.storage.delete_issue(id)? {
            return Err(LifecycleError::not_found_issue(id));
        }
        tracing::info!(issue = %issue.short_id(), by = %caller.id, "issue deleted");
        Ok(())
    }

    /// Append a comment and notify the owner when someone else wrote it.
    pub fn add_comment(&self, id: &str, text: &str, author: &User) -> Result<Comment, LifecycleError> {
        if text.trim().is_empty() {
            return Err(LifecycleError::Validation("comment text is required".to_string()));
        }

        let mut issue = self.load_issue_or_not_found(id)?;
        let comment = Comment::new(author.id.clone(), text.to_string(), self.now());
        issue.comments.push(comment.clone());
        self.storage.save_issue(&issue)?;
        tracing::debug!(issue = %issue.short_id(), author = %author.id, "comment added");

        if author.id != issue.owner_id {
            match self.storage.load_user(&issue.owner_id)? {
                Some(owner) => self.notify_user(&owner, |address| {
                    Notification::comment_added(address, author, &issue, text)
                }),
                None => tracing::warn!(issue = %issue.short_id(), "issue owner missing, comment not notified"),
            }
        }

        Ok(comment)
    }

    /// Global counts plus the caller's own issue count.
    pub fn stats(&self, caller: &User) -> Result<DashboardStats, LifecycleError> {
        self.ensure_available()?;
        let issues = self.storage.list_issues()?;
        Ok(dashboard_stats(&issues, caller))
    }
}
