//! Post-resolution ratings

use super::*;

impl<S: IssueStore> LifecycleEngine<S> {
    /// Record a 1..=5 rating and optional review on a resolved issue.
    ///
    /// Any authenticated caller may rate; a later rating replaces the earlier one.
    pub fn rate_issue(
        &self,
        id: &str,
        rating: u8,
        review: Option<String>,
        caller: &User,
    ) -> Result<Issue, LifecycleError> {
        let mut issue = self.load_issue_or_not_found(id)?;
        self.rating_gate.rate(&mut issue, rating, review)?;
        self.storage.save_issue(&issue)?;

        tracing::info!(issue = %issue.short_id(), rating, by = %caller.id, "issue rated");
        Ok(issue)
    }
}
