//! Pure query operations on issue collections.
//!
//! These functions contain no I/O and operate only on data passed in, which
//! keeps role-scoped visibility and ordering testable in isolation from the
//! read path that calls them.

use super::types::{CommentView, DashboardStats, Issue, IssueView, Status, User};
use std::collections::HashMap;

const UNKNOWN_USER: &str = "Unknown";

/// Check whether `caller` may see `issue`.
///
/// Staff see everything. A student sees issues located in their own hostel,
/// issues in one of the campus-wide `shared_categories`, and issues they own.
pub fn is_visible_to(issue: &Issue, caller: &User, shared_categories: &[String]) -> bool {
    if caller.role.is_staff() {
        return true;
    }

    let same_hostel = caller
        .hostel
        .as_deref()
        .is_some_and(|hostel| hostel == issue.sub_location);

    same_hostel
        || shared_categories.iter().any(|c| c == &issue.category)
        || issue.owner_id == caller.id
}

/// Filter issues down to the caller's view.
pub fn visible_issues(issues: Vec<Issue>, caller: &User, shared_categories: &[String]) -> Vec<Issue> {
    issues
        .into_iter()
        .filter(|issue| is_visible_to(issue, caller, shared_categories))
        .collect()
}

/// Sort for listing: High, then Medium, then Low; newest first within a tier.
pub fn sort_for_listing(issues: &mut [Issue]) {
    issues.sort_by(|a, b| {
        a.priority
            .rank()
            .cmp(&b.priority.rank())
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

/// Resolve owner and comment author names for a single issue.
pub fn issue_view(issue: Issue, users: &HashMap<String, User>) -> IssueView {
    let owner = users.get(&issue.owner_id);

    let comments = issue
        .comments
        .into_iter()
        .map(|comment| CommentView {
            user_name: users
                .get(&comment.author_id)
                .map(|u| u.full_name.clone())
                .unwrap_or_else(|| UNKNOWN_USER.to_string()),
            id: comment.id,
            text: comment.text,
            created_at: comment.created_at,
        })
        .collect();

    IssueView {
        owner_name: owner
            .map(|u| u.full_name.clone())
            .unwrap_or_else(|| UNKNOWN_USER.to_string()),
        owner_trust_score: owner.map(|u| u.trust_score).unwrap_or(0.0),
        id: issue.id,
        title: issue.title,
        description: issue.description,
        category: issue.category,
        sub_location: issue.sub_location,
        specific_location: issue.specific_location,
        priority: issue.priority,
        status: issue.status,
        created_at: issue.created_at,
        owner_id: issue.owner_id,
        rating: issue.rating,
        review: issue.review,
        image_data: issue.image_data,
        comments,
    }
}

/// Count issues for the dashboard. Totals are global; `my_issues` is the caller's.
pub fn dashboard_stats(issues: &[Issue], caller: &User) -> DashboardStats {
    DashboardStats {
        total_issues: issues.len(),
        pending: issues.iter().filter(|i| i.status == Status::Pending).count(),
        resolved: issues.iter().filter(|i| i.status == Status::Resolved).count(),
        my_issues: issues.iter().filter(|i| i.owner_id == caller.id).count(),
    }
}
