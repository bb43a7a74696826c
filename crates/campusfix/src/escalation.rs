//! Staleness-driven priority escalation.
//!
//! Every read of the issue list first runs [`PriorityEscalator::escalate`]
//! over the full, unfiltered issue set. Open issues (pending or in progress)
//! that are older than the staleness window and not already High are
//! promoted to High. The rule only ever raises priority, so running it again
//! over its own output changes nothing.
//!
//! The escalator itself is pure: it returns the updated copies and leaves
//! persisting them to the caller. Storage re-checks each candidate with
//! [`PriorityEscalator::should_escalate`] under its write lock and writes
//! only the priority.

use crate::config::CampusConfig;
use crate::domain::{Issue, Priority};
use chrono::{DateTime, Duration, FixedOffset, Utc};

/// Promotes stale open issues to High priority.
#[derive(Debug, Clone)]
pub struct PriorityEscalator {
    stale_after: Duration,
    offset: FixedOffset,
}

impl PriorityEscalator {
    pub fn new(stale_after: Duration, offset: FixedOffset) -> Self {
        Self {
            stale_after,
            offset,
        }
    }

    pub fn from_config(config: &CampusConfig) -> Self {
        Self::new(
            Duration::days(config.stale_after_days()),
            config.local_offset(),
        )
    }

    /// Issues created strictly before this instant are stale.
    ///
    /// Computed on the campus local clock.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<FixedOffset> {
        now.with_timezone(&self.offset) - self.stale_after
    }

    /// Whether `issue` qualifies for escalation at `now`.
    pub fn should_escalate(&self, issue: &Issue, now: DateTime<Utc>) -> bool {
        issue.priority != Priority::High
            && issue.status.is_open()
            && issue.created_at < self.cutoff(now).with_timezone(&Utc)
    }

    /// Return escalated copies of every issue that qualifies.
    ///
    /// Issues that do not qualify are not included, so an empty result means
    /// there is nothing to persist.
    pub fn escalate(&self, issues: &[Issue], now: DateTime<Utc>) -> Vec<Issue> {
        issues
            .iter()
            .filter(|issue| self.should_escalate(issue, now))
            .map(|issue| {
                let mut escalated = issue.clone();
                escalated.priority = Priority::High;
                escalated
            })
            .collect()
    }
}

impl Default for PriorityEscalator {
    fn default() -> Self {
        Self::from_config(&CampusConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IssueDraft, Status};
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn issue_at(created_at: DateTime<Utc>, priority: Priority, status: Status) -> Issue {
        let mut issue = Issue::new(
            IssueDraft {
                title: "Broken tap".to_string(),
                description: "Drips all night".to_string(),
                category: "Plumbing".to_string(),
                sub_location: "RNT".to_string(),
                specific_location: "Washroom 2".to_string(),
                priority,
                image_data: None,
            },
            "owner".to_string(),
            created_at,
        );
        issue.status = status;
        issue
    }

    fn ist() -> FixedOffset {
        FixedOffset::east_opt(330 * 60).unwrap()
    }

    #[test]
    fn test_stale_open_issue_escalates() {
        let escalator = PriorityEscalator::new(Duration::days(3), ist());
        // Monday 00:00 IST
        let created = ist().with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap().with_timezone(&Utc);
        // Thursday 00:01 IST
        let now = ist().with_ymd_and_hms(2025, 6, 5, 0, 1, 0).unwrap().with_timezone(&Utc);

        let issue = issue_at(created, Priority::Medium, Status::Pending);
        let escalated = escalator.escalate(&[issue.clone()], now);

        assert_eq!(escalated.len(), 1);
        assert_eq!(escalated[0].id, issue.id);
        assert_eq!(escalated[0].priority, Priority::High);
    }

    #[test]
    fn test_issue_exactly_at_threshold_is_not_stale() {
        let escalator = PriorityEscalator::new(Duration::days(3), ist());
        let created = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();
        let now = created + Duration::days(3);

        let issue = issue_at(created, Priority::Low, Status::InProgress);
        assert!(!escalator.should_escalate(&issue, now));
        assert!(escalator.should_escalate(&issue, now + Duration::seconds(1)));
    }

    #[test]
    fn test_closed_and_high_issues_are_left_alone() {
        let escalator = PriorityEscalator::default();
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let now = created + Duration::days(30);

        let issues: Vec<Issue> = [Status::Resolved, Status::Defected, Status::Duplicate, Status::Unnecessary]
            .into_iter()
            .map(|s| issue_at(created, Priority::Low, s))
            .chain(std::iter::once(issue_at(created, Priority::High, Status::Pending)))
            .collect();

        assert!(escalator.escalate(&issues, now).is_empty());
    }

    #[test]
    fn test_cutoff_is_reported_in_local_time() {
        let escalator = PriorityEscalator::new(Duration::days(3), ist());
        let now = Utc.with_ymd_and_hms(2025, 6, 5, 0, 0, 0).unwrap();
        let cutoff = escalator.cutoff(now);

        assert_eq!(cutoff.offset().local_minus_utc(), 330 * 60);
        assert_eq!(cutoff.with_timezone(&Utc), now - Duration::days(3));
    }

    fn arb_status() -> impl Strategy<Value = Status> {
        prop::sample::select(Status::ALL.to_vec())
    }

    fn arb_priority() -> impl Strategy<Value = Priority> {
        prop::sample::select(vec![Priority::Low, Priority::Medium, Priority::High])
    }

    proptest! {
        #[test]
        fn prop_escalation_is_idempotent_and_never_lowers(
            specs in prop::collection::vec((0i64..240, arb_priority(), arb_status()), 0..24)
        ) {
            let escalator = PriorityEscalator::new(Duration::days(3), ist());
            let now = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();

            let mut issues: Vec<Issue> = specs
                .iter()
                .map(|(hours_old, p, s)| issue_at(now - Duration::hours(*hours_old), *p, *s))
                .collect();
            let before = issues.clone();

            for escalated in escalator.escalate(&issues, now) {
                let slot = issues.iter_mut().find(|i| i.id == escalated.id).unwrap();
                *slot = escalated;
            }

            for (old, new) in before.iter().zip(&issues) {
                prop_assert!(new.priority >= old.priority);
                prop_assert_eq!(new.status, old.status);
                if old.status.is_open() && old.created_at < now - Duration::days(3) {
                    prop_assert_eq!(new.priority, Priority::High);
                } else {
                    prop_assert_eq!(new.priority, old.priority);
                }
            }

            prop_assert!(escalator.escalate(&issues, now).is_empty());
        }
    }
}
