//! Post-resolution satisfaction ratings.
//!
//! Any authenticated caller may rate an issue once it is resolved; there is
//! no ownership check. A new rating overwrites the previous one.

use crate::domain::{Issue, Status};
use crate::errors::LifecycleError;
use std::ops::RangeInclusive;

pub const RATING_RANGE: RangeInclusive<u8> = 1..=5;

#[derive(Debug, Clone, Copy, Default)]
pub struct RatingGate;

impl RatingGate {
    /// Validate a rating request against the issue's current status.
    pub fn check(&self, issue: &Issue, rating: u8) -> Result<(), LifecycleError> {
        if !RATING_RANGE.contains(&rating) {
            return Err(LifecycleError::Validation(format!(
                "rating must be between {} and {}, got {}",
                RATING_RANGE.start(),
                RATING_RANGE.end(),
                rating
            )));
        }
        if issue.status != Status::Resolved {
            return Err(LifecycleError::InvalidState(format!(
                "issue must be resolved to rate (currently {})",
                issue.status.label()
            )));
        }
        Ok(())
    }

    /// Check and record the rating, replacing any earlier one.
    pub fn rate(
        &self,
        issue: &mut Issue,
        rating: u8,
        review: Option<String>,
    ) -> Result<(), LifecycleError> {
        self.check(issue, rating)?;
        issue.rating = Some(rating);
        issue.review = review;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IssueDraft, Priority};
    use chrono::Utc;

    fn issue(status: Status) -> Issue {
        let mut issue = Issue::new(
            IssueDraft {
                title: "Wifi down".to_string(),
                description: "No signal on floor 3".to_string(),
                category: "Network".to_string(),
                sub_location: "Bhaskara".to_string(),
                specific_location: "Floor 3".to_string(),
                priority: Priority::High,
                image_data: None,
            },
            "owner".to_string(),
            Utc::now(),
        );
        issue.status = status;
        issue
    }

    #[test]
    fn test_rating_requires_resolved() {
        for status in [Status::Pending, Status::InProgress, Status::Defected, Status::Unnecessary] {
            let mut i = issue(status);
            let err = RatingGate.rate(&mut i, 4, None).unwrap_err();
            assert_eq!(err.kind(), "invalid_state");
            assert!(i.rating.is_none());
        }
    }

    #[test]
    fn test_rating_out_of_range_is_validation_error() {
        let mut i = issue(Status::Resolved);
        assert_eq!(RatingGate.rate(&mut i, 0, None).unwrap_err().kind(), "validation");
        assert_eq!(RatingGate.rate(&mut i, 6, None).unwrap_err().kind(), "validation");
    }

    #[test]
    fn test_rating_overwrites_previous_value() {
        let mut i = issue(Status::Resolved);
        RatingGate.rate(&mut i, 2, Some("Slow".to_string())).unwrap();
        RatingGate.rate(&mut i, 5, None).unwrap();

        assert_eq!(i.rating, Some(5));
        assert_eq!(i.review, None);
    }
}
