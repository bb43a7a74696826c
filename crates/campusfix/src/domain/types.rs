//! Core domain types for the maintenance tracker.
//!
//! This module defines the records the lifecycle engine operates on: users,
//! issues, comments, and the views assembled for list responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caller role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Reporter of issues
    Student,
    /// Resolver of issues (staff or admin)
    #[serde(alias = "admin")]
    Staff,
}

impl Role {
    pub fn is_staff(self) -> bool {
        self == Role::Staff
    }
}

/// Issue lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Newly reported, not yet picked up
    Pending,
    /// Staff are working on it
    InProgress,
    /// Fixed
    Resolved,
    /// Report judged invalid
    Defected,
    /// Already reported elsewhere
    Duplicate,
    /// Closed as not needing action
    Unnecessary,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Status::Pending,
        Status::InProgress,
        Status::Resolved,
        Status::Defected,
        Status::Duplicate,
        Status::Unnecessary,
    ];

    /// Pending and in-progress issues are still open and eligible for escalation.
    pub fn is_open(self) -> bool {
        matches!(self, Status::Pending | Status::InProgress)
    }

    /// Human-readable label used in notification text.
    pub fn label(self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::InProgress => "In Progress",
            Status::Resolved => "Resolved",
            Status::Defected => "Defected",
            Status::Duplicate => "Duplicate",
            Status::Unnecessary => "Unnecessary",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Issue priority level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Listing rank: High sorts first.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }
}

/// A member of the campus community.
///
/// Identity records are owned by the identity collaborator; the engine only
/// mutates `trust_score` and the hostel request fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier (UUID)
    pub id: String,
    pub full_name: String,
    /// Contact address for notifications
    pub email: Option<String>,
    pub role: Role,
    /// Reputation scalar; unbounded in both directions
    #[serde(default)]
    pub trust_score: f64,
    /// Hostel the user lives in (matched against issue sub-locations)
    pub hostel: Option<String>,
    /// Pending hostel change awaiting staff approval
    #[serde(default)]
    pub requested_hostel: Option<String>,
    pub room_no: Option<String>,
    pub phone: Option<String>,
}

impl User {
    /// Create a new user with a zero trust score
    pub fn new(full_name: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            full_name: full_name.into(),
            email: None,
            role,
            trust_score: 0.0,
            hostel: None,
            requested_hostel: None,
            room_no: None,
            phone: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_hostel(mut self, hostel: impl Into<String>) -> Self {
        self.hostel = Some(hostel.into());
        self
    }

    pub fn with_room(mut self, room_no: impl Into<String>) -> Self {
        self.room_no = Some(room_no.into());
        self
    }

    /// Email address usable for notifications (absent or blank means none).
    pub fn contact_address(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}

/// Self-service profile edit. Only fields that are present are changed.
///
/// A blank `phone`, `hostel`, or `room_no` clears that field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub hostel: Option<String>,
    #[serde(default)]
    pub room_no: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.phone.is_none() && self.hostel.is_none() && self.room_no.is_none()
    }

    /// Apply the present fields to `user`.
    pub fn apply_to(self, user: &mut User) {
        fn cleared(value: String) -> Option<String> {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        }

        if let Some(name) = self.full_name {
            user.full_name = name.trim().to_string();
        }
        if let Some(phone) = self.phone {
            user.phone = cleared(phone);
        }
        if let Some(hostel) = self.hostel {
            user.hostel = cleared(hostel);
        }
        if let Some(room_no) = self.room_no {
            user.room_no = cleared(room_no);
        }
    }
}

/// Fields submitted when reporting an issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    /// Coarse location (hostel name, mess, department)
    pub sub_location: String,
    /// Room, floor, or landmark
    pub specific_location: String,
    pub priority: Priority,
    /// Optional photo as a data URL
    #[serde(default)]
    pub image_data: Option<String>,
}

impl IssueDraft {
    /// Name of the first required field that is empty, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("title", &self.title),
            ("description", &self.description),
            ("category", &self.category),
            ("sub_location", &self.sub_location),
            ("specific_location", &self.specific_location),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }
}

/// A comment on an issue. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(author_id: String, text: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            author_id,
            text,
            created_at,
        }
    }
}

/// A reported maintenance issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Unique identifier (UUID)
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub sub_location: String,
    pub specific_location: String,
    pub priority: Priority,
    pub status: Status,
    /// Set once at creation
    pub created_at: DateTime<Utc>,
    /// Reporting user; never reassigned
    pub owner_id: String,
    /// Satisfaction rating (1-5), only written while resolved
    pub rating: Option<u8>,
    pub review: Option<String>,
    #[serde(default)]
    pub image_data: Option<String>,
    /// Append-only, in creation order
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Issue {
    /// Create a pending issue from a draft
    pub fn new(draft: IssueDraft, owner_id: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: draft.title,
            description: draft.description,
            category: draft.category,
            sub_location: draft.sub_location,
            specific_location: draft.specific_location,
            priority: draft.priority,
            status: Status::Pending,
            created_at,
            owner_id,
            rating: None,
            review: None,
            image_data: draft.image_data,
            comments: Vec::new(),
        }
    }

    /// Short form of the ID for display
    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }
}

/// Comment as presented to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub user_name: String,
}

/// Issue as presented to callers, with owner details resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub sub_location: String,
    pub specific_location: String,
    pub priority: Priority,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub owner_id: String,
    pub owner_name: String,
    pub owner_trust_score: f64,
    pub rating: Option<u8>,
    pub review: Option<String>,
    pub image_data: Option<String>,
    pub comments: Vec<CommentView>,
}

/// Dashboard counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_issues: usize,
    pub pending: usize,
    pub resolved: usize,
    pub my_issues: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> IssueDraft {
        IssueDraft {
            title: "Fan broken".to_string(),
            description: "Ceiling fan does not spin".to_string(),
            category: "Electrical".to_string(),
            sub_location: "Gargi".to_string(),
            specific_location: "Room 112".to_string(),
            priority: Priority::Medium,
            image_data: None,
        }
    }

    #[test]
    fn test_new_issue_starts_pending_without_rating() {
        let issue = Issue::new(draft(), "owner-1".to_string(), Utc::now());

        assert_eq!(issue.status, Status::Pending);
        assert_eq!(issue.priority, Priority::Medium);
        assert_eq!(issue.owner_id, "owner-1");
        assert!(issue.rating.is_none());
        assert!(issue.review.is_none());
        assert!(issue.comments.is_empty());
        assert!(!issue.id.is_empty());
    }

    #[test]
    fn test_missing_field_reports_first_blank_field() {
        let mut d = draft();
        assert_eq!(d.missing_field(), None);

        d.sub_location = "   ".to_string();
        assert_eq!(d.missing_field(), Some("sub_location"));

        d.title = String::new();
        assert_eq!(d.missing_field(), Some("title"));
    }

    #[test]
    fn test_open_statuses() {
        let open: Vec<_> = Status::ALL.into_iter().filter(|s| s.is_open()).collect();
        assert_eq!(open, vec![Status::Pending, Status::InProgress]);
    }

    #[test]
    fn test_priority_rank_orders_high_first() {
        assert!(Priority::High.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::Low.rank());
        assert!(Priority::High > Priority::Low);
    }

    #[test]
    fn test_role_accepts_admin_alias() {
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Staff);
        assert_eq!(serde_json::to_string(&Role::Student).unwrap(), "\"student\"");
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&Status::InProgress).unwrap(),
            "\"in_progress\""
        );
        let status: Status = serde_json::from_str("\"defected\"").unwrap();
        assert_eq!(status, Status::Defected);
    }

    #[test]
    fn test_contact_address_ignores_blank_email() {
        let user = User::new("Asha", Role::Student).with_email("  ");
        assert_eq!(user.contact_address(), None);

        let user = User::new("Asha", Role::Student).with_email("asha@campus.edu");
        assert_eq!(user.contact_address(), Some("asha@campus.edu"));
    }
}
