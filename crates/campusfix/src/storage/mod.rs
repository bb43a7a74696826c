//! Storage abstraction layer for persisting issues, users, and mess ratings.
//!
//! This module defines the `IssueStore` trait that abstracts storage operations,
//! allowing different backends (JSON files, in-memory, etc.) to be used
//! interchangeably by the lifecycle engine.

use crate::domain::{Issue, User};
use crate::mess::MessRating;
use anyhow::Result;

pub mod json;
pub mod lock;
pub mod memory;

pub use json::JsonFileStorage;
pub use lock::FileLocker;
pub use memory::InMemoryStorage;

/// A set of records committed together.
///
/// Used for a status change together with the owner's trust score: either
/// every record in the batch is written or none is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    pub issues: Vec<Issue>,
    pub users: Vec<User>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_issues(issues: Vec<Issue>) -> Self {
        Self {
            issues,
            users: Vec::new(),
        }
    }

    pub fn issue(mut self, issue: Issue) -> Self {
        self.issues.push(issue);
        self
    }

    pub fn user(mut self, user: User) -> Self {
        self.users.push(user);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty() && self.users.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len() + self.users.len()
    }
}

/// Trait for storage backends that persist issues, users, and mess ratings.
///
/// Implementations must be `Clone` (clones share the same underlying data)
/// and thread-safe so one backend can serve concurrent requests. No
/// cross-request locking is implied: two writers to the same record race and
/// the later write wins.
///
/// # Examples
///
/// ```
/// use campusfix::domain::{Issue, IssueDraft, Priority, Role, User};
/// use campusfix::storage::{InMemoryStorage, IssueStore};
///
/// let storage = InMemoryStorage::new();
/// storage.init().unwrap();
///
/// let owner = User::new("Asha", Role::Student);
/// let draft = IssueDraft {
///     title: "Fan broken".to_string(),
///     description: "Does not spin".to_string(),
///     category: "Electrical".to_string(),
///     sub_location: "Gargi".to_string(),
///     specific_location: "Room 12".to_string(),
///     priority: Priority::Low,
///     image_data: None,
/// };
/// let issue = Issue::new(draft, owner.id.clone(), chrono::Utc::now());
/// storage.save_issue(&issue).unwrap();
///
/// let loaded = storage.load_issue(&issue.id).unwrap().unwrap();
/// assert_eq!(loaded.title, "Fan broken");
/// ```
pub trait IssueStore: Clone + Send + Sync {
    /// Initialize the storage backend (idempotent).
    fn init(&self) -> Result<()>;

    /// Cheap health check run before read paths.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot currently serve requests.
    fn ping(&self) -> Result<()>;

    /// Save an issue (create or update).
    fn save_issue(&self, issue: &Issue) -> Result<()>;

    /// Load an issue by ID, or `None` if it does not exist.
    fn load_issue(&self, id: &str) -> Result<Option<Issue>>;

    /// Resolve a full issue ID from a unique prefix (at least 4 characters).
    ///
    /// An exact ID always resolves to itself.
    ///
    /// # Errors
    ///
    /// Fails when the prefix is too short, matches nothing, or is ambiguous.
    fn resolve_issue_id(&self, partial_id: &str) -> Result<String> {
        let issues = self.list_issues()?;
        if issues.iter().any(|i| i.id == partial_id) {
            return Ok(partial_id.to_string());
        }
        if partial_id.len() < 4 {
            anyhow::bail!("Issue ID prefix must be at least 4 characters");
        }

        let matches: Vec<&str> = issues
            .iter()
            .map(|i| i.id.as_str())
            .filter(|id| id.starts_with(partial_id))
            .collect();
        match matches.as_slice() {
            [] => anyhow::bail!("Issue not found: {}", partial_id),
            [only] => Ok((*only).to_string()),
            many => anyhow::bail!(
                "Ambiguous ID '{}' matches multiple issues: {}",
                partial_id,
                many.join(", ")
            ),
        }
    }

    /// Permanently delete an issue and its comments.
    ///
    /// Returns `false` if there was no such issue.
    fn delete_issue(&self, id: &str) -> Result<bool>;

    /// List all issues in the repository.
    fn list_issues(&self) -> Result<Vec<Issue>>;

    /// Save a user (create or update).
    fn save_user(&self, user: &User) -> Result<()>;

    /// Load a user by ID, or `None` if it does not exist.
    fn load_user(&self, id: &str) -> Result<Option<User>>;

    /// List all users.
    fn list_users(&self) -> Result<Vec<User>>;

    /// Write every record in `batch` as one unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch could not be committed; in that case
    /// none of its records are visible.
    fn apply(&self, batch: &WriteBatch) -> Result<()>;

    /// Raise each listed issue to High priority, changing no other field.
    ///
    /// Every row is re-read under the same lock that guards writes. Rows that
    /// no longer exist, or that `still_qualifies` rejects on the fresh read,
    /// are skipped, so concurrent status changes, comments, and deletions
    /// are never overwritten. Returns the promoted rows as stored.
    fn promote_to_high(
        &self,
        ids: &[String],
        still_qualifies: &dyn Fn(&Issue) -> bool,
    ) -> Result<Vec<Issue>>;

    /// Append a mess rating.
    fn save_mess_rating(&self, rating: &MessRating) -> Result<()>;

    /// List all mess ratings in submission order.
    fn list_mess_ratings(&self) -> Result<Vec<MessRating>>;

    /// Root directory of this backend (where `config.toml` lives).
    fn root(&self) -> &std::path::Path;
}
