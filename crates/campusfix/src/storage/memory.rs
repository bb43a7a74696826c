//! In-memory storage implementation for tests and embedding.
//!
//! Each instance is isolated; clones share the same data.

use crate::domain::{Issue, Priority, User};
use crate::mess::MessRating;
use crate::storage::{IssueStore, WriteBatch};
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    issues: HashMap<String, Issue>,
    /// Insertion order, so listings are stable like the JSON index
    order: Vec<String>,
    users: HashMap<String, User>,
    mess_ratings: Vec<MessRating>,
}

impl Inner {
    fn put_issue(&mut self, issue: &Issue) {
        if self
            .issues
            .insert(issue.id.clone(), issue.clone())
            .is_none()
        {
            self.order.push(issue.id.clone());
        }
    }
}

/// In-memory storage backend.
///
/// All data is lost when the last clone is dropped.
///
/// # Examples
///
/// ```
/// use campusfix::domain::{Role, User};
/// use campusfix::storage::{InMemoryStorage, IssueStore};
///
/// let storage = InMemoryStorage::new();
/// let user = User::new("Meera", Role::Staff);
/// storage.save_user(&user).unwrap();
///
/// let clone = storage.clone();
/// assert_eq!(clone.load_user(&user.id).unwrap().unwrap().full_name, "Meera");
/// ```
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("In-memory storage lock poisoned"))
    }
}

impl IssueStore for InMemoryStorage {
    fn init(&self) -> Result<()> {
        Ok(())
    }

    fn ping(&self) -> Result<()> {
        self.lock().map(|_| ())
    }

    fn save_issue(&self, issue: &Issue) -> Result<()> {
        self.lock()?.put_issue(issue);
        Ok(())
    }

    fn load_issue(&self, id: &str) -> Result<Option<Issue>> {
        Ok(self.lock()?.issues.get(id).cloned())
    }

    fn delete_issue(&self, id: &str) -> Result<bool> {
        let mut inner = self.lock()?;
        let removed = inner.issues.remove(id).is_some();
        inner.order.retain(|i| i != id);
        Ok(removed)
    }

    fn list_issues(&self) -> Result<Vec<Issue>> {
        let inner = self.lock()?;
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.issues.get(id).cloned())
            .collect())
    }

    fn save_user(&self, user: &User) -> Result<()> {
        self.lock()?.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    fn load_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.lock()?.users.get(id).cloned())
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.lock()?.users.values().cloned().collect();
        users.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(users)
    }

    fn apply(&self, batch: &WriteBatch) -> Result<()> {
        // One guard for the whole batch keeps it atomic for other clones
        let mut inner = self.lock()?;
        for issue in &batch.issues {
            inner.put_issue(issue);
        }
        for user in &batch.users {
            inner.users.insert(user.id.clone(), user.clone());
        }
        Ok(())
    }

    fn promote_to_high(
        &self,
        ids: &[String],
        still_qualifies: &dyn Fn(&Issue) -> bool,
    ) -> Result<Vec<Issue>> {
        let mut inner = self.lock()?;
        let mut promoted = Vec::new();
        for id in ids {
            if let Some(issue) = inner.issues.get_mut(id) {
                if still_qualifies(issue) {
                    issue.priority = Priority::High;
                    promoted.push(issue.clone());
                }
            }
        }
        Ok(promoted)
    }

    fn save_mess_rating(&self, rating: &MessRating) -> Result<()> {
        self.lock()?.mess_ratings.push(rating.clone());
        Ok(())
    }

    fn list_mess_ratings(&self) -> Result<Vec<MessRating>> {
        Ok(self.lock()?.mess_ratings.clone())
    }

    fn root(&self) -> &Path {
        Path::new(".")
    }
}
