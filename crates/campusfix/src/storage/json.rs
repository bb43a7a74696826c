//! JSON file-based storage implementation.
//!
//! All data is stored as JSON files in a `data/` directory with atomic writes.

use crate::domain::{Issue, Priority, User};
use crate::mess::MessRating;
use crate::storage::lock::FileLocker;
use crate::storage::{IssueStore, WriteBatch};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

const ISSUES_DIR: &str = "data/issues";
const USERS_DIR: &str = "data/users";
const INDEX_FILE: &str = "data/index.json";
const MESS_RATINGS_FILE: &str = "data/mess_ratings.jsonl";
const WRITE_LOCK_FILE: &str = "data/.write.lock";

/// Index of all records in the repository
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Index {
    /// Schema version for future migrations
    schema_version: u32,
    /// Issue IDs in creation order
    all_ids: Vec<String>,
    #[serde(default)]
    user_ids: Vec<String>,
}

impl Default for Index {
    fn default() -> Self {
        Self {
            schema_version: 1,
            all_ids: Vec::new(),
            user_ids: Vec::new(),
        }
    }
}

impl Index {
    /// Record IDs; returns true if anything was added
    fn track(&mut self, issues: &[Issue], users: &[User]) -> bool {
        let mut changed = false;
        for issue in issues {
            if !self.all_ids.contains(&issue.id) {
                self.all_ids.push(issue.id.clone());
                changed = true;
            }
        }
        for user in users {
            if !self.user_ids.contains(&user.id) {
                self.user_ids.push(user.id.clone());
                changed = true;
            }
        }
        changed
    }
}

/// JSON file-based storage for issues, users, and mess ratings.
///
/// Each issue is a separate JSON file in `data/issues/` (comments embedded),
/// each user a file in `data/users/`, and mess ratings are appended to
/// `data/mess_ratings.jsonl`. All file writes are atomic (write to temp file,
/// then rename). Multi-record writes hold an advisory lock on
/// `data/.write.lock`.
#[derive(Clone)]
pub struct JsonFileStorage {
    root: PathBuf,
    locker: FileLocker,
}

impl JsonFileStorage {
    /// Create a new JSON file storage instance at the given root path
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            locker: FileLocker::default(),
        }
    }

    fn issue_path(&self, id: &str) -> PathBuf {
        self.root.join(ISSUES_DIR).join(format!("{}.json", id))
    }

    fn user_path(&self, id: &str) -> PathBuf {
        self.root.join(USERS_DIR).join(format!("{}.json", id))
    }

    fn temp_path(path: &Path) -> PathBuf {
        path.with_extension("json.tmp")
    }

    fn write_temp<T: Serialize>(path: &Path, data: &T) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(data).context("Failed to serialize data")?;
        let temp_path = Self::temp_path(path);
        fs::write(&temp_path, json)
            .with_context(|| format!("Failed to write temporary file: {}", temp_path.display()))?;
        Ok(temp_path)
    }

    fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        // Atomic write: write to temp file, then rename
        let temp_path = Self::write_temp(path, data)?;
        fs::rename(&temp_path, path).context("Failed to rename temporary file")?;
        Ok(())
    }

    fn read_json<T: for<'de> Deserialize<'de>>(&self, path: &Path) -> Result<T> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to deserialize {}", path.display()))
    }

    fn read_optional<T: for<'de> Deserialize<'de>>(&self, path: &Path) -> Result<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        self.read_json(path).map(Some)
    }

    fn load_index(&self) -> Result<Index> {
        self.read_json(&self.root.join(INDEX_FILE))
    }

    fn save_index(&self, index: &Index) -> Result<()> {
        self.write_json(&self.root.join(INDEX_FILE), index)
    }

    fn lock_writes(&self) -> Result<crate::storage::lock::LockGuard> {
        self.locker.lock_exclusive(&self.root.join(WRITE_LOCK_FILE))
    }

    /// Stage every record to a temp file, then rename them all into place.
    ///
    /// Nothing is visible until every temp file exists. Caller holds the
    /// write lock.
    fn commit_records(&self, issues: &[Issue], users: &[User]) -> Result<()> {
        let mut targets: Vec<PathBuf> = issues.iter().map(|i| self.issue_path(&i.id)).collect();
        targets.extend(users.iter().map(|u| self.user_path(&u.id)));

        let staged: Result<Vec<PathBuf>> = issues
            .iter()
            .zip(&targets)
            .map(|(issue, path)| Self::write_temp(path, issue))
            .chain(
                users
                    .iter()
                    .zip(&targets[issues.len()..])
                    .map(|(user, path)| Self::write_temp(path, user)),
            )
            .collect();

        let staged = match staged {
            Ok(staged) => staged,
            Err(e) => {
                for path in &targets {
                    let _ = fs::remove_file(Self::temp_path(path));
                }
                return Err(e.context("Failed to stage write batch"));
            }
        };

        for (temp, target) in staged.iter().zip(&targets) {
            fs::rename(temp, target)
                .with_context(|| format!("Failed to commit {}", target.display()))?;
        }
        Ok(())
    }
}

impl IssueStore for JsonFileStorage {
    fn init(&self) -> Result<()> {
        fs::create_dir_all(self.root.join(ISSUES_DIR)).context("Failed to create issues directory")?;
        fs::create_dir_all(self.root.join(USERS_DIR)).context("Failed to create users directory")?;

        // Create index.json if it doesn't exist
        let index_path = self.root.join(INDEX_FILE);
        if !index_path.exists() {
            self.write_json(&index_path, &Index::default())?;
        }

        let ratings_path = self.root.join(MESS_RATINGS_FILE);
        if !ratings_path.exists() {
            fs::File::create(&ratings_path).context("Failed to create mess ratings file")?;
        }

        Ok(())
    }

    fn ping(&self) -> Result<()> {
        let index_path = self.root.join(INDEX_FILE);
        fs::metadata(&index_path).with_context(|| {
            format!(
                "Storage not initialized: {} is missing",
                index_path.display()
            )
        })?;
        Ok(())
    }

    fn save_issue(&self, issue: &Issue) -> Result<()> {
        let _guard = self.lock_writes()?;
        self.write_json(&self.issue_path(&issue.id), issue)?;

        // Update index
        let mut index = self.load_index()?;
        if index.track(std::slice::from_ref(issue), &[]) {
            self.save_index(&index)?;
        }

        Ok(())
    }

    fn load_issue(&self, id: &str) -> Result<Option<Issue>> {
        self.read_optional(&self.issue_path(id))
    }

    fn delete_issue(&self, id: &str) -> Result<bool> {
        let _guard = self.lock_writes()?;
        let issue_path = self.issue_path(id);
        if !issue_path.exists() {
            return Ok(false);
        }

        // Unlisted before the file goes, so readers never see a dangling ID
        let mut index = self.load_index()?;
        index.all_ids.retain(|i| i != id);
        self.save_index(&index)?;

        fs::remove_file(&issue_path).context("Failed to delete issue file")?;
        Ok(true)
    }

    fn list_issues(&self) -> Result<Vec<Issue>> {
        let index = self.load_index()?;
        let mut issues = Vec::with_capacity(index.all_ids.len());
        for id in &index.all_ids {
            match self.read_optional::<Issue>(&self.issue_path(id))? {
                Some(issue) => issues.push(issue),
                None => tracing::debug!(issue = %id, "indexed issue file missing, skipped"),
            }
        }
        Ok(issues)
    }

    fn save_user(&self, user: &User) -> Result<()> {
        let _guard = self.lock_writes()?;
        self.write_json(&self.user_path(&user.id), user)?;

        let mut index = self.load_index()?;
        if index.track(&[], std::slice::from_ref(user)) {
            self.save_index(&index)?;
        }
        Ok(())
    }

    fn load_user(&self, id: &str) -> Result<Option<User>> {
        self.read_optional(&self.user_path(id))
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let index = self.load_index()?;
        let mut users = index
            .user_ids
            .iter()
            .map(|id| self.read_json(&self.user_path(id)))
            .collect::<Result<Vec<User>>>()?;
        users.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(users)
    }

    fn apply(&self, batch: &WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let _guard = self.lock_writes()?;
        self.commit_records(&batch.issues, &batch.users)?;

        let mut index = self.load_index()?;
        if index.track(&batch.issues, &batch.users) {
            self.save_index(&index)?;
        }

        tracing::debug!(records = batch.len(), "committed write batch");
        Ok(())
    }

    fn promote_to_high(
        &self,
        ids: &[String],
        still_qualifies: &dyn Fn(&Issue) -> bool,
    ) -> Result<Vec<Issue>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let _guard = self.lock_writes()?;

        let mut promoted = Vec::new();
        for id in ids {
            if let Some(mut issue) = self.read_optional::<Issue>(&self.issue_path(id))? {
                if still_qualifies(&issue) {
                    issue.priority = Priority::High;
                    promoted.push(issue);
                }
            }
        }
        self.commit_records(&promoted, &[])?;

        tracing::debug!(promoted = promoted.len(), "promoted issues to high priority");
        Ok(promoted)
    }

    fn save_mess_rating(&self, rating: &MessRating) -> Result<()> {
        let ratings_path = self.root.join(MESS_RATINGS_FILE);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&ratings_path)
            .context("Failed to open mess ratings file")?;

        let json = serde_json::to_string(rating).context("Failed to serialize mess rating")?;
        writeln!(file, "{}", json).context("Failed to write mess rating")?;
        Ok(())
    }

    fn list_mess_ratings(&self) -> Result<Vec<MessRating>> {
        let ratings_path = self.root.join(MESS_RATINGS_FILE);
        if !ratings_path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(&ratings_path).context("Failed to open mess ratings file")?;
        let reader = BufReader::new(file);

        let mut ratings = Vec::new();
        for line in reader.lines() {
            let line = line.context("Failed to read line from mess ratings file")?;
            if line.trim().is_empty() {
                continue;
            }
            let rating: MessRating =
                serde_json::from_str(&line).context("Failed to deserialize mess rating")?;
            ratings.push(rating);
        }

        Ok(ratings)
    }

    fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IssueDraft, Priority, Role, Status};
    use tempfile::TempDir;

    fn setup_storage() -> (TempDir, JsonFileStorage) {
        let temp_dir = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(temp_dir.path());
        (temp_dir, storage)
    }

    fn issue(title: &str) -> Issue {
        Issue::new(
            IssueDraft {
                title: title.to_string(),
                description: "Desc".to_string(),
                category: "Civil".to_string(),
                sub_location: "Library".to_string(),
                specific_location: "Reading hall".to_string(),
                priority: Priority::Medium,
                image_data: None,
            },
            "owner".to_string(),
            chrono::Utc::now(),
        )
    }

    #[test]
    fn test_init_creates_directory_structure() {
        let (_temp, storage) = setup_storage();

        storage.init().unwrap();

        assert!(storage.root.join(ISSUES_DIR).exists());
        assert!(storage.root.join(USERS_DIR).exists());
        assert!(storage.root.join(INDEX_FILE).exists());
        assert!(storage.root.join(MESS_RATINGS_FILE).exists());
    }

    #[test]
    fn test_init_is_idempotent() {
        let (_temp, storage) = setup_storage();

        storage.init().unwrap();
        let i = issue("Keep me");
        storage.save_issue(&i).unwrap();
        storage.init().unwrap();

        assert_eq!(storage.list_issues().unwrap().len(), 1);
    }

    #[test]
    fn test_ping_fails_before_init() {
        let (_temp, storage) = setup_storage();

        let err = storage.ping().unwrap_err();
        assert!(err.to_string().contains("not initialized"));

        storage.init().unwrap();
        storage.ping().unwrap();
    }

    #[test]
    fn test_save_issue_twice_doesnt_duplicate_in_index() {
        let (_temp, storage) = setup_storage();
        storage.init().unwrap();

        let mut i = issue("Test");
        storage.save_issue(&i).unwrap();

        i.title = "Updated".to_string();
        storage.save_issue(&i).unwrap();

        let index = storage.load_index().unwrap();
        assert_eq!(index.all_ids.iter().filter(|id| *id == &i.id).count(), 1);
        assert_eq!(storage.load_issue(&i.id).unwrap().unwrap().title, "Updated");
    }

    #[test]
    fn test_delete_issue_removes_file_and_updates_index() {
        let (_temp, storage) = setup_storage();
        storage.init().unwrap();

        let i = issue("Test");
        storage.save_issue(&i).unwrap();
        assert!(storage.issue_path(&i.id).exists());

        assert!(storage.delete_issue(&i.id).unwrap());
        assert!(!storage.issue_path(&i.id).exists());
        assert!(!storage.load_index().unwrap().all_ids.contains(&i.id));
    }

    #[test]
    fn test_list_skips_indexed_issue_without_file() {
        let (_temp, storage) = setup_storage();
        storage.init().unwrap();

        let kept = issue("Kept");
        let gone = issue("Gone");
        storage.save_issue(&kept).unwrap();
        storage.save_issue(&gone).unwrap();

        // A delete interrupted between its two steps
        fs::remove_file(storage.issue_path(&gone.id)).unwrap();

        let listed = storage.list_issues().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, kept.id);
    }

    #[test]
    fn test_promote_leaves_no_temp_files() {
        let (_temp, storage) = setup_storage();
        storage.init().unwrap();

        let i = issue("Stale");
        storage.save_issue(&i).unwrap();

        let promoted = storage.promote_to_high(&[i.id.clone()], &|_| true).unwrap();
        assert_eq!(promoted.len(), 1);
        assert_eq!(storage.load_issue(&i.id).unwrap().unwrap().priority, Priority::High);
        assert!(!JsonFileStorage::temp_path(&storage.issue_path(&i.id)).exists());
    }

    #[test]
    fn test_apply_leaves_no_temp_files() {
        let (_temp, storage) = setup_storage();
        storage.init().unwrap();

        let mut a = issue("A");
        let mut b = issue("B");
        storage.save_issue(&a).unwrap();
        storage.save_issue(&b).unwrap();

        a.status = Status::Resolved;
        b.priority = Priority::High;
        let owner = User::new("Ravi", Role::Student);
        storage
            .apply(&WriteBatch::with_issues(vec![a.clone(), b.clone()]).user(owner.clone()))
            .unwrap();

        assert_eq!(storage.load_issue(&a.id).unwrap().unwrap().status, Status::Resolved);
        assert_eq!(storage.load_issue(&b.id).unwrap().unwrap().priority, Priority::High);
        assert!(storage.load_index().unwrap().user_ids.contains(&owner.id));

        let leftovers = fs::read_dir(storage.root.join(ISSUES_DIR))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_apply_failure_writes_nothing() {
        let (_temp, storage) = setup_storage();
        storage.init().unwrap();

        let mut i = issue("Before");
        storage.save_issue(&i).unwrap();

        // Users directory missing makes staging the user fail
        fs::remove_dir_all(storage.root.join(USERS_DIR)).unwrap();

        i.status = Status::Resolved;
        let result = storage.apply(&WriteBatch::new().issue(i.clone()).user(User::new("Ravi", Role::Student)));

        assert!(result.is_err());
        assert_eq!(storage.load_issue(&i.id).unwrap().unwrap().status, Status::Pending);
        assert!(!JsonFileStorage::temp_path(&storage.issue_path(&i.id)).exists());
    }

    #[test]
    fn test_mess_ratings_skip_blank_lines() {
        let (_temp, storage) = setup_storage();
        storage.init().unwrap();

        let offset = chrono::FixedOffset::east_opt(330 * 60).unwrap();
        let draft = crate::mess::MessRatingDraft {
            mess_name: "Veg Mess".to_string(),
            hygiene: 5,
            taste: 3,
            quality: 4,
            review: Some("Clean tables".to_string()),
            suggestions: None,
            image_data: None,
        };
        storage
            .save_mess_rating(&MessRating::new(draft, Some("u1".to_string()), chrono::Utc::now(), &offset))
            .unwrap();

        let mut file = OpenOptions::new()
            .append(true)
            .open(storage.root.join(MESS_RATINGS_FILE))
            .unwrap();
        writeln!(file).unwrap();

        let ratings = storage.list_mess_ratings().unwrap();
        assert_eq!(ratings.len(), 1);
        assert_eq!(ratings[0].user_id.as_deref(), Some("u1"));
    }
}
