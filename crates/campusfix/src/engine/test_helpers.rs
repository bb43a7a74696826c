//! Test helper functions for engine tests.
//!
//! Provides reusable setup so each test module gets an engine wired to
//! recording collaborators and a controllable clock.

use crate::clock::FixedClock;
use crate::config::CampusConfig;
use crate::domain::{Issue, IssueDraft, Priority, Role, User};
use crate::engine::LifecycleEngine;
use crate::issue_log::MemoryIssueLog;
use crate::mess::MessRating;
use crate::notify::MemoryNotifier;
use crate::storage::{InMemoryStorage, IssueStore, WriteBatch};
use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub struct TestContext<S: IssueStore> {
    pub engine: LifecycleEngine<S>,
    pub notifier: Arc<MemoryNotifier>,
    pub issue_log: Arc<MemoryIssueLog>,
    pub clock: Arc<FixedClock>,
}

impl<S: IssueStore> TestContext<S> {
    pub fn register(&self, user: User) -> User {
        self.engine.register_user(user).unwrap()
    }

    pub fn student(&self, name: &str, hostel: &str) -> User {
        self.register(User::new(name, Role::Student).with_hostel(hostel))
    }

    pub fn staff(&self, name: &str) -> User {
        self.register(User::new(name, Role::Staff))
    }

    pub fn user(&self, id: &str) -> User {
        self.engine.storage().load_user(id).unwrap().unwrap()
    }
}

/// Monday 2025-06-09 00:00 on the campus clock (+05:30).
pub fn monday_midnight_ist() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 8, 18, 30, 0).unwrap()
}

pub fn draft(title: &str, sub_location: &str, category: &str) -> IssueDraft {
    IssueDraft {
        title: title.to_string(),
        description: format!("{} needs attention", title),
        category: category.to_string(),
        sub_location: sub_location.to_string(),
        specific_location: "Ground floor".to_string(),
        priority: Priority::Medium,
        image_data: None,
    }
}

fn wire<S: IssueStore>(storage: S) -> TestContext<S> {
    storage.init().unwrap();
    let notifier = Arc::new(MemoryNotifier::new());
    let issue_log = Arc::new(MemoryIssueLog::new());
    let clock = Arc::new(FixedClock::new(monday_midnight_ist()));

    let engine = LifecycleEngine::new(storage, CampusConfig::default())
        .with_notifier(notifier.clone())
        .with_issue_log(issue_log.clone())
        .with_clock(clock.clone());

    TestContext {
        engine,
        notifier,
        issue_log,
        clock,
    }
}

/// Engine over fresh in-memory storage.
pub fn setup() -> TestContext<InMemoryStorage> {
    wire(InMemoryStorage::new())
}

/// Engine over storage whose health check and batch commits can be made to fail.
pub fn setup_flaky() -> TestContext<FlakyStorage> {
    wire(FlakyStorage::default())
}

type Hook = Box<dyn FnOnce() + Send>;

/// In-memory storage with switchable failures and a one-shot hook that runs
/// right after the next issue listing is read.
#[derive(Clone, Default)]
pub struct FlakyStorage {
    inner: InMemoryStorage,
    fail_apply: Arc<AtomicBool>,
    fail_ping: Arc<AtomicBool>,
    after_list: Arc<Mutex<Option<Hook>>>,
}

impl FlakyStorage {
    /// Handle on the same data, bypassing failures and hooks.
    pub fn shared(&self) -> InMemoryStorage {
        self.inner.clone()
    }

    /// Run `hook` once, between the next `list_issues` read and its caller.
    pub fn after_next_list(&self, hook: impl FnOnce() + Send + 'static) {
        *self.after_list.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn fail_apply(&self, fail: bool) {
        self.fail_apply.store(fail, Ordering::SeqCst);
    }

    pub fn fail_ping(&self, fail: bool) {
        self.fail_ping.store(fail, Ordering::SeqCst);
    }
}

impl IssueStore for FlakyStorage {
    fn init(&self) -> Result<()> {
        self.inner.init()
    }

    fn ping(&self) -> Result<()> {
        if self.fail_ping.load(Ordering::SeqCst) {
            anyhow::bail!("connection refused");
        }
        self.inner.ping()
    }

    fn save_issue(&self, issue: &Issue) -> Result<()> {
        self.inner.save_issue(issue)
    }

    fn load_issue(&self, id: &str) -> Result<Option<Issue>> {
        self.inner.load_issue(id)
    }

    fn delete_issue(&self, id: &str) -> Result<bool> {
        self.inner.delete_issue(id)
    }

    fn list_issues(&self) -> Result<Vec<Issue>> {
        let issues = self.inner.list_issues()?;
        let hook = self.after_list.lock().unwrap().take();
        if let Some(hook) = hook {
            hook();
        }
        Ok(issues)
    }

    fn save_user(&self, user: &User) -> Result<()> {
        self.inner.save_user(user)
    }

    fn load_user(&self, id: &str) -> Result<Option<User>> {
        self.inner.load_user(id)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        self.inner.list_users()
    }

    fn apply(&self, batch: &WriteBatch) -> Result<()> {
        if self.fail_apply.load(Ordering::SeqCst) {
            anyhow::bail!("write batch rejected");
        }
        self.inner.apply(batch)
    }

    fn promote_to_high(
        &self,
        ids: &[String],
        still_qualifies: &dyn Fn(&Issue) -> bool,
    ) -> Result<Vec<Issue>> {
        if self.fail_apply.load(Ordering::SeqCst) {
            anyhow::bail!("write batch rejected");
        }
        self.inner.promote_to_high(ids, still_qualifies)
    }

    fn save_mess_rating(&self, rating: &MessRating) -> Result<()> {
        self.inner.save_mess_rating(rating)
    }

    fn list_mess_ratings(&self) -> Result<Vec<MessRating>> {
        self.inner.list_mess_ratings()
    }

    fn root(&self) -> &Path {
        self.inner.root()
    }
}
