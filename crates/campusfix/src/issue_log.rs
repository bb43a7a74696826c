//! External record of newly created issues.
//!
//! Each new issue produces one [`IssueLogRecord`] that is handed to an
//! [`IssueLog`]. Logging is best-effort: implementations absorb their own
//! failures, so a broken log sink never fails issue creation.

use crate::domain::{Issue, Priority, Status, User};
use anyhow::{Context, Result};
use chrono::{FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One row describing a newly reported issue and its reporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueLogRecord {
    pub ticket_id: String,
    /// Creation date on the campus local clock
    pub date: NaiveDate,
    pub student_name: String,
    pub email: Option<String>,
    pub hostel: Option<String>,
    pub room: Option<String>,
    pub category: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: Status,
    pub trust_score: f64,
}

impl IssueLogRecord {
    pub fn new(issue: &Issue, owner: &User, offset: &FixedOffset) -> Self {
        Self {
            ticket_id: issue.id.clone(),
            date: issue.created_at.with_timezone(offset).date_naive(),
            student_name: owner.full_name.clone(),
            email: owner.email.clone(),
            hostel: owner.hostel.clone(),
            room: owner.room_no.clone(),
            category: issue.category.clone(),
            title: issue.title.clone(),
            description: issue.description.clone(),
            priority: issue.priority,
            status: issue.status,
            trust_score: owner.trust_score,
        }
    }
}

/// Sink for creation records.
pub trait IssueLog: Send + Sync {
    /// Record a new issue. Must not fail the caller.
    fn log_created(&self, record: IssueLogRecord);
}

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopIssueLog;

impl IssueLog for NoopIssueLog {
    fn log_created(&self, _record: IssueLogRecord) {}
}

/// Keeps records in memory instead of writing them anywhere.
#[derive(Debug, Default)]
pub struct MemoryIssueLog {
    records: Mutex<Vec<IssueLogRecord>>,
}

impl MemoryIssueLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<IssueLogRecord> {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl IssueLog for MemoryIssueLog {
    fn log_created(&self, record: IssueLogRecord) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
    }
}

/// Appends one JSON line per record to a file.
#[derive(Debug)]
pub struct JsonlIssueLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlIssueLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, record: &IssueLogRecord) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open issue log {}", self.path.display()))?;

        let json = serde_json::to_string(record).context("Failed to serialize issue log record")?;
        writeln!(file, "{}", json).context("Failed to write issue log record")?;
        Ok(())
    }

    /// Read back every record in the log.
    pub fn read_all(&self) -> Result<Vec<IssueLogRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read issue log {}", self.path.display()))?;
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).context("Failed to deserialize issue log record"))
            .collect()
    }
}

impl IssueLog for JsonlIssueLog {
    fn log_created(&self, record: IssueLogRecord) {
        match self.append(&record) {
            Ok(()) => tracing::info!(ticket = %record.ticket_id, "logged new issue"),
            Err(e) => tracing::warn!(ticket = %record.ticket_id, error = %e, "failed to log issue"),
        }
    }
}
