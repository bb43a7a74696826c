//! Command-line interface definitions using clap.

use crate::domain::{Priority, Role, Status};
use crate::mess::AnalyticsScope;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;

/// CampusFix maintenance tracker
///
/// Report campus facility issues, move them through their lifecycle, and
/// track reporter trust scores. Data lives in `.campusfix/` (override with
/// CAMPUSFIX_DATA_DIR).
///
/// Exit Codes:
///   0  - Command succeeded
///   1  - Generic error occurred
///   2  - Invalid input or operation not allowed in the current state
///   3  - Issue or user not found
///   4  - Missing or unknown --as user
///   5  - Permission denied
///  10  - Storage failed or is unavailable
#[derive(Parser)]
#[command(name = "campusfix")]
#[command(about = "Campus maintenance issue tracker", long_about = None)]
pub struct Cli {
    /// Act as this user ID
    #[arg(long = "as", global = true, env = "CAMPUSFIX_USER")]
    pub as_user: Option<String>,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output (for scripting)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the data directory
    Init,

    /// User directory commands
    #[command(subcommand)]
    User(UserCommands),

    /// Issue commands
    #[command(subcommand)]
    Issue(IssueCommands),

    /// Dashboard counts for the acting user
    Stats,

    /// Mess rating commands
    #[command(subcommand)]
    Mess(MessCommands),
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a user
    Add {
        /// Full name
        name: String,

        /// student or staff (admin is accepted for staff)
        #[arg(short, long, default_value = "student", value_parser = parse_role)]
        role: Role,

        #[arg(short, long)]
        email: Option<String>,

        #[arg(long)]
        hostel: Option<String>,

        #[arg(long)]
        room: Option<String>,
    },

    /// List users (staff see students only through --students)
    List {
        /// Only students, as the staff directory shows them
        #[arg(long)]
        students: bool,
    },

    /// Edit your own profile (only the given fields change)
    Update {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        /// Hostel you live in; decides which hostel's issues you see
        #[arg(long)]
        hostel: Option<String>,

        #[arg(long)]
        room: Option<String>,
    },

    /// Request a move to another hostel
    RequestHostel { hostel: String },

    /// Approve or reject a student's hostel request (staff only)
    ManageHostel {
        student_id: String,

        #[arg(long, conflicts_with = "reject")]
        approve: bool,

        #[arg(long)]
        reject: bool,
    },
}

#[derive(Subcommand)]
pub enum IssueCommands {
    /// Report a new issue
    Create {
        #[arg(short, long)]
        title: String,

        #[arg(short = 'd', long = "description")]
        description: String,

        #[arg(short, long)]
        category: String,

        /// Hostel, mess, or department
        #[arg(short = 'l', long)]
        location: String,

        /// Room, floor, or landmark
        #[arg(short = 's', long)]
        spot: String,

        #[arg(short, long, default_value = "medium", value_parser = parse_priority)]
        priority: Priority,

        /// Photo as a data URL
        #[arg(long)]
        image: Option<String>,
    },

    /// List visible issues (escalates stale ones first)
    List,

    /// Change an issue's status
    Status {
        id: String,

        /// pending, in_progress, resolved, defected, duplicate, unnecessary
        #[arg(value_parser = parse_status)]
        status: Status,
    },

    /// Delete an issue and its comments
    Delete { id: String },

    /// Comment on an issue
    Comment { id: String, text: String },

    /// Rate a resolved issue
    Rate {
        id: String,

        /// 1 to 5
        rating: u8,

        #[arg(short, long)]
        review: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum MessCommands {
    /// Rate a mess for the current week
    Rate {
        mess: String,

        #[arg(long)]
        hygiene: u8,

        #[arg(long)]
        taste: u8,

        #[arg(long)]
        quality: u8,

        #[arg(short, long)]
        review: Option<String>,

        #[arg(short, long)]
        suggestions: Option<String>,

        /// Photo as a data URL
        #[arg(long)]
        image: Option<String>,
    },

    /// Show averages and sentiment
    Analytics {
        /// Limit to one mess
        #[arg(long)]
        mess: Option<String>,

        /// week or all
        #[arg(long, default_value = "week", value_parser = parse_scope)]
        scope: AnalyticsScope,
    },
}

fn parse_snake<T: DeserializeOwned>(value: &str, what: &str, valid: &str) -> Result<T, String> {
    let normalized = value.trim().to_lowercase().replace(['-', ' '], "_");
    serde_json::from_value(serde_json::Value::String(normalized))
        .map_err(|_| format!("invalid {} '{}' (valid: {})", what, value, valid))
}

pub fn parse_status(value: &str) -> Result<Status, String> {
    parse_snake(
        value,
        "status",
        "pending, in_progress, resolved, defected, duplicate, unnecessary",
    )
}

pub fn parse_priority(value: &str) -> Result<Priority, String> {
    parse_snake(value, "priority", "low, medium, high")
}

pub fn parse_role(value: &str) -> Result<Role, String> {
    parse_snake(value, "role", "student, staff")
}

pub fn parse_scope(value: &str) -> Result<AnalyticsScope, String> {
    parse_snake(value, "scope", "week, all")
}
