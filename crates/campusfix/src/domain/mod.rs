//! Core domain types and operations for the maintenance tracker.
//!
//! This module provides the domain layer containing:
//! - **types**: Core data structures (User, Issue, Comment, Status, Priority, views)
//! - **queries**: Pure query operations on issue collections (visibility, ordering, stats)

pub mod queries;
pub mod types;

pub use types::*;
