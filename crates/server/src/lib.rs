//! CampusFix REST API Server Library
//!
//! HTTP transport over the lifecycle engine: every route resolves the
//! bearer identity, calls one engine operation, and maps its error kind to a
//! status code.

pub mod error;
pub mod routes;

// Re-export for convenience
pub use error::ApiError;
pub use routes::create_routes;
