//! Centralized error handling
//!
//! Library code returns the typed [`AppError`]; the binary converts to
//! `anyhow::Error` at its edge.

pub mod context;
pub mod types;

pub use context::ErrorContextExt;
pub use types::{AppError, AppResult};
