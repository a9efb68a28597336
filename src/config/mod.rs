//! Application configuration and constants.
//!
//! This module provides:
//! - Writer and pool default constants
//! - CLI option types and parsing (flags fall back to environment variables)

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{LogFormat, LogLevel, Opt};
