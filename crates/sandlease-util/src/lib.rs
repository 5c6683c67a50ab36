//! Shared utilities for sandlease
//!
//! This crate provides:
//! - ID types (SandboxId, SubscriptionId)
//! - Time utilities (wall clock, monotonic instants, countdown formatting)
//! - Default paths for the configuration file

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
