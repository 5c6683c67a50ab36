//! Session types shared between the sandlease core and its clients
//!
//! This crate defines the values that cross the core's boundary:
//! - Session states and the immutable snapshots pushed to observers
//! - Termination reasons
//! - Duration clamp notices returned from `start`

mod snapshot;
mod types;

pub use snapshot::*;
pub use types::*;
