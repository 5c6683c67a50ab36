//! Session lifecycle core for sandlease
//!
//! This crate is the heart of sandlease, containing:
//! - Duration clamping policy (default / plan limit / absolute maximum)
//! - Session state machine (Idle -> Starting -> Active -> Paused -> Terminating -> Terminated)
//! - Named one-shot and periodic timers driving auto-pause, auto-terminate and countdowns
//! - Snapshot broadcasting to observers
//! - The single-task event loop that serializes commands and timer firings

mod error;
mod machine;
mod notify;
mod policy;
mod service;
mod timer;

pub use error::*;
pub use machine::*;
pub use notify::*;
pub use policy::*;
pub use service::*;
pub use timer::*;
