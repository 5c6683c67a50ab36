//! Immutable point-in-time view of a session

use chrono::{DateTime, Local};
use sandlease_util::SandboxId;
use serde::{Deserialize, Serialize};

use crate::{ClampNotice, EndReason, SessionState};

/// Snapshot of session state pushed to observers after every mutation
///
/// A new snapshot replaces the old one on each change; snapshots are never
/// mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Live sandbox, if any
    pub sandbox_id: Option<SandboxId>,

    pub state: SessionState,

    /// Wall-clock instant the current active period began
    pub start_time: Option<DateTime<Local>>,

    /// Clamped duration of the current or most recent session
    pub duration_minutes: u32,

    /// Seconds left before auto-pause (meaningful in `Active`)
    pub remaining_seconds: u64,

    /// Seconds left before auto-termination (meaningful in `Paused`)
    pub pause_countdown_seconds: u64,

    /// Last error description
    pub error: Option<String>,

    /// Why the most recent sandbox was torn down
    pub end_reason: Option<EndReason>,
}

impl SessionSnapshot {
    /// Snapshot of a machine that has never started a session
    pub fn idle() -> Self {
        Self {
            sandbox_id: None,
            state: SessionState::Idle,
            start_time: None,
            duration_minutes: 0,
            remaining_seconds: 0,
            pause_countdown_seconds: 0,
            error: None,
            end_reason: None,
        }
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}

/// Result of a successful `start`
#[derive(Debug, Clone)]
pub struct StartOutcome {
    /// Snapshot taken right after entering `Active`
    pub snapshot: SessionSnapshot,

    /// Set when the requested duration was adjusted by plan policy
    pub clamp: Option<ClampNotice>,
}
