//! Shared types for the sandlease API

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of the managed sandbox session
///
/// Exactly one state holds at any instant. `Starting`, `Resuming` and
/// `Terminating` are only ever held while a provider call is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Starting,
    Active,
    Paused,
    Resuming,
    Terminating,
    Terminated,
    Error,
}

impl SessionState {
    pub const ALL: [SessionState; 8] = [
        SessionState::Idle,
        SessionState::Starting,
        SessionState::Active,
        SessionState::Paused,
        SessionState::Resuming,
        SessionState::Terminating,
        SessionState::Terminated,
        SessionState::Error,
    ];

    /// States from which a fresh `start` is accepted
    pub fn can_start(self) -> bool {
        matches!(
            self,
            SessionState::Idle | SessionState::Terminated | SessionState::Error
        )
    }

    /// States in which a sandbox handle must exist
    pub fn holds_sandbox(self) -> bool {
        matches!(
            self,
            SessionState::Active
                | SessionState::Paused
                | SessionState::Resuming
                | SessionState::Terminating
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Starting => "starting",
            SessionState::Active => "active",
            SessionState::Paused => "paused",
            SessionState::Resuming => "resuming",
            SessionState::Terminating => "terminating",
            SessionState::Terminated => "terminated",
            SessionState::Error => "error",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the most recent sandbox was torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The user asked for termination
    UserClosed,
    /// Nobody confirmed continuation before the grace period ran out
    GraceExpired,
    /// Torn down by `continue` so a fresh sandbox could replace it
    Restarted,
}

impl EndReason {
    pub fn message(self) -> &'static str {
        match self {
            EndReason::UserClosed => "Sandbox closed",
            EndReason::GraceExpired => "Sandbox deleted: no response before the grace period ended",
            EndReason::Restarted => "Sandbox replaced by a fresh session",
        }
    }
}

/// A requested session length that policy adjusted downwards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "limit", rename_all = "snake_case")]
pub enum ClampNotice {
    /// Non-privileged account asked for more than the default duration
    PlanLimit { requested: u32, allowed: u32, max: u32 },
    /// Privileged account asked for more than the absolute ceiling
    MaxLimit { requested: u32, allowed: u32 },
}

impl ClampNotice {
    pub fn requested(&self) -> u32 {
        match self {
            ClampNotice::PlanLimit { requested, .. } | ClampNotice::MaxLimit { requested, .. } => {
                *requested
            }
        }
    }

    pub fn allowed(&self) -> u32 {
        match self {
            ClampNotice::PlanLimit { allowed, .. } | ClampNotice::MaxLimit { allowed, .. } => {
                *allowed
            }
        }
    }
}

impl fmt::Display for ClampNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClampNotice::PlanLimit { requested, allowed, max } => write!(
                f,
                "Requested {} minutes, but the standard plan only supports up to {} minutes; \
                 a privileged plan extends this to {} minutes",
                requested, allowed, max
            ),
            ClampNotice::MaxLimit { requested, allowed } => write!(
                f,
                "Requested {} minutes, clamped to the maximum of {} minutes",
                requested, allowed
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sandbox_holding_states() {
        let holding: Vec<_> = SessionState::ALL
            .into_iter()
            .filter(|s| s.holds_sandbox())
            .collect();
        assert_eq!(
            holding,
            vec![
                SessionState::Active,
                SessionState::Paused,
                SessionState::Resuming,
                SessionState::Terminating
            ]
        );
    }

    #[test]
    fn startable_states() {
        assert!(SessionState::Idle.can_start());
        assert!(SessionState::Terminated.can_start());
        assert!(SessionState::Error.can_start());
        assert!(!SessionState::Active.can_start());
        assert!(!SessionState::Paused.can_start());
    }

    #[test]
    fn state_serializes_snake_case() {
        let json = serde_json::to_string(&SessionState::Terminating).unwrap();
        assert_eq!(json, "\"terminating\"");
        assert_eq!(SessionState::Paused.to_string(), "paused");
    }

    #[test]
    fn clamp_notice_accessors_and_text() {
        let notice = ClampNotice::PlanLimit {
            requested: 2000,
            allowed: 59,
            max: 1439,
        };
        assert_eq!(notice.requested(), 2000);
        assert_eq!(notice.allowed(), 59);
        assert!(notice.to_string().contains("59 minutes"));

        let notice = ClampNotice::MaxLimit {
            requested: 2000,
            allowed: 1439,
        };
        assert_eq!(notice.allowed(), 1439);
    }
}
