//! Human-readable session status

use sandlease_api::{SessionSnapshot, SessionState};
use sandlease_util::{format_countdown, format_datetime_full, format_duration};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One-line description of a snapshot
pub fn status_line(snap: &SessionSnapshot) -> String {
    let sandbox = snap
        .sandbox_id
        .as_ref()
        .map(|id| id.as_str())
        .unwrap_or("-");

    match snap.state {
        SessionState::Idle => "Idle. Type `start [minutes]` to provision a sandbox.".to_string(),
        SessionState::Starting => {
            format!("Starting a {} minute sandbox...", snap.duration_minutes)
        }
        SessionState::Active => format!(
            "Active [{}]: {} remaining",
            sandbox,
            format_countdown(snap.remaining_seconds)
        ),
        SessionState::Paused => format!(
            "Paused [{}]: session time is up. Type `continue` within {} or the sandbox will be deleted.",
            sandbox,
            format_countdown(snap.pause_countdown_seconds)
        ),
        SessionState::Resuming => "Resuming with a fresh sandbox...".to_string(),
        SessionState::Terminating => format!("Closing sandbox [{}]...", sandbox),
        SessionState::Terminated => snap
            .end_reason
            .map(|reason| reason.message())
            .unwrap_or("Sandbox closed")
            .to_string(),
        SessionState::Error => format!(
            "Error: {}",
            snap.error.as_deref().unwrap_or("unknown failure")
        ),
    }
}

/// Multi-line report printed by the `status` command
pub fn details(snap: &SessionSnapshot) -> String {
    let mut lines = vec![status_line(snap)];

    if let Some(id) = &snap.sandbox_id {
        lines.push(format!("  sandbox:  {}", id));
    }
    if let Some(started) = &snap.start_time {
        lines.push(format!("  started:  {}", format_datetime_full(started)));
    }
    if snap.duration_minutes > 0 {
        lines.push(format!(
            "  length:   {}",
            format_duration(Duration::from_secs(u64::from(snap.duration_minutes) * 60))
        ));
    }
    if let Some(error) = &snap.error
        && snap.state != SessionState::Error
    {
        lines.push(format!("  last error: {}", error));
    }

    lines.join("\n")
}

/// Whether `next` is worth printing after `prev` was shown.
///
/// State changes always are. Countdowns are shown on minute boundaries
/// while active and every second while paused.
pub fn worth_printing(prev: Option<&SessionSnapshot>, next: &SessionSnapshot) -> bool {
    let Some(prev) = prev else {
        return true;
    };
    if prev.state != next.state {
        return true;
    }

    match next.state {
        SessionState::Active => {
            next.remaining_seconds != prev.remaining_seconds && next.remaining_seconds % 60 == 0
        }
        SessionState::Paused => next.pause_countdown_seconds != prev.pause_countdown_seconds,
        _ => false,
    }
}

/// Snapshot observer that prints status lines as the session evolves
#[derive(Clone, Default)]
pub struct StatusPrinter {
    last: Arc<Mutex<Option<SessionSnapshot>>>,
}

impl StatusPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the line to print for `snap`, if any, and remember it
    pub fn observe(&self, snap: &SessionSnapshot) -> Option<String> {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if !worth_printing(last.as_ref(), snap) {
            return None;
        }
        *last = Some(snap.clone());
        Some(status_line(snap))
    }
}
