//! Errors surfaced by the session core

use sandlease_api::SessionState;
use sandlease_provider::ProviderError;
use std::time::Duration;
use thiserror::Error;

/// Error returned from session commands
#[derive(Debug, Error)]
pub enum SessionError {
    /// Command issued in a state that does not permit it
    #[error("{operation} requires {required} (state: {state})")]
    InvalidState {
        operation: &'static str,
        required: &'static str,
        state: SessionState,
    },

    /// Provider call rejected; the provider's message is kept verbatim
    #[error("{context}: {source}")]
    Provider {
        context: &'static str,
        #[source]
        source: ProviderError,
    },

    /// Provider call did not complete in time
    #[error("{context}: provider did not respond within {}s", timeout.as_secs())]
    Timeout {
        context: &'static str,
        timeout: Duration,
    },

    #[error("Session service has stopped")]
    ServiceStopped,
}

impl SessionError {
    pub fn is_precondition(&self) -> bool {
        matches!(self, SessionError::InvalidState { .. })
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_keeps_message_with_prefix() {
        let err = SessionError::Provider {
            context: "Failed to initialize sandbox",
            source: ProviderError::CreateFailed("quota exceeded".into()),
        };
        assert_eq!(
            err.to_string(),
            "Failed to initialize sandbox: Create failed: quota exceeded"
        );
        assert!(!err.is_precondition());
    }

    #[test]
    fn invalid_state_names_operation_and_state() {
        let err = SessionError::InvalidState {
            operation: "execute_code",
            required: "an active session",
            state: SessionState::Paused,
        };
        assert_eq!(
            err.to_string(),
            "execute_code requires an active session (state: paused)"
        );
        assert!(err.is_precondition());
    }

    #[test]
    fn timeout_message() {
        let err = SessionError::Timeout {
            context: "Failed to close sandbox",
            timeout: Duration::from_secs(120),
        };
        assert_eq!(
            err.to_string(),
            "Failed to close sandbox: provider did not respond within 120s"
        );
    }
}
