//! Sandbox handle abstraction

use sandlease_util::SandboxId;
use std::fmt;

/// Opaque handle to a live sandbox
///
/// Created by the provider on `create` and exclusively owned by the session
/// core afterwards; providers only ever borrow it for the length of a call.
#[derive(Debug)]
pub struct SandboxHandle {
    /// Stable identifier of the sandbox
    pub id: SandboxId,

    /// Backend-specific payload (opaque to core)
    payload: HandlePayload,
}

impl SandboxHandle {
    pub fn new(id: SandboxId, payload: HandlePayload) -> Self {
        Self { id, payload }
    }

    pub fn payload(&self) -> &HandlePayload {
        &self.payload
    }
}

/// Backend-specific handle payload
pub enum HandlePayload {
    /// Remote REST service: session path segment plus the bearer token
    /// the session was created with
    Http { session_id: String, token: String },

    /// Mock for testing
    Mock { id: u64 },
}

impl HandlePayload {
    /// Numeric id of a mock sandbox, if this is one
    pub fn mock_id(&self) -> Option<u64> {
        match self {
            HandlePayload::Mock { id } => Some(*id),
            HandlePayload::Http { .. } => None,
        }
    }
}

impl fmt::Debug for HandlePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlePayload::Http { session_id, .. } => f
                .debug_struct("Http")
                .field("session_id", session_id)
                .field("token", &"<redacted>")
                .finish(),
            HandlePayload::Mock { id } => f.debug_struct("Mock").field("id", id).finish(),
        }
    }
}
