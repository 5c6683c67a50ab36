//! Configuration validation

use crate::schema::RawConfig;
use crate::settings::{
    DEFAULT_DURATION_MINUTES, DEFAULT_MAX_DURATION_MINUTES, DEFAULT_PAUSE_WARNING_SECONDS,
    DEFAULT_PROVIDER_TIMEOUT_SECONDS, ProviderKind,
};
use thiserror::Error;

/// Longest grace window accepted after auto-pause
pub const MAX_PAUSE_WARNING_SECONDS: u64 = 3600;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },

    #[error("default_duration_minutes ({default}) exceeds max_duration_minutes ({max})")]
    DefaultExceedsMax { default: u32, max: u32 },

    #[error("pause_warning_seconds ({seconds}) exceeds the {max}s limit")]
    PauseWarningTooLong { seconds: u64, max: u64 },

    #[error("Unknown provider kind: {0}")]
    UnknownProviderKind(String),

    #[error("The http provider requires provider.base_url")]
    MissingBaseUrl,

    #[error("Invalid base_url '{0}': expected an http:// or https:// URL")]
    InvalidBaseUrl(String),
}

/// Validate a raw configuration, collecting every problem found
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let session = &config.session;

    let default = session
        .default_duration_minutes
        .unwrap_or(DEFAULT_DURATION_MINUTES);
    let max = session
        .max_duration_minutes
        .unwrap_or(DEFAULT_MAX_DURATION_MINUTES);
    let pause = session
        .pause_warning_seconds
        .unwrap_or(DEFAULT_PAUSE_WARNING_SECONDS);
    let timeout = session
        .provider_timeout_seconds
        .unwrap_or(DEFAULT_PROVIDER_TIMEOUT_SECONDS);

    if default == 0 {
        errors.push(ValidationError::ZeroValue {
            field: "default_duration_minutes",
        });
    }
    if max == 0 {
        errors.push(ValidationError::ZeroValue {
            field: "max_duration_minutes",
        });
    }
    if pause == 0 {
        errors.push(ValidationError::ZeroValue {
            field: "pause_warning_seconds",
        });
    }
    if timeout == 0 {
        errors.push(ValidationError::ZeroValue {
            field: "provider_timeout_seconds",
        });
    }

    if default > max {
        errors.push(ValidationError::DefaultExceedsMax { default, max });
    }

    if pause > MAX_PAUSE_WARNING_SECONDS {
        errors.push(ValidationError::PauseWarningTooLong {
            seconds: pause,
            max: MAX_PAUSE_WARNING_SECONDS,
        });
    }

    errors.extend(validate_provider(config));

    errors
}

fn validate_provider(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let kind = match config.provider.kind.as_deref() {
        None => ProviderKind::Http,
        Some(raw) => match parse_provider_kind(raw) {
            Ok(kind) => kind,
            Err(e) => {
                errors.push(e);
                return errors;
            }
        },
    };

    if kind == ProviderKind::Http {
        match config.provider.base_url.as_deref() {
            None | Some("") => errors.push(ValidationError::MissingBaseUrl),
            Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
                errors.push(ValidationError::InvalidBaseUrl(url.to_string()))
            }
            Some(_) => {}
        }
    }

    errors
}

/// Parse provider kind name
pub fn parse_provider_kind(s: &str) -> Result<ProviderKind, ValidationError> {
    match s.to_lowercase().as_str() {
        "http" | "remote" => Ok(ProviderKind::Http),
        "mock" => Ok(ProviderKind::Mock),
        other => Err(ValidationError::UnknownProviderKind(other.to_string())),
    }
}
