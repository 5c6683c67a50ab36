//! Validated settings structures

use crate::schema::{RawConfig, RawProviderConfig, RawSessionConfig};
use crate::validation::parse_provider_kind;
use std::fmt;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_DURATION_MINUTES: u32 = 59;
pub const DEFAULT_MAX_DURATION_MINUTES: u32 = 1439;
pub const DEFAULT_PAUSE_WARNING_SECONDS: u64 = 59;
pub const DEFAULT_PROVIDER_TIMEOUT_SECONDS: u64 = 120;
pub const DEFAULT_LANGUAGE: &str = "python3";

/// Validated settings ready for use by the binary
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub session: SessionConfig,
    pub provider: ProviderSettings,
}

impl Settings {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let api_key = raw.provider.api_key.clone().unwrap_or_default();
        Self {
            session: SessionConfig::from_raw(raw.session, api_key),
            provider: ProviderSettings::from_raw(raw.provider),
        }
    }

    /// Replace the credential, e.g. with one supplied on the command line
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        if let Some(key) = api_key {
            self.session.api_key = key;
        }
        self
    }

    /// Log a warning when no credential is configured.
    ///
    /// Returns whether a credential is present; a missing key is never fatal.
    pub fn check_credentials(&self) -> bool {
        if self.session.api_key.is_empty() && self.provider.kind == ProviderKind::Http {
            warn!("No API key configured; set SANDLEASE_API_KEY or provider.api_key");
            return false;
        }
        true
    }
}

/// Immutable session lifecycle configuration, handed to the core once
#[derive(Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Opaque credential, passed through to the provider
    pub api_key: String,

    /// Duration used when none is requested; ceiling for non-privileged accounts
    pub default_duration_minutes: u32,

    /// Absolute ceiling for privileged accounts
    pub max_duration_minutes: u32,

    /// Length of the grace window after auto-pause
    pub pause_warning_seconds: u64,

    /// Privileged account flag
    pub is_pro: bool,

    /// Upper bound on any single provider call
    pub provider_timeout: Duration,
}

impl SessionConfig {
    fn from_raw(raw: RawSessionConfig, api_key: String) -> Self {
        Self {
            api_key,
            default_duration_minutes: raw
                .default_duration_minutes
                .unwrap_or(DEFAULT_DURATION_MINUTES),
            max_duration_minutes: raw
                .max_duration_minutes
                .unwrap_or(DEFAULT_MAX_DURATION_MINUTES),
            pause_warning_seconds: raw
                .pause_warning_seconds
                .unwrap_or(DEFAULT_PAUSE_WARNING_SECONDS),
            is_pro: raw.is_pro,
            provider_timeout: Duration::from_secs(
                raw.provider_timeout_seconds
                    .unwrap_or(DEFAULT_PROVIDER_TIMEOUT_SECONDS),
            ),
        }
    }

    pub fn pause_warning(&self) -> Duration {
        Duration::from_secs(self.pause_warning_seconds)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_raw(RawSessionConfig::default(), String::new())
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("default_duration_minutes", &self.default_duration_minutes)
            .field("max_duration_minutes", &self.max_duration_minutes)
            .field("pause_warning_seconds", &self.pause_warning_seconds)
            .field("is_pro", &self.is_pro)
            .field("provider_timeout", &self.provider_timeout)
            .finish()
    }
}

/// Which sandbox backend to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    #[default]
    Http,
    Mock,
}

/// Sandbox backend settings
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub base_url: Option<String>,
    pub language: String,
}

impl ProviderSettings {
    fn from_raw(raw: RawProviderConfig) -> Self {
        Self {
            kind: raw
                .kind
                .as_deref()
                .and_then(|k| parse_provider_kind(k).ok())
                .unwrap_or_default(),
            base_url: raw.base_url,
            language: raw.language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self::from_raw(RawProviderConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.default_duration_minutes, 59);
        assert_eq!(config.max_duration_minutes, 1439);
        assert_eq!(config.pause_warning_seconds, 59);
        assert!(!config.is_pro);
        assert_eq!(config.provider_timeout, Duration::from_secs(120));
    }

    #[test]
    fn debug_redacts_api_key() {
        let settings = Settings::default().with_api_key(Some("e2b_secret".into()));
        let debug = format!("{:?}", settings.session);
        assert!(!debug.contains("e2b_secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn api_key_override() {
        let settings = Settings::default();
        assert!(!settings.check_credentials());

        let settings = settings.with_api_key(Some("key".into()));
        assert_eq!(settings.session.api_key, "key");
        assert!(settings.check_credentials());

        // None leaves the existing key in place
        let settings = settings.with_api_key(None);
        assert_eq!(settings.session.api_key, "key");
    }
}
