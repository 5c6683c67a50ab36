//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Session lifecycle settings
    #[serde(default)]
    pub session: RawSessionConfig,

    /// Sandbox backend settings
    #[serde(default)]
    pub provider: RawProviderConfig,
}

/// Session lifecycle settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawSessionConfig {
    /// Duration used when none is requested (default: 59)
    pub default_duration_minutes: Option<u32>,

    /// Ceiling for privileged accounts (default: 1439)
    pub max_duration_minutes: Option<u32>,

    /// Grace window after auto-pause (default: 59)
    pub pause_warning_seconds: Option<u64>,

    /// Privileged account flag
    #[serde(default)]
    pub is_pro: bool,

    /// Upper bound on any single provider call (default: 120)
    pub provider_timeout_seconds: Option<u64>,
}

/// Sandbox backend settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawProviderConfig {
    /// Backend kind: "http" or "mock" (default: "http")
    pub kind: Option<String>,

    /// Service root for the HTTP backend
    pub base_url: Option<String>,

    /// Credential for the provisioning service
    pub api_key: Option<String>,

    /// Interpreter used to run snippets (default: "python3")
    pub language: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
            config_version = 1

            [session]
            default_duration_minutes = 30
            max_duration_minutes = 600
            pause_warning_seconds = 45
            is_pro = true

            [provider]
            kind = "http"
            base_url = "http://localhost:8080"
            api_key = "key"
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.session.default_duration_minutes, Some(30));
        assert!(config.session.is_pro);
        assert_eq!(config.provider.base_url.as_deref(), Some("http://localhost:8080"));
    }

    #[test]
    fn sections_are_optional() {
        let config: RawConfig = toml::from_str("config_version = 1").unwrap();
        assert!(config.session.default_duration_minutes.is_none());
        assert!(!config.session.is_pro);
        assert!(config.provider.kind.is_none());
    }
}
