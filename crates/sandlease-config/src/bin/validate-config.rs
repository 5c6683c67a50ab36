//! Config validation CLI tool
//!
//! Validates a sandlease configuration file and reports any errors.

use sandlease_config::{ConfigError, ProviderKind, CURRENT_CONFIG_VERSION};
use sandlease_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a sandlease configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match sandlease_config::load_config(&config_path) {
        Ok(settings) => {
            let session = &settings.session;
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", CURRENT_CONFIG_VERSION);
            println!("  Default duration: {} min", session.default_duration_minutes);
            println!("  Max duration: {} min", session.max_duration_minutes);
            println!("  Pause warning: {} s", session.pause_warning_seconds);
            println!("  Plan: {}", if session.is_pro { "privileged" } else { "standard" });
            println!("  Provider timeout: {} s", session.provider_timeout.as_secs());
            match settings.provider.kind {
                ProviderKind::Http => println!(
                    "  Provider: http ({})",
                    settings.provider.base_url.as_deref().unwrap_or("-")
                ),
                ProviderKind::Mock => println!("  Provider: mock"),
            }
            if session.api_key.is_empty() {
                println!("  API key: not set (SANDLEASE_API_KEY can supply it)");
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver, CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
