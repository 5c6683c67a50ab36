//! sandlease - interactive time-boxed remote code sandboxes
//!
//! Reads commands from stdin, forwards them to the session service and
//! prints status lines as the session moves through its lifecycle.

mod commands;
mod display;

use anyhow::{Context, Result};
use clap::Parser;
use sandlease_config::{load_config_or_default, ProviderKind, Settings};
use sandlease_core::{SessionClient, SessionService};
use sandlease_provider::{HttpProviderConfig, HttpSandboxProvider, MockProvider, SandboxProvider};
use sandlease_util::default_config_path;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::commands::{Command, HELP};
use crate::display::{details, status_line, StatusPrinter};

/// sandlease - time-boxed remote code sandboxes
#[derive(Parser, Debug)]
#[command(name = "sandlease")]
#[command(about = "Run code in a remote sandbox that pauses and cleans itself up", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/sandlease/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Credential for the sandbox service
    #[arg(long, env = "SANDLEASE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Treat the account as privileged (longer sessions allowed)
    #[arg(long)]
    pro: bool,

    /// Use the in-memory provider instead of a remote service
    #[arg(long)]
    mock: bool,

    /// Log level
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

fn build_settings(args: &Args) -> Result<Settings> {
    let mut settings = load_config_or_default(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?
        .with_api_key(args.api_key.clone());

    if args.pro {
        settings.session.is_pro = true;
    }
    if args.mock {
        settings.provider.kind = ProviderKind::Mock;
    }
    Ok(settings)
}

fn build_provider(settings: &Settings) -> Result<Arc<dyn SandboxProvider>> {
    match settings.provider.kind {
        ProviderKind::Mock => Ok(Arc::new(MockProvider::new())),
        ProviderKind::Http => {
            let base_url = settings
                .provider
                .base_url
                .clone()
                .context("provider.base_url must be set to use the http provider")?;

            let provider = HttpSandboxProvider::new(HttpProviderConfig {
                base_url,
                language: settings.provider.language.clone(),
                request_timeout: settings.session.provider_timeout,
            })
            .context("Failed to create HTTP client")?;
            Ok(Arc::new(provider))
        }
    }
}

/// Run one command. Returns false when the user asked to quit.
async fn handle_command(client: &SessionClient, command: Command) -> bool {
    match command {
        Command::Start { minutes } => match client.start(minutes).await {
            Ok(outcome) => {
                if let Some(notice) = outcome.clamp {
                    println!("{}", notice);
                }
            }
            Err(e) => println!("{}", e),
        },
        Command::Continue => match client.continue_session().await {
            Ok(Some(_)) => {}
            Ok(None) => println!("Nothing to continue: the session is not paused"),
            Err(e) => println!("{}", e),
        },
        Command::Stop => match client.terminate_session().await {
            Ok(true) => {}
            Ok(false) => println!("No sandbox is running"),
            Err(e) => println!("{}", e),
        },
        Command::Run { code } => match client.execute_code(code).await {
            Ok(output) => println!("{}", output),
            Err(e) => println!("{}", e),
        },
        Command::List { path } => match client.list_files(path).await {
            Ok(entries) if entries.is_empty() => println!("(empty)"),
            Ok(entries) => {
                for entry in entries {
                    println!("{}", entry);
                }
            }
            Err(e) => println!("{}", e),
        },
        Command::Status => println!("{}", details(&client.snapshot())),
        Command::Help => println!("{}", HELP),
        Command::Quit => return false,
    }
    true
}

async fn run(client: SessionClient) -> Result<()> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", status_line(&client.snapshot()));
    println!("Type `help` for a list of commands.");

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read from stdin")? else {
                    debug!("stdin closed");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match Command::parse(&line) {
                    Ok(command) => {
                        if !handle_command(&client, command).await {
                            break;
                        }
                    }
                    Err(e) => println!("{}", e),
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "sandlease starting");

    let settings = build_settings(&args)?;
    settings.check_credentials();
    let provider = build_provider(&settings)?;

    info!(
        provider = provider.name(),
        is_pro = settings.session.is_pro,
        "Provider ready"
    );

    let (service, client) = SessionService::spawn(settings.session.clone(), provider);

    let printer = StatusPrinter::new();
    client.subscribe(move |snap| {
        if let Some(line) = printer.observe(snap) {
            println!("{}", line);
        }
    });

    let result = run(client.clone()).await;

    info!("Shutting down sandlease");
    client.shutdown().await;
    service.join().await;

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn args(config: PathBuf) -> Args {
        Args {
            config,
            api_key: None,
            pro: false,
            mock: false,
            log_level: "warn".into(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() {
        let settings = build_settings(&args(PathBuf::from("/nonexistent/sandlease.toml"))).unwrap();
        assert_eq!(settings.session.default_duration_minutes, 59);
        assert!(!settings.session.is_pro);
    }

    #[test]
    fn flags_override_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
config_version = 1

[session]
is_pro = false

[provider]
kind = "http"
base_url = "http://localhost:8080"
api_key = "from-file"
"#
        )
        .unwrap();

        let mut args = args(file.path().to_path_buf());
        args.pro = true;
        args.mock = true;
        args.api_key = Some("from-flag".into());

        let settings = build_settings(&args).unwrap();
        assert!(settings.session.is_pro);
        assert_eq!(settings.session.api_key, "from-flag");
        assert_eq!(settings.provider.kind, ProviderKind::Mock);
    }

    #[test]
    fn http_provider_requires_base_url() {
        let settings = Settings::default();
        assert!(build_provider(&settings).is_err());
    }

    #[test]
    fn mock_provider_builds() {
        let mut settings = Settings::default();
        settings.provider.kind = ProviderKind::Mock;
        assert_eq!(build_provider(&settings).unwrap().name(), "mock");
    }

    #[tokio::test(start_paused = true)]
    async fn quit_stops_the_loop() {
        let (_service, client) =
            SessionService::spawn(Default::default(), Arc::new(MockProvider::new()));
        assert!(handle_command(&client, Command::Help).await);
        assert!(handle_command(&client, Command::Start { minutes: None }).await);
        assert!(!handle_command(&client, Command::Quit).await);
        client.shutdown().await;
    }
}
