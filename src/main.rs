//! sms-relay - Forward SMS from an Android device to Telegram
//!
//! Main entry point for the sms-relay CLI.

use anyhow::Context;
use clap::{Parser, Subcommand};
use sms_relay::config::{validate_config_result, RelayConfig};
use sms_relay::delivery::{Notifier, TelegramNotifier};
use sms_relay::relay::{Relay, Supervisor};
use sms_relay::source::TermuxSmsSource;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

/// sms-relay - Forward SMS from Termux to Telegram
#[derive(Parser, Debug)]
#[command(name = "sms-relay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: ~/.config/sms-relay/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Telegram bot token (overrides the config file)
    #[arg(long, env = "SMS_RELAY_BOT_TOKEN", hide_env_values = true)]
    bot_token: Option<String>,

    /// Telegram chat id (overrides the config file)
    #[arg(long, env = "SMS_RELAY_CHAT_ID")]
    chat_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the relay until interrupted, restarting it after failures
    Run,

    /// Poll once, forward new messages, and exit
    Once,

    /// Check Termux:API, SMS permission, and configuration
    Check,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Send a message to the configured chat
    Notify {
        /// Message text (HTML markup allowed)
        text: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(cli)) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let explicit_path = cli.config.is_some();
    let config_path = cli.config.unwrap_or_else(RelayConfig::default_path);

    // init must work before a valid config exists
    if let Commands::Init { force } = cli.command {
        return handle_init_command(&config_path, force);
    }

    let mut config = load_config(&config_path, explicit_path)?;
    if let Some(token) = cli.bot_token {
        config.telegram.bot_token = token;
    }
    if let Some(chat_id) = cli.chat_id {
        config.telegram.chat_id = chat_id;
    }
    validate_config_result(&config).with_context(|| {
        format!(
            "Invalid configuration. Edit {} or set SMS_RELAY_BOT_TOKEN and SMS_RELAY_CHAT_ID",
            config_path.display()
        )
    })?;

    let _log_guard = sms_relay::logging::init(&config.logging)
        .context("Failed to initialize logging")?;

    match cli.command {
        Commands::Init { force } => handle_init_command(&config_path, force),
        Commands::Check => handle_check_command(&config).await,
        Commands::Notify { text } => handle_notify_command(&config, &text).await,
        Commands::Once => handle_once_command(&config).await,
        Commands::Run => handle_run_command(&config).await,
    }
}

/// Load the config file, falling back to defaults when the default path is missing
fn load_config(path: &Path, explicit: bool) -> anyhow::Result<RelayConfig> {
    if path.exists() {
        Ok(RelayConfig::load(path)?)
    } else if explicit {
        anyhow::bail!("Config file not found: {}", path.display())
    } else {
        // Credentials may come entirely from the environment
        Ok(RelayConfig::default())
    }
}

fn handle_init_command(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }

    RelayConfig::default().save(path)?;
    println!("Created {}", path.display());
    println!("Set telegram.bot_token and telegram.chat_id, then run `sms-relay check`.");
    Ok(())
}

async fn handle_check_command(config: &RelayConfig) -> anyhow::Result<()> {
    let source = TermuxSmsSource::new(config.polling.source_timeout());
    source
        .preflight()
        .await
        .context("Termux:API preflight failed. Install Termux:API and grant SMS permission")?;

    println!("Termux:API: ok");
    println!("Configuration: ok");
    println!("Ledger: {}", config.ledger_path.display());
    Ok(())
}

async fn handle_notify_command(config: &RelayConfig, text: &str) -> anyhow::Result<()> {
    let notifier = TelegramNotifier::new(&config.telegram)?;
    let outcome = notifier.deliver(text).await;
    match outcome.strategy {
        Some(strategy) => {
            println!("Delivered ({})", strategy);
            Ok(())
        }
        None => anyhow::bail!("Failed to deliver message"),
    }
}

async fn handle_once_command(config: &RelayConfig) -> anyhow::Result<()> {
    TermuxSmsSource::new(config.polling.source_timeout())
        .preflight()
        .await?;

    let mut relay = Relay::from_config(config)?;
    let report = relay.run_once().await;
    println!(
        "Fetched {}, forwarded {}, skipped {}, failed {}",
        report.fetched, report.forwarded, report.skipped, report.failed
    );
    Ok(())
}

async fn handle_run_command(config: &RelayConfig) -> anyhow::Result<()> {
    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(&config.telegram)?);
    let supervisor = Supervisor::new(config.supervisor.clone(), notifier);

    supervisor
        .preflight(&TermuxSmsSource::new(config.polling.source_timeout()))
        .await
        .context("Failed permission check. Grant SMS permission to Termux:API and restart")?;

    println!("SMS relay started. Press Ctrl+C to stop.");
    supervisor
        .supervise(|_attempt| Relay::from_config(config))
        .await?;
    Ok(())
}
