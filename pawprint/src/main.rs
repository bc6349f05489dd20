//! pawprint - CLI for the shared tracking session
//!
//! This tool provides commands for:
//! - Checking tracking configuration and device identity
//! - Initializing the shared tracking session
//! - Emitting ad-hoc events through it
//! - Health-checking the configured events endpoint
//!
//! Uses XDG Base Directory specification for file locations:
//! - Device store: $XDG_DATA_HOME/pawprint/device.json (~/.local/share/pawprint/device.json)
//! - Config: $XDG_CONFIG_HOME/pawprint/config.toml (~/.config/pawprint/config.toml)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pawprint_core::client::probe_endpoint;
use pawprint_core::events::TrackingEvent;
use pawprint_core::session::{ensure_tracking_session, shutdown_tracking};
use pawprint_core::store::{DeviceStore, FileStore, DEVICE_ID_KEY};
use pawprint_core::Config;

#[derive(Parser)]
#[command(name = "pawprint")]
#[command(about = "Manage the shared tracking session")]
#[command(version)]
struct Args {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show tracking configuration and device identity
    Status,

    /// Initialize the shared tracking session and report the device identifier
    Init,

    /// Emit a single named event through the shared session
    Send {
        /// Event name
        #[arg(short, long)]
        event: String,

        /// JSON payload for the event
        #[arg(short, long)]
        data: Option<String>,
    },

    /// Check connectivity to the configured events endpoint
    Ping,
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard = pawprint_core::logging::init(&config.logging)
        .context("failed to initialize logging")?;

    // Interrupts still emit the end-of-session signal before exiting
    ctrlc::set_handler(|| {
        shutdown_tracking();
        std::process::exit(130);
    })
    .context("failed to install interrupt handler")?;

    let result = match args.command {
        Command::Status => cmd_status(&config, args.verbose),
        Command::Init => cmd_init(),
        Command::Send { event, data } => cmd_send(&event, data.as_deref()),
        Command::Ping => cmd_ping(&config),
    };

    // Normal exits emit it too; a no-op when no session was created
    shutdown_tracking();

    result
}

/// Show configuration readiness and the persisted device identity
fn cmd_status(config: &Config, verbose: bool) -> Result<()> {
    let config_path = Config::config_path();
    if config_path.exists() {
        println!("Config:       {}", config_path.display());
    } else {
        println!("Config:       {} (not found, using defaults)", config_path.display());
    }

    if config.client.is_ready() {
        println!("Client:       enabled");
        if let Some(server_url) = &config.client.server_url {
            println!("Endpoint:     {}", server_url);
        }
    } else {
        println!("Client:       disabled (tracking is a no-op)");
    }
    println!("Client ID:    {}", config.client.client_id);
    println!("Session ID:   {}", config.client.session_id);

    let store = FileStore::new(Config::device_store_path());
    match store.get(DEVICE_ID_KEY) {
        Ok(Some(device_id)) => println!("Device ID:    {}", device_id),
        Ok(None) => println!("Device ID:    not yet created"),
        Err(e) => println!("Device ID:    unreadable ({})", e),
    }

    if verbose {
        println!("Device store: {}", Config::device_store_path().display());
        println!("Log file:     {}", Config::log_path().display());
    }

    Ok(())
}

/// Run the initializer once and report the outcome
fn cmd_init() -> Result<()> {
    match ensure_tracking_session() {
        Some(session) => {
            println!("Tracking session ready");
            println!("Device ID: {}", session.device_id());

            let identity = session.identity();
            let accepted = session.track(TrackingEvent::session_start(
                &identity.referrer,
                &identity.user_properties,
            ));
            if accepted > 0 {
                println!("session_start delivered");
            } else {
                println!("session_start not delivered (see log for details)");
            }
        }
        None => {
            println!("Tracking unavailable; the application would continue untracked.");
            println!("See {} for details.", Config::log_path().display());
        }
    }

    Ok(())
}

/// Emit one custom event through the shared session
fn cmd_send(event: &str, data: Option<&str>) -> Result<()> {
    let payload = match data {
        Some(raw) => serde_json::from_str(raw).context("event data is not valid JSON")?,
        None => serde_json::json!({}),
    };

    match ensure_tracking_session() {
        Some(session) => {
            let accepted = session.track(TrackingEvent::custom(event, payload));
            println!("Accepted: {}", accepted);
        }
        None => {
            println!("Tracking unavailable; event dropped.");
        }
    }

    Ok(())
}

/// Probe the configured endpoint
fn cmd_ping(config: &Config) -> Result<()> {
    if !config.client.is_ready() {
        println!("Client is not configured; nothing to ping.");
        return Ok(());
    }

    match probe_endpoint(&config.client) {
        Ok(true) => println!("Endpoint is healthy"),
        Ok(false) => println!("Endpoint is unreachable or unhealthy"),
        Err(e) => {
            tracing::warn!(error = %e, "Endpoint probe failed");
            println!("Endpoint probe failed: {}", e);
        }
    }

    Ok(())
}
