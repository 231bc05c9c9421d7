//! # frontwatch
//!
//! Command-line entry point: `watch` follows a dashboard's event channel,
//! `serve` runs the broadcast hub.

#![deny(unsafe_code)]

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use frontwatch_client::{ClientCallbacks, ClientConfig, ConnectionState, EventClient};
use frontwatch_core::{DashboardEvent, EventKind, init_subscriber};
use frontwatch_server::{HubServer, ServerConfig};
use frontwatch_settings::{FrontwatchSettings, apply_env_overrides, load_settings, settings_path};
use tracing::{error, info, warn};

/// Live dashboard event client and broadcast hub.
#[derive(Parser, Debug)]
#[command(name = "frontwatch", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect to a dashboard's event channel and log every event.
    Watch {
        /// Dashboard origin, e.g. `https://dash.example.com`.
        #[arg(long)]
        origin: Option<String>,
    },
    /// Run the broadcast hub.
    Serve {
        /// Host to bind.
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (0 for auto-assign).
        #[arg(long)]
        port: Option<u16>,
    },
}

fn client_config(settings: &FrontwatchSettings, origin: Option<String>) -> ClientConfig {
    let client = &settings.client;
    ClientConfig::new(origin.unwrap_or_else(|| client.origin.clone()))
        .with_heartbeat_interval(client.heartbeat_interval())
        .with_reconnect(client.reconnect)
}

fn server_config(settings: &FrontwatchSettings, host: Option<String>, port: Option<u16>) -> ServerConfig {
    let server = &settings.server;
    ServerConfig {
        host: host.unwrap_or_else(|| server.host.clone()),
        port: port.unwrap_or(server.port),
        max_send_queue: server.max_send_queue,
    }
}

fn log_event(event: &DashboardEvent) {
    match event.kind {
        EventKind::MembersUpdate => {
            let count = event.members().map_or(0, Vec::len);
            info!(event_type = %event.kind, members = count, "dashboard event");
        }
        EventKind::ForceRefresh => {
            let message = event.data.get("message").and_then(|m| m.as_str()).unwrap_or("");
            warn!(event_type = %event.kind, message, "dashboard asked clients to reload");
        }
        EventKind::Unknown => warn!(data = %event.data, "unrecognised dashboard event"),
        _ => info!(event_type = %event.kind, data = %event.data, "dashboard event"),
    }
}

async fn watch(config: ClientConfig) -> Result<()> {
    let callbacks = ClientCallbacks::new(|event: DashboardEvent| log_event(&event))
        .with_error(|err| {
            if err.is_terminal() {
                error!(error = %err, "event channel failed");
            } else {
                warn!(error = %err, kind = err.error_kind(), "event channel error");
            }
        })
        .with_open(|| info!("connected"))
        .with_close(|close| info!(code = close.code, reason = %close.reason, "disconnected"));

    let mut client = EventClient::open(config, callbacks).context("Failed to start event client")?;
    info!(endpoint = %client.endpoint(), "watching dashboard events");

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for ctrl-c")?;
            info!("Shutting down...");
            client.close().await;
            Ok(())
        }
        () = client.closed() => {
            if client.state() == ConnectionState::Failed {
                bail!("gave up reconnecting to {}", client.endpoint());
            }
            info!("event channel closed by server");
            Ok(())
        }
    }
}

async fn serve(config: ServerConfig) -> Result<()> {
    let server = HubServer::new(config);
    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    info!("frontwatch hub listening on http://{addr} (events at ws://{addr}/ws)");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    info!("Shutting down...");
    server.shutdown().cancel();
    let _ = handle.await;
    info!("Shutdown complete");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // Settings first: they carry the log level.
    let (settings, load_error) = match load_settings() {
        Ok(settings) => (settings, None),
        Err(e) => {
            let mut settings = FrontwatchSettings::default();
            apply_env_overrides(&mut settings);
            (settings, Some(e))
        }
    };
    init_subscriber(&settings.logging.level, settings.logging.format);
    if let Some(e) = load_error {
        warn!(error = %e, path = %settings_path().display(), "failed to load settings, using defaults");
    }

    match args.command {
        Command::Watch { origin } => watch(client_config(&settings, origin)).await,
        Command::Serve { host, port } => serve(server_config(&settings, host, port)).await,
    }
}
