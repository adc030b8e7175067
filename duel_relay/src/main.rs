// CLI entry point for the Platform Duel relay.
//
// Starts a standalone relay that exactly two game clients connect to. The
// relay pairs them, sends `start`, and then forwards snapshots between them;
// it never runs the game. See `server.rs` for the networking architecture and
// `session.rs` for the session state.
//
// Usage:
//   relay [OPTIONS]
//     --host <HOST>    Listen address (default: 0.0.0.0)
//     --port <PORT>    Listen port (default: 5555)
//
// Log verbosity follows `RUST_LOG` (default: info).

use std::sync::mpsc;

use anyhow::Context;
use clap::Parser;
use duel_relay::server::{RelayConfig, start_relay};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "relay", about = "Two-player snapshot relay for Platform Duel")]
struct Args {
    /// Listen address.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Listen port.
    #[arg(long, default_value_t = 5555)]
    port: u16,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = RelayConfig {
        host: args.host,
        port: args.port,
    };

    let (handle, addr) = start_relay(config.clone())
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;

    println!("Relay listening on {addr}");
    println!("Press Ctrl+C to stop.");

    let (stop_tx, stop_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .context("failed to install Ctrl+C handler")?;

    let _ = stop_rx.recv();
    info!("shutting down");
    handle.stop();
    Ok(())
}
