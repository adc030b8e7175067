// Headless Platform Duel client driven by `PatrolBot`.
//
// Connects to a relay, waits for an opponent, and plays at the fixed frame
// cadence until the opponent quits, the match has been over for a second, or
// `--frames` frames have elapsed. Two bots against one relay make a complete
// match without any rendering.
//
// Usage:
//   bot [OPTIONS]
//     --host <HOST>          Relay address (default: 127.0.0.1)
//     --port <PORT>          Relay port (default: 5555)
//     --fire-every <N>       Frames between shots (default: 45)
//     --frames <N>           Quit after this many frames (default: unlimited)
//     --no-patrol            Stand still instead of patrolling

use anyhow::Context;
use clap::Parser;
use duel_relay::bot::{BotConfig, PatrolBot};
use duel_relay::client::DuelClient;
use duel_relay::exchange::{DEFAULT_FPS, MatchEnd, MatchView, frame_interval, run_match};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bot", about = "Headless Platform Duel client")]
struct Args {
    /// Relay address.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Relay port.
    #[arg(long, default_value_t = 5555)]
    port: u16,

    /// Frames between shots.
    #[arg(long, default_value_t = 45)]
    fire_every: u64,

    /// Quit after this many frames.
    #[arg(long)]
    frames: Option<u64>,

    /// Stand still instead of patrolling.
    #[arg(long)]
    no_patrol: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let client = DuelClient::connect((args.host.as_str(), args.port))
        .with_context(|| format!("failed to join relay at {}:{}", args.host, args.port))?;

    let slot = client.slot();
    let mut bot = PatrolBot::new(
        slot,
        BotConfig {
            fire_every: args.fire_every,
            patrol: !args.no_patrol,
        },
    );
    let mut view = MatchView::new(slot);

    let linger = u64::from(DEFAULT_FPS);
    let mut over_since: Option<u64> = None;
    let end = run_match(
        client,
        &mut bot,
        &mut view,
        frame_interval(DEFAULT_FPS),
        |view, frame| {
            if view.is_over() && over_since.is_none() {
                over_since = Some(frame);
            }
            let lingered = over_since.is_some_and(|start| frame >= start + linger);
            let out_of_frames = args.frames.is_some_and(|limit| frame >= limit);
            lingered || out_of_frames
        },
    )
    .context("match aborted")?;

    match end {
        MatchEnd::PeerQuit => info!(%slot, "opponent left the match"),
        MatchEnd::LocalQuit => info!(%slot, "left the match"),
    }
    match view.winner() {
        Some(winner) => println!("{winner} wins"),
        None => println!("match ended without a winner"),
    }
    Ok(())
}
