//! Arenamod console harness.
//!
//! Drives the game-logic module interactively for local testing: commands
//! read from stdin are dispatched as client commands against an in-process
//! engine stub, and the per-frame vote poller runs on a tick interval.
//!
//! Input forms:
//! - `connect <slot> <name> [ip]` / `disconnect <slot>`
//! - `announce <text>` — console center-print broadcast
//! - `<slot> <command...>` — dispatched as that client's command

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arenamod::chat;
use arenamod::client_command;
use arenamod::engine::{AllMaps, ConsoleAdmin, ConsoleEngine};
use arenamod::state::MatchContext;
use arenamod::vote;
use arenamod::Config;
use arenamod::GameModule;

const TICK_MS: u64 = 100;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    info!("Starting arenamod console harness");

    let mut ctx = MatchContext::new();
    ctx.time_ms = TICK_MS as i64;
    ctx.start_time_ms = ctx.time_ms;

    let mut engine = ConsoleEngine::new();
    let mut admin = ConsoleAdmin;
    let maps = AllMaps;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tick = tokio::time::interval(Duration::from_millis(TICK_MS));

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = tick.tick() => {
                ctx.time_ms += TICK_MS as i64;
                let mut gm = GameModule {
                    ctx: &mut ctx,
                    engine: &mut engine,
                    admin: &mut admin,
                    maps: &maps,
                    config: &config,
                };
                vote::run_frame(&mut gm);
            }
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        let mut gm = GameModule {
                            ctx: &mut ctx,
                            engine: &mut engine,
                            admin: &mut admin,
                            maps: &maps,
                            config: &config,
                        };
                        handle_line(&mut gm, line.trim());
                    }
                    None => break, // stdin closed
                }
            }
        }
    }

    info!("Harness shutdown complete");
    Ok(())
}

/// One line of harness input: a meta-command, or a slot-prefixed client
/// command.
fn handle_line(gm: &mut GameModule, line: &str) {
    if line.is_empty() {
        return;
    }

    let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
    match head {
        "connect" => {
            let mut parts = rest.split_whitespace();
            let slot = parts.next().and_then(|s| s.parse::<usize>().ok());
            let name = parts.next();
            let ip = parts.next().unwrap_or("127.0.0.1");
            match (slot, name) {
                (Some(slot), Some(name)) if slot < gm.ctx.clients.len() => {
                    gm.ctx.connect_client(slot, name, ip);
                    info!(slot, name, "client connected");
                }
                _ => warn!("usage: connect <slot> <name> [ip]"),
            }
        }
        "disconnect" => match rest.trim().parse::<usize>() {
            Ok(slot) if slot < gm.ctx.clients.len() => {
                gm.ctx.disconnect_client(slot);
                info!(slot, "client disconnected");
            }
            _ => warn!("usage: disconnect <slot>"),
        },
        "announce" => chat::announce(gm, rest),
        _ => match head.parse::<usize>() {
            Ok(slot) if slot < gm.ctx.clients.len() => client_command(gm, slot, rest),
            _ => warn!(%line, "unrecognized input; expected <slot> <command...>"),
        },
    }
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
