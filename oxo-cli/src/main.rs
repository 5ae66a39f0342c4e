//! # oxo-cli
//!
//! CLI tool for exercising the oxo game record protocol.
//!
//! ## Commands
//!
//! - `demo`: Play a scripted game between two sessions over the in-memory
//!   mock ledger, printing every change event - useful for watching the
//!   protocol (join, moves, keep-alive, abandonment) without a real ledger.
//!
//! ## Example
//!
//! ```bash
//! # Play a full game to the win
//! oxo-cli demo
//!
//! # Abandon mid-game and watch the peer notice
//! oxo-cli demo --abandon
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use oxo_client::{MockLedger, Session, SessionConfig};
use oxo_core::SessionView;
use oxo_types::{PlayerId, ProgramId};

/// CLI tool for exercising the oxo game record protocol.
#[derive(Parser, Debug)]
#[command(name = "oxo-cli")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a scripted game over the in-memory mock ledger
    Demo {
        /// Keep-alive period in milliseconds
        #[arg(long, default_value_t = 200)]
        period_ms: u64,

        /// Abandon mid-game instead of playing to the win
        #[arg(long)]
        abandon: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Demo { period_ms, abandon } => demo(period_ms, abandon).await,
    }
}

async fn demo(period_ms: u64, abandon: bool) -> Result<()> {
    let ledger = MockLedger::new();
    let config = SessionConfig::new(ProgramId::random())
        .with_keep_alive_period(Duration::from_millis(period_ms));

    let host = Session::create(
        Arc::new(ledger.clone()),
        config.clone(),
        PlayerId::random(),
    )
    .await?;
    println!("created game {} as player X", host.record_handle());
    host.on_change(|view| report("X", view));

    let guest = Session::join(
        Arc::new(ledger.clone()),
        config,
        PlayerId::random(),
        host.record_handle(),
    )
    .await?;
    println!("joined as player O");
    guest.on_change(|view| report("O", view));

    // X takes the top row unless the guest walks away first.
    let opening = [(&host, 0, 0), (&guest, 0, 1), (&host, 1, 0), (&guest, 1, 1)];
    for (session, x, y) in opening {
        session.make_move(x, y).await?;
    }

    if abandon {
        println!("player O abandons the game");
        guest.abandon().await;
    } else {
        host.make_move(2, 0).await?;
    }

    // Give the keep-alive loops a few ticks to observe the end and let go.
    tokio::time::sleep(Duration::from_millis(period_ms * 3)).await;

    let view = host.view();
    println!("final phase: {:?}", view.phase);
    println!("{}", view.board);
    println!(
        "host abandoned: {}, guest abandoned: {}, live subscriptions: {}",
        host.abandoned(),
        guest.abandoned(),
        ledger.subscription_count()
    );
    Ok(())
}

fn report(seat: &str, view: &SessionView) {
    println!(
        "[{seat}] phase {:?}, my turn: {}, in progress: {}",
        view.phase, view.my_turn, view.in_progress
    );
}
