use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ledger_watcher::{Mode, ModeArg};

/// Watch a ledger node for closed ledgers, validated transactions, or new
/// transactions on an account.
#[derive(Debug, Parser)]
#[command(name = "ledger-watcher", version)]
struct Cli {
    /// What to watch
    #[arg(value_enum)]
    mode: ModeArg,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mode = Mode::from_env(cli.mode)?;
    let name = mode.name();
    info!("🚀 Starting ledger watcher in {} mode", name);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt requested");
                interrupt.cancel();
            }
            Err(e) => error!("Failed to listen for interrupt: {}", e),
        }
    });

    ledger_watcher::run(mode, cancel)
        .await
        .with_context(|| format!("{} session failed", name))?;

    info!("👋 Shut down cleanly");
    Ok(())
}
