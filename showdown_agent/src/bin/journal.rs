//! Showdown journal service process.

use anyhow::Result;
use clap::Parser;
use showdown_agent::config::JournalArgs;
use showdown_agent::{journal_host, signals, telemetry};
use showdown_env::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let args = JournalArgs::parse();
    telemetry::init(&args.log);
    telemetry::install_panic_hook();

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        signals::shutdown_signal().await;
        trigger.cancel();
    });

    journal_host::run(args, shutdown).await
}
