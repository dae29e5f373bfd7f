//! Showdown launcher: one journal service plus one process per combatant.

use anyhow::Result;
use clap::Parser;
use showdown_agent::config::LauncherArgs;
use showdown_agent::{launcher, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let args = LauncherArgs::parse();
    telemetry::init(&args.log);
    telemetry::install_panic_hook();

    launcher::run(args).await
}
