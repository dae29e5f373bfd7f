//! Showdown combatant process.

use anyhow::Result;
use clap::Parser;
use showdown_agent::combatant_host;
use showdown_agent::config::CombatantArgs;
use showdown_agent::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CombatantArgs::parse();
    telemetry::init(&args.log);
    telemetry::install_panic_hook();

    combatant_host::run(args).await?;
    Ok(())
}
