//! Hosts one combatant: its attack server and its combat loop.
//!
//! ```text
//!   bind attack port ── fatal on error
//!        │
//!   serve AttackService ◄──── other combatants
//!        │
//!   CombatLoop::run ──► registry / attacks / journal
//!        │
//!   token cancelled (death, victory, SIGINT/SIGTERM)
//!        │
//!   server stops accepting, drains, closes
//! ```

use crate::config::CombatantArgs;
use crate::signals;
use anyhow::{Context, Result};
use showdown_core::{AttackService, CombatLoop, Combatant, LoopConfig, Phase};
use showdown_env::rpc::serve;
use showdown_env::{ArenaContext, RosterRegistry, TcpAttackClient, TcpJournalClient, TokioContext};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Runs the combatant described by `args` until it terminates.
pub async fn run(args: CombatantArgs) -> Result<Phase> {
    let listener = TcpListener::bind((args.bind.as_str(), args.port))
        .await
        .with_context(|| format!("failed to bind attack port {}:{}", args.bind, args.port))?;
    info!(name = %args.name, addr = %listener.local_addr()?, "Listening for attacks");

    let combatant = Arc::new(Combatant::new(args.name, args.health, args.damage));
    let context = TokioContext::shared();
    let combat = CombatLoop::new(
        combatant.clone(),
        context.clone(),
        Arc::new(RosterRegistry::new(args.roster)),
        Arc::new(TcpAttackClient),
        Arc::new(TcpJournalClient::new(args.log_addr)),
        LoopConfig::default(),
    );
    let token = combat.token().clone();

    let server = tokio::spawn(serve(
        listener,
        Arc::new(AttackService::new(combatant)),
        token.clone(),
    ));

    let interrupt = token.clone();
    context.spawn("shutdown-signal", async move {
        tokio::select! {
            _ = interrupt.cancelled() => {}
            _ = signals::shutdown_signal() => interrupt.cancel(),
        }
    });

    let phase = combat.run().await;

    server
        .await
        .context("attack server task failed")?
        .context("attack server failed")?;
    info!(%phase, "Combatant exited");
    Ok(phase)
}
