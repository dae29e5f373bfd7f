//! Launches a whole fight as local processes.
//!
//! Starts the journal service first and waits until it accepts
//! connections, writes the peer roster, then starts one combatant per
//! roster entry on its own port and waits for all of them to exit. The
//! journal service is then sent SIGTERM so it drains and closes the
//! journal; it is killed only if it outlives the grace period.

use crate::config::{LauncherArgs, BASE_PORT};
use anyhow::{bail, Context, Result};
use showdown_core::CombatantSpec;
use showdown_env::{Endpoint, PeerRecord, RosterRegistry};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Reads the combatant roster.
pub fn load_combatants(path: &Path) -> Result<Vec<CombatantSpec>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let combatants: Vec<CombatantSpec> =
        serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))?;

    let mut names: Vec<&str> = combatants.iter().map(|c| c.name.as_str()).collect();
    names.sort_unstable();
    if let Some(w) = names.windows(2).find(|w| w[0] == w[1]) {
        bail!("combatant name {} appears more than once", w[0]);
    }
    if combatants.len() > usize::from(u16::MAX - BASE_PORT) {
        bail!("too many combatants: {}", combatants.len());
    }
    Ok(combatants)
}

/// Peer roster entries for `combatants`, one port each from `BASE_PORT`.
pub fn peer_roster(combatants: &[CombatantSpec], host: &str) -> Vec<PeerRecord> {
    combatants
        .iter()
        .enumerate()
        .map(|(i, c)| PeerRecord::resolved(c.name.clone(), &Endpoint::new(host, BASE_PORT + i as u16)))
        .collect()
}

/// Waits until something accepts TCP connections at `addr`.
pub async fn wait_until_reachable(addr: &str, timeout: Duration) -> Result<()> {
    let attempt = async {
        loop {
            match TcpStream::connect(addr).await {
                Ok(_) => return,
                Err(_) => tokio::time::sleep(Duration::from_millis(100)).await,
            }
        }
    };
    tokio::time::timeout(timeout, attempt)
        .await
        .with_context(|| format!("{addr} did not become reachable within {timeout:?}"))
}

fn binary(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}{}", std::env::consts::EXE_SUFFIX))
}

/// Runs the fight; returns once every combatant process has exited.
pub async fn run(args: LauncherArgs) -> Result<()> {
    let combatants = load_combatants(&args.combatants)?;
    let bin_dir = match args.bin_dir {
        Some(dir) => dir,
        None => std::env::current_exe()
            .context("failed to locate the launcher binary")?
            .parent()
            .map(Path::to_path_buf)
            .context("launcher binary has no parent directory")?,
    };

    let journal_addr = format!("{}:{}", args.advertise_host, args.journal_port);
    let mut journal = Command::new(binary(&bin_dir, "showdown-journal"))
        .env("PORT", args.journal_port.to_string())
        .env("JOURNAL_DIR", &args.journal_dir)
        .kill_on_drop(true)
        .spawn()
        .context("failed to start the journal service")?;
    info!(addr = %journal_addr, "Journal service starting");
    wait_until_reachable(&journal_addr, Duration::from_secs(args.startup_timeout_secs)).await?;
    info!(addr = %journal_addr, "Journal service is up");

    let peers = peer_roster(&combatants, &args.advertise_host);
    RosterRegistry::write_roster(&args.peers, &peers).await?;

    // Children get the same Ctrl-C; stay around to collect them.
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, waiting for combatants to stop");
        }
    });

    let mut children: Vec<(String, Child)> = Vec::with_capacity(combatants.len());
    for (spec, peer) in combatants.iter().zip(&peers) {
        let port = peer.port.unwrap_or(BASE_PORT);
        let child = Command::new(binary(&bin_dir, "showdown-combatant"))
            .env("NAME", &spec.name)
            .env("HEALTH", spec.health.to_string())
            .env("DAMAGE", spec.damage.to_string())
            .env("LOG_ADDR", &journal_addr)
            .env("PORT", port.to_string())
            .env("ROSTER", &args.peers)
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start combatant {}", spec.name))?;
        info!(name = %spec.name, port, "Combatant started");
        children.push((spec.name.clone(), child));
    }

    let mut failed = 0;
    for (name, mut child) in children {
        let status: ExitStatus = child.wait().await.with_context(|| format!("failed to wait for {name}"))?;
        if status.success() {
            info!(%name, "Combatant exited");
        } else {
            failed += 1;
            warn!(%name, %status, "Combatant exited with failure");
        }
    }

    let status = stop_gracefully(&mut journal, Duration::from_secs(args.stop_grace_secs))
        .await
        .context("failed to stop the journal service")?;
    debug!(%status, "Journal service exited");
    info!(journal = %args.journal_dir.display(), "Fight over");

    if failed > 0 {
        bail!("{failed} combatant(s) failed");
    }
    Ok(())
}

/// Asks `child` to stop and waits up to `grace` for it; kills it after that.
pub async fn stop_gracefully(child: &mut Child, grace: Duration) -> Result<ExitStatus> {
    let asked = match child.id() {
        Some(pid) => request_stop(pid).await,
        // Already reaped.
        None => false,
    };
    if asked {
        if let Ok(status) = tokio::time::timeout(grace, child.wait()).await {
            return Ok(status?);
        }
        warn!(?grace, "Child did not stop in time, killing it");
    }
    child.start_kill()?;
    Ok(child.wait().await?)
}

#[cfg(unix)]
async fn request_stop(pid: u32) -> bool {
    let sent = Command::new("kill").arg("-TERM").arg(pid.to_string()).status().await;
    match sent {
        Ok(status) if status.success() => true,
        Ok(status) => {
            warn!(pid, %status, "kill -TERM failed");
            false
        }
        Err(e) => {
            warn!(pid, error = %e, "Failed to run kill");
            false
        }
    }
}

#[cfg(not(unix))]
async fn request_stop(_pid: u32) -> bool {
    false
}
