//! Command-line and environment configuration of the host processes.
//!
//! Every parameter can come from a flag or from the environment variable
//! named next to it, so the launcher (or any orchestrator) configures the
//! children purely through their environment.

use crate::telemetry::LogArgs;
use clap::Parser;
use std::path::PathBuf;

/// Default journal service port.
pub const JOURNAL_PORT: u16 = 50001;

/// Attack port of the first combatant; the n-th one uses `BASE_PORT + n`.
pub const BASE_PORT: u16 = 50002;

/// One combatant process.
#[derive(Parser, Debug, Clone)]
#[command(name = "showdown-combatant", about = "Run one Showdown combatant")]
pub struct CombatantArgs {
    /// Combatant name, unique in the roster
    #[arg(long, env = "NAME")]
    pub name: String,

    /// Initial health
    #[arg(long, env = "HEALTH")]
    pub health: u64,

    /// Damage per attack
    #[arg(long, env = "DAMAGE")]
    pub damage: u64,

    /// Journal service address (host:port)
    #[arg(long = "log-addr", env = "LOG_ADDR")]
    pub log_addr: String,

    /// Attack port to listen on
    #[arg(long, env = "PORT", default_value_t = BASE_PORT)]
    pub port: u16,

    /// Peer roster used for discovery
    #[arg(long, env = "ROSTER", default_value = "peers.json")]
    pub roster: PathBuf,

    /// Interface to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,

    #[command(flatten)]
    pub log: LogArgs,
}

/// The journal service process.
#[derive(Parser, Debug, Clone)]
#[command(name = "showdown-journal", about = "Serve the Showdown event journal")]
pub struct JournalArgs {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = JOURNAL_PORT)]
    pub port: u16,

    /// Directory holding events.log (created if missing)
    #[arg(long, env = "JOURNAL_DIR", default_value = "journal")]
    pub dir: PathBuf,

    /// Start from an empty journal
    #[arg(long)]
    pub reset: bool,

    /// Interface to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,

    #[command(flatten)]
    pub log: LogArgs,
}

/// Starts a journal service and one process per combatant.
#[derive(Parser, Debug, Clone)]
#[command(name = "showdown-launcher", about = "Launch a whole Showdown fight on this machine")]
pub struct LauncherArgs {
    /// JSON list of combatants: [{"name", "health", "damage"}, ...]
    #[arg(long, default_value = "roster.json")]
    pub combatants: PathBuf,

    /// Where to write the peer roster handed to every combatant
    #[arg(long, env = "ROSTER", default_value = "peers.json")]
    pub peers: PathBuf,

    /// Journal service port
    #[arg(long, default_value_t = JOURNAL_PORT)]
    pub journal_port: u16,

    /// Journal directory
    #[arg(long, default_value = "journal")]
    pub journal_dir: PathBuf,

    /// Host the combatants are reachable at
    #[arg(long, env = "ADVERTISE_HOST", default_value = "127.0.0.1")]
    pub advertise_host: String,

    /// Directory holding the showdown binaries (defaults to the launcher's own)
    #[arg(long)]
    pub bin_dir: Option<PathBuf>,

    /// Seconds to wait for the journal service to accept connections
    #[arg(long, default_value_t = 10)]
    pub startup_timeout_secs: u64,

    /// Seconds the journal service gets to drain before it is killed
    #[arg(long, default_value_t = 5)]
    pub stop_grace_secs: u64,

    #[command(flatten)]
    pub log: LogArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combatant_flags() {
        let args = CombatantArgs::try_parse_from([
            "showdown-combatant",
            "--name",
            "Doc",
            "--health",
            "10",
            "--damage",
            "4",
            "--log-addr",
            "127.0.0.1:50001",
            "--port",
            "50003",
        ])
        .unwrap();

        assert_eq!(args.name, "Doc");
        assert_eq!((args.health, args.damage, args.port), (10, 4, 50003));
        assert_eq!(args.log_addr, "127.0.0.1:50001");
        assert!(!args.log.verbose);
    }

    #[test]
    fn test_non_numeric_health_is_rejected() {
        let err = CombatantArgs::try_parse_from([
            "showdown-combatant",
            "--name",
            "Doc",
            "--health",
            "lots",
            "--damage",
            "4",
            "--log-addr",
            "127.0.0.1:50001",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_launcher_defaults() {
        let args = LauncherArgs::try_parse_from(["showdown-launcher", "--advertise-host", "10.1.1.1"]).unwrap();
        assert_eq!(args.journal_port, JOURNAL_PORT);
        assert_eq!(args.combatants, PathBuf::from("roster.json"));
        assert_eq!(args.advertise_host, "10.1.1.1");
        assert_eq!(args.stop_grace_secs, 5);
    }

    #[test]
    fn test_clap_definitions_are_consistent() {
        use clap::CommandFactory;
        CombatantArgs::command().debug_assert();
        JournalArgs::command().debug_assert();
        LauncherArgs::command().debug_assert();
    }
}
