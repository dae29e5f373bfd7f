//! Logging and panic reporting for the host processes.
//!
//! Reads `RUST_LOG`; defaults to `info`, or `debug` with `--verbose`.
//! Output goes to stderr, as text or one JSON object per line.

use std::backtrace::Backtrace;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Logging flags shared by every binary.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct LogArgs {
    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub json: bool,
}

/// Installs the global subscriber.
pub fn init(args: &LogArgs) {
    let default = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if args.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Logs every panic with a captured backtrace before unwinding continues.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let backtrace = Backtrace::force_capture();
        error!(panic = %info, %backtrace, "Panic");
    }));
}
