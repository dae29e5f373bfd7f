//! Showdown Environment Abstraction Layer
//!
//! This crate isolates everything a combatant touches outside its own
//! memory so the combat loop can run against real processes or inside the
//! in-process simulator:
//! - Time and randomness (`ArenaContext`)
//! - Service discovery (`Registry`)
//! - The attack and journal calls (`AttackTransport`, `JournalTransport`)
//!
//! # Example
//!
//! ```ignore
//! use showdown_env::{ArenaContext, Registry};
//!
//! async fn scout<Ctx: ArenaContext, Reg: Registry>(ctx: &Ctx, registry: &Reg) {
//!     loop {
//!         let peers = registry.running_peers("Doc").await;
//!         ctx.sleep(Duration::from_secs(1)).await;
//!     }
//! }
//! ```

mod context;
mod error;
mod registry;
mod tokio_impl;
mod transport;
mod types;
pub mod rpc;

pub use context::ArenaContext;
pub use error::EnvError;
pub use registry::{RosterRegistry, DEFAULT_PROBE_TIMEOUT};
pub use rpc::{RequestHandler, TcpAttackClient, TcpJournalClient};
pub use tokio_impl::TokioContext;
pub use transport::{call_with_deadline, AttackTransport, JournalTransport, Registry};
pub use types::{
    AttackRequest, AttackResponse, Endpoint, JournalRequest, JournalResponse, PeerRecord, Reply,
};

pub use tokio_util::sync::CancellationToken;
