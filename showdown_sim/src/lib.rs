//! Showdown Simulation Harness
//!
//! This crate provides the arena - an in-process environment where whole
//! fights run inside one tokio runtime with the real combat loop and the
//! real journal.
//!
//! # Core Principle: swap the world, keep the loop
//!
//! Everything outside the combat loop is replaced:
//! - **Time**: Virtual clock advanced by every sleep
//! - **Discovery**: In-memory registry; a combatant is running until it terminates
//! - **Network**: In-memory attack delivery with an optional drop rate
//! - **Randomness**: Target choice and drops derived from one 64-bit seed
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                           Arena                             │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │ SimContext (virtual clock + ChaCha8Rng)              │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │       │                        │                            │
//! │  ┌────▼──────┐  SimNetwork ┌────▼──────┐                     │
//! │  │CombatLoop │◄───────────►│CombatLoop │     ...             │
//! │  │  "Doc"    │             │ "Ringo"   │                     │
//! │  └───────────┘             └───────────┘                     │
//! │       │       SimRegistry        │                          │
//! │  ┌────▼──────────────────────────▼───┐                      │
//! │  │   JournalService -> events.log     │                      │
//! │  └────────────────────────────────────┘                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use showdown_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let runner = ScenarioRunner::new(42, "./journals");
//! let result = runner.run(ScenarioId::Duel).await?;
//! println!("winner: {:?}", result.report.winner);
//! ```

mod context;
mod network;
mod registry;
mod runner;
mod world;
pub mod scenarios;

pub use context::SimContext;
pub use network::SimNetwork;
pub use registry::SimRegistry;
pub use runner::{check, ScenarioResult, ScenarioRunner, SimError};
pub use world::{Arena, ArenaConfig, ArenaReport, CombatantReport, BASE_PORT};
