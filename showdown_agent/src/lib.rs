//! Showdown Agent - process hosts
//!
//! Three binaries share this library:
//! - `showdown-combatant`: one combatant (attack server + combat loop)
//! - `showdown-journal`: the journal service
//! - `showdown-launcher`: starts the journal and every combatant locally

pub mod combatant_host;
pub mod config;
pub mod journal_host;
pub mod launcher;
pub mod signals;
pub mod telemetry;
