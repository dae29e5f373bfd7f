//! Showdown Core - autonomous combatants and their event journal
//!
//! This library holds everything a combatant does that is not I/O plumbing:
//! 1. **Combat loop**: discover opponents, attack one at random, detect death and victory
//! 2. **Resilience primitives**: bounded retry with backoff, supervised periodic execution
//! 3. **Journal**: durable append-only event log with byte-position offsets
//!
//! Everything that touches the outside world goes through `showdown_env`.

pub mod combat_loop;
pub mod combatant;
pub mod journal;
pub mod journal_service;
pub mod periodic;
pub mod retry;
pub mod state;

#[cfg(test)]
mod testing;

// Re-export key types for convenience
pub use combat_loop::{CombatLoop, DiscoveryError, LoopConfig, TickOutcome};
pub use combatant::{AttackOutcome, AttackService, Combatant, CombatantSpec};
pub use journal::{read_records, CombatEvent, Journal, JournalError, JOURNAL_FILE};
pub use journal_service::JournalService;
pub use periodic::{panic_message, run_until_cancelled};
pub use retry::{retry, RetryError, RetryPolicy};
pub use state::{Ending, Phase, Transition};
