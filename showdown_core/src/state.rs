//! Combatant lifecycle as an explicit state machine.
//!
//! ```text
//!            HealthDepleted            Cancelled
//!   Alive ─────────────────► Dead ─────────────────► Terminated(Died)
//!     │       NoOpponents                Cancelled
//!     ├────────────────────► Victorious ───────────► Terminated(Won)
//!     │       Cancelled
//!     └────────────────────────────────────────────► Terminated(Interrupted)
//! ```
//!
//! `Terminated` absorbs every transition. Leaving `Alive` is one-way.

use serde::Serialize;

/// How a combatant's run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ending {
    /// Own health reached zero
    Died,
    /// No opponents remained
    Won,
    /// Cancelled from outside while still alive
    Interrupted,
}

/// Lifecycle phase of a combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Alive,
    Dead,
    Victorious,
    Terminated(Ending),
}

/// Events that move a combatant between phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Health observed at zero
    HealthDepleted,
    /// Discovery reported no opponents
    NoOpponents,
    /// The execution context was cancelled
    Cancelled,
}

impl Phase {
    /// Returns the phase reached by applying `transition`.
    pub fn next(self, transition: Transition) -> Phase {
        use Transition::{Cancelled, HealthDepleted, NoOpponents};

        match (self, transition) {
            (Phase::Alive, HealthDepleted) => Phase::Dead,
            (Phase::Alive, NoOpponents) => Phase::Victorious,
            (Phase::Alive, Cancelled) => Phase::Terminated(Ending::Interrupted),
            (Phase::Dead, Cancelled) => Phase::Terminated(Ending::Died),
            (Phase::Victorious, Cancelled) => Phase::Terminated(Ending::Won),
            (Phase::Dead | Phase::Victorious, _) => self,
            (Phase::Terminated(_), _) => self,
        }
    }

    /// True once the combatant can no longer act.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Phase::Alive)
    }

    /// Returns the ending if terminated.
    pub fn ending(self) -> Option<Ending> {
        match self {
            Phase::Terminated(ending) => Some(ending),
            _ => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Alive => write!(f, "alive"),
            Phase::Dead => write!(f, "dead"),
            Phase::Victorious => write!(f, "victorious"),
            Phase::Terminated(Ending::Died) => write!(f, "terminated (died)"),
            Phase::Terminated(Ending::Won) => write!(f, "terminated (won)"),
            Phase::Terminated(Ending::Interrupted) => write!(f, "terminated (interrupted)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_death_path() {
        let phase = Phase::Alive.next(Transition::HealthDepleted);
        assert_eq!(phase, Phase::Dead);
        assert_eq!(phase.next(Transition::Cancelled), Phase::Terminated(Ending::Died));
    }

    #[test]
    fn test_victory_path() {
        let phase = Phase::Alive.next(Transition::NoOpponents);
        assert_eq!(phase, Phase::Victorious);
        assert_eq!(phase.next(Transition::Cancelled), Phase::Terminated(Ending::Won));
    }

    #[test]
    fn test_external_cancel_while_alive() {
        assert_eq!(
            Phase::Alive.next(Transition::Cancelled),
            Phase::Terminated(Ending::Interrupted)
        );
    }

    #[test]
    fn test_no_resurrection() {
        // A dead combatant cannot also win.
        assert_eq!(Phase::Dead.next(Transition::NoOpponents), Phase::Dead);
        assert_eq!(Phase::Victorious.next(Transition::HealthDepleted), Phase::Victorious);

        let done = Phase::Terminated(Ending::Won);
        for t in [Transition::HealthDepleted, Transition::NoOpponents, Transition::Cancelled] {
            assert_eq!(done.next(t), done);
        }
    }

    #[test]
    fn test_terminal_flags() {
        assert!(!Phase::Alive.is_terminal());
        assert!(Phase::Dead.is_terminal());
        assert_eq!(Phase::Alive.ending(), None);
        assert_eq!(Phase::Terminated(Ending::Died).ending(), Some(Ending::Died));
    }
}
