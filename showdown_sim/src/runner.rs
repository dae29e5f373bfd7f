//! Scenario runner - executes fight scenarios and checks their outcome.

use crate::scenarios::ScenarioId;
use crate::world::{Arena, ArenaConfig, ArenaReport};

use serde::Serialize;
use showdown_core::{Ending, Journal, JournalError, LoopConfig, Phase};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

/// Failures setting a run up.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Failed to prepare journal directory {path}: {source}")]
    JournalDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Journal(#[from] JournalError),
}

/// Results from running a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: &'static str,

    /// Whether the fight ended consistently
    pub passed: bool,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// What happened
    pub report: ArenaReport,
}

/// Runs fight scenarios, one journal directory per run.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Parent of the per-run journal directories
    journal_root: PathBuf,

    /// Combat loop timing
    loop_config: LoopConfig,

    /// Real-time bound per run
    max_wall_time: Duration,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64, journal_root: impl Into<PathBuf>) -> Self {
        Self {
            seed,
            journal_root: journal_root.into(),
            loop_config: LoopConfig::default(),
            max_wall_time: Duration::from_secs(30),
        }
    }

    /// Sets the combat loop timing.
    pub fn with_loop_config(mut self, config: LoopConfig) -> Self {
        self.loop_config = config;
        self
    }

    /// Sets the real-time bound per run.
    pub fn with_max_wall_time(mut self, limit: Duration) -> Self {
        self.max_wall_time = limit;
        self
    }

    /// Journal directory used for `scenario`.
    pub fn journal_dir(&self, scenario: ScenarioId) -> PathBuf {
        self.journal_root.join(format!("{}-{}", scenario.name(), self.seed))
    }

    /// Runs a scenario and returns the result.
    pub async fn run(&self, scenario: ScenarioId) -> Result<ScenarioResult, SimError> {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let journal = open_fresh_journal(&self.journal_dir(scenario))?;
        let config = ArenaConfig {
            seed: self.seed,
            loss_rate: scenario.loss_rate(),
            loop_config: self.loop_config,
            max_wall_time: self.max_wall_time,
        };

        let mut arena = Arena::new(config, journal.clone());
        for spec in scenario.roster() {
            arena.enter(&spec);
        }
        let report = arena.run().await;
        journal.close()?;

        let failure_reason = check(&report).err();
        if let Some(reason) = &failure_reason {
            error!(scenario = scenario.name(), %reason, "Scenario failed");
        }
        Ok(ScenarioResult {
            scenario: scenario.name(),
            passed: failure_reason.is_none(),
            failure_reason,
            report,
        })
    }
}

/// Opens the journal at `dir`, discarding any earlier run's records.
fn open_fresh_journal(dir: &Path) -> Result<std::sync::Arc<Journal>, SimError> {
    std::fs::create_dir_all(dir).map_err(|source| SimError::JournalDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let journal = Journal::open(dir)?;
    journal.reset()?;
    Ok(std::sync::Arc::new(journal))
}

/// Consistency of a finished fight.
///
/// Everyone terminated on their own, at most one won, a winner still has
/// health and nobody else does, and every combatant left at least its
/// initialization record.
pub fn check(report: &ArenaReport) -> Result<(), String> {
    if let Some(c) = report.with_ending(Ending::Interrupted).next() {
        return Err(format!("{} never finished", c.name));
    }
    if let Some(c) = report
        .combatants
        .iter()
        .find(|c| !matches!(c.phase, Phase::Terminated(_)))
    {
        return Err(format!("{} is still {}", c.name, c.phase));
    }

    let winners: Vec<_> = report.with_ending(Ending::Won).collect();
    if winners.len() > 1 {
        return Err(format!("{} winners", winners.len()));
    }
    if let Some(w) = winners.first() {
        if w.health == 0 {
            return Err(format!("winner {} has no health left", w.name));
        }
    }
    for c in report.with_ending(Ending::Died) {
        if c.health != 0 {
            return Err(format!("{} died with {} health", c.name, c.health));
        }
    }

    if report.journal_records < report.combatants.len() {
        return Err(format!(
            "journal holds {} records for {} combatants",
            report.journal_records,
            report.combatants.len()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::CombatantReport;

    fn report(combatants: Vec<(&str, Phase, u64)>) -> ArenaReport {
        ArenaReport {
            seed: 1,
            winner: None,
            journal_records: combatants.len() * 2,
            combatants: combatants
                .into_iter()
                .map(|(name, phase, health)| CombatantReport {
                    name: name.into(),
                    endpoint: "10.0.0.1:50002".into(),
                    phase,
                    health,
                })
                .collect(),
            attacks_delivered: 0,
            attacks_dropped: 0,
            virtual_time_secs: 0.0,
            journal_bytes: 0,
        }
    }

    #[test]
    fn test_check_accepts_clean_finish() {
        let r = report(vec![
            ("Doc", Phase::Terminated(Ending::Won), 2),
            ("Ringo", Phase::Terminated(Ending::Died), 0),
        ]);
        assert_eq!(check(&r), Ok(()));
    }

    #[test]
    fn test_check_accepts_double_kill() {
        let r = report(vec![
            ("Wyatt", Phase::Terminated(Ending::Died), 0),
            ("Ike", Phase::Terminated(Ending::Died), 0),
        ]);
        assert_eq!(check(&r), Ok(()));
    }

    #[test]
    fn test_check_rejects_two_winners() {
        let r = report(vec![
            ("Doc", Phase::Terminated(Ending::Won), 2),
            ("Ringo", Phase::Terminated(Ending::Won), 1),
        ]);
        assert_eq!(check(&r), Err("2 winners".to_string()));
    }

    #[test]
    fn test_check_rejects_interrupted() {
        let r = report(vec![("Doc", Phase::Terminated(Ending::Interrupted), 2)]);
        assert!(check(&r).unwrap_err().contains("never finished"));
    }

    #[tokio::test]
    async fn test_rerun_starts_with_empty_journal() {
        let root = tempfile::tempdir().unwrap();
        let runner = ScenarioRunner::new(3, root.path());

        let first = runner.run(ScenarioId::Duel).await.unwrap();
        let second = runner.run(ScenarioId::Duel).await.unwrap();

        assert!(first.passed, "{:?}", first.failure_reason);
        assert!(second.passed, "{:?}", second.failure_reason);
        let records = showdown_core::read_records(&runner.journal_dir(ScenarioId::Duel).join(showdown_core::JOURNAL_FILE)).unwrap();
        assert_eq!(records.len(), second.report.journal_records);
    }
}
