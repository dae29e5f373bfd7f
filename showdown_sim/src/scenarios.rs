//! Named fight scenarios.

use showdown_core::CombatantSpec;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// Two combatants, uneven health and damage
    Duel,

    /// Two identical combatants; a double kill is possible
    Standoff,

    /// Five combatants, everyone against everyone
    FreeForAll,

    /// Free-for-all over a network dropping a third of all attacks
    LossySaloon,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Duel,
            ScenarioId::Standoff,
            ScenarioId::FreeForAll,
            ScenarioId::LossySaloon,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Duel => "duel",
            ScenarioId::Standoff => "standoff",
            ScenarioId::FreeForAll => "free_for_all",
            ScenarioId::LossySaloon => "lossy_saloon",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Duel => "Doc (10 hp, 4 dmg) against Ringo (6 hp, 6 dmg)",
            ScenarioId::Standoff => "Two gunmen with 5 hp and 5 dmg; both may fall",
            ScenarioId::FreeForAll => "Five combatants from the classic roster, last one standing wins",
            ScenarioId::LossySaloon => "Free-for-all with 30% of attacks lost in transit",
        }
    }

    /// Combatants entering the arena, in port order.
    pub fn roster(&self) -> Vec<CombatantSpec> {
        let spec = |name: &str, health, damage| CombatantSpec {
            name: name.to_string(),
            health,
            damage,
        };
        match self {
            ScenarioId::Duel => vec![spec("Doc", 10, 4), spec("Ringo", 6, 6)],
            ScenarioId::Standoff => vec![spec("Wyatt", 5, 5), spec("Ike", 5, 5)],
            ScenarioId::FreeForAll | ScenarioId::LossySaloon => vec![
                spec("John", 10, 1),
                spec("Bill", 8, 2),
                spec("Sam", 10, 1),
                spec("Peter", 5, 3),
                spec("Philip", 15, 1),
            ],
        }
    }

    /// Probability of an attack being dropped.
    pub fn loss_rate(&self) -> f64 {
        match self {
            ScenarioId::LossySaloon => 0.3,
            _ => 0.0,
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "duel" => Ok(ScenarioId::Duel),
            "standoff" => Ok(ScenarioId::Standoff),
            "free_for_all" | "freeforall" | "ffa" => Ok(ScenarioId::FreeForAll),
            "lossy_saloon" | "lossysaloon" => Ok(ScenarioId::LossySaloon),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
