//! Scenario records and the scenario deck.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::stats::Deltas;

/// Coarse game stage derived from the turn number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Early,
    Mid,
    Late,
}

impl Phase {
    /// Convention used when picking scenarios: 1 early, 2..=6 mid, later late.
    pub fn for_selection(turn: u32) -> Self {
        match turn {
            0 | 1 => Phase::Early,
            2..=6 => Phase::Mid,
            _ => Phase::Late,
        }
    }

    /// Convention used when scaling effects and by the scenario service:
    /// up to 3 early, up to 6 mid, later late.
    pub fn for_scaling(turn: u32) -> Self {
        match turn {
            0..=3 => Phase::Early,
            4..=6 => Phase::Mid,
            _ => Phase::Late,
        }
    }

    /// Phases tried when the current one has nothing fresh to offer.
    pub fn adjacent(&self) -> &'static [Phase] {
        match self {
            Phase::Early => &[Phase::Mid],
            Phase::Mid => &[Phase::Early, Phase::Late],
            Phase::Late => &[Phase::Mid],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Early => "early",
            Phase::Mid => "mid",
            Phase::Late => "late",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn one_turn() -> u32 {
    1
}

/// Deltas applied, unscaled, a number of turns after the choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayedSpec {
    #[serde(default = "one_turn")]
    pub turns: u32,
    pub effects: Deltas,
}

/// Forces a scenario to reappear a number of turns after the choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowupSpec {
    #[serde(default = "one_turn")]
    pub turns: u32,
    pub scenario_id: String,
}

/// One choice offered by a scenario.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioOption {
    #[serde(default)]
    pub hint: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub immediate: Deltas,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delayed: Option<DelayedSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub set_flags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followup: Option<FollowupSpec>,
}

/// A scripted situation the leader must respond to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub phase: Phase,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    pub options: BTreeMap<String, ScenarioOption>,
    /// Flags that must all be set before the scenario can be drawn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires_flags: Vec<String>,
}

impl Scenario {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn option(&self, option_id: &str) -> Option<&ScenarioOption> {
        self.options.get(option_id)
    }
}

/// Where a presented scenario came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioSource {
    Followup,
    Deck,
    Provider,
    Fallback,
}

/// The scenario presented for the current turn, with the reasons it won.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedScenario {
    pub id: String,
    pub scenario: Scenario,
    pub reasons: Vec<String>,
    pub source: ScenarioSource,
}

/// Scenario repository keyed by id.
///
/// Scenarios obtained from the scenario service are kept apart from the
/// configured deck so follow-ups can still reference them while the deck
/// itself stays empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDeck {
    pub scenarios: BTreeMap<String, Scenario>,
    #[serde(skip)]
    pub generated: BTreeMap<String, Scenario>,
}

impl ScenarioDeck {
    pub fn new(scenarios: BTreeMap<String, Scenario>) -> Self {
        Self {
            scenarios,
            generated: BTreeMap::new(),
        }
    }

    /// True when no configured scenarios exist.
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn get(&self, id: &str) -> Option<&Scenario> {
        self.scenarios.get(id).or_else(|| self.generated.get(id))
    }

    pub fn remember_generated(&mut self, id: &str, scenario: &Scenario) {
        if !self.scenarios.contains_key(id) {
            self.generated.insert(id.to_string(), scenario.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Scenario)> {
        self.scenarios.iter()
    }
}
