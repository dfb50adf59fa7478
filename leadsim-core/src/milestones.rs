//! Quarterly reviews and annual endings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::expr::Condition;
use crate::state::GameState;
use crate::stats::{Deltas, StatGroup, StatKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneConfig {
    pub quarterly: QuarterlyConfig,
    pub annual: AnnualConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarterlyConfig {
    /// Review cadence in turns. Zero disables reviews.
    pub every_turns: u32,
    /// Bare company or leader stat name -> weight.
    pub score_formula: BTreeMap<String, f64>,
    #[serde(default)]
    pub effects: Vec<QuarterlyEffect>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterlyEffect {
    pub condition: Condition,
    pub message: String,
    #[serde(default, skip_serializing_if = "Deltas::is_empty")]
    pub bonus: Deltas,
    #[serde(default, skip_serializing_if = "Deltas::is_empty")]
    pub penalty: Deltas,
}

impl QuarterlyEffect {
    /// The bonus if one is configured, otherwise the penalty.
    pub fn deltas(&self) -> &Deltas {
        if self.bonus.is_empty() {
            &self.penalty
        } else {
            &self.bonus
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualConfig {
    /// First turn on which endings are checked.
    pub turn: u32,
    pub endings: Vec<EndingRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndingRule {
    pub condition: Condition,
    pub message: String,
}

/// Outcome of a quarterly review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterlyReview {
    pub turn: u32,
    pub score: f64,
    pub messages: Vec<String>,
}

impl QuarterlyConfig {
    pub fn is_due(&self, turn: u32) -> bool {
        self.every_turns > 0 && turn % self.every_turns == 0
    }

    /// Weighted sum over the configured stats. Company stats are looked up
    /// before leader stats; anything else is ignored.
    pub fn score(&self, state: &GameState) -> f64 {
        self.score_formula
            .iter()
            .filter_map(|(name, weight)| {
                let key = [StatGroup::Company, StatGroup::Leader]
                    .iter()
                    .find_map(|group| {
                        StatKey::from_name(&format!("{}.{}", group.as_str(), name))
                    })?;
                Some(state.stat(key) * weight)
            })
            .sum()
    }
}

impl MilestoneConfig {
    /// Score the quarter, append it to the history and apply every effect
    /// whose condition holds. An effect carrying both a bonus and a penalty
    /// applies only the bonus.
    pub fn run_quarterly_review(&self, state: &mut GameState) -> QuarterlyReview {
        let score = self.quarterly.score(state);
        state.quarterly_scores.push(score);

        let mut messages = Vec::new();
        for effect in &self.quarterly.effects {
            let fired = {
                let view: &GameState = state;
                effect.condition.is_met(&|name| view.variable(name))
            };
            if fired {
                state.apply_deltas(effect.deltas());
                messages.push(effect.message.clone());
            }
        }

        tracing::info!(
            target: "leadsim::progression",
            turn = state.turn,
            score,
            effects = messages.len(),
            "quarterly.review"
        );

        QuarterlyReview {
            turn: state.turn,
            score,
            messages,
        }
    }

    /// First ending whose condition holds, once the annual turn is reached.
    pub fn check_endings(&self, state: &GameState) -> Option<&EndingRule> {
        if state.turn < self.annual.turn {
            return None;
        }
        self.annual
            .endings
            .iter()
            .find(|ending| ending.condition.is_met(&|name| state.variable(name)))
    }
}
