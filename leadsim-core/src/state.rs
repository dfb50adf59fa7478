//! The single mutable aggregate owned by a running session.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::dice::Dice;
use crate::profiles::{Archetype, CompanyTemplate};
use crate::rng::Lcg;
use crate::scenario::SelectedScenario;
use crate::stats::{
    clamp_stat, CompanyStats, Deltas, Economy, HiddenStats, LeaderStats, StatKey,
};

/// Capacity of the recent scenario and recent choice buffers.
pub const RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    #[default]
    Setup,
    Playing,
    Ended,
}

/// Deltas waiting for a future turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayedEffect {
    pub turn: u32,
    pub effects: Deltas,
}

/// A scenario forced to reappear on a future turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledFollowup {
    pub turn: u32,
    pub scenario_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceRecord {
    pub turn: u32,
    pub scenario_id: String,
    pub option_id: String,
    pub hint: String,
    pub tags: Vec<String>,
}

/// How a run finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum GameEnding {
    OutOfCash { turn: u32, message: String },
    Annual { turn: u32, message: String },
}

impl GameEnding {
    pub fn message(&self) -> &str {
        match self {
            GameEnding::OutOfCash { message, .. } | GameEnding::Annual { message, .. } => message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub game_phase: GamePhase,
    pub leader: LeaderStats,
    pub company: CompanyStats,
    pub hidden: HiddenStats,
    pub economy: Economy,
    pub turn: u32,
    pub archetype: Archetype,
    pub template: CompanyTemplate,
    /// Template the run began with; `template` changes on promotion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_template: Option<CompanyTemplate>,
    #[serde(default)]
    pub delayed: Vec<DelayedEffect>,
    #[serde(default)]
    pub followups: Vec<ScheduledFollowup>,
    #[serde(default)]
    pub flags: BTreeMap<String, bool>,
    #[serde(default)]
    pub seen_scenario_ids: BTreeSet<String>,
    #[serde(default)]
    pub recent_scenarios: Vec<String>,
    #[serde(default)]
    pub recent_choices: Vec<ChoiceRecord>,
    #[serde(flatten)]
    pub rng: Lcg,
    #[serde(default)]
    pub quarterly_scores: Vec<f64>,
    #[serde(default)]
    pub last_deltas: Deltas,
    #[serde(default)]
    pub promotion_progress: f64,
    #[serde(default)]
    pub current_dice: Option<Dice>,
    #[serde(default)]
    pub current_scenario: Option<SelectedScenario>,
    #[serde(default)]
    pub ending: Option<GameEnding>,
}

impl GameState {
    /// Fresh state for a run: base stats from the archetype and template.
    pub fn new(archetype: Archetype, template: CompanyTemplate, seed: u32) -> Self {
        let template_profile = template.profile();
        Self {
            game_phase: GamePhase::Setup,
            leader: archetype.profile().stats,
            company: template_profile.stats,
            hidden: HiddenStats::default(),
            economy: template_profile.economy,
            turn: 1,
            archetype,
            template,
            starting_template: Some(template),
            delayed: Vec::new(),
            followups: Vec::new(),
            flags: BTreeMap::new(),
            seen_scenario_ids: BTreeSet::new(),
            recent_scenarios: Vec::new(),
            recent_choices: Vec::new(),
            rng: Lcg::new(seed),
            quarterly_scores: Vec::new(),
            last_deltas: Deltas::new(),
            promotion_progress: 0.0,
            current_dice: None,
            current_scenario: None,
            ending: None,
        }
    }

    /// Template the run was started with, before any promotion.
    pub fn starting_template(&self) -> CompanyTemplate {
        self.starting_template.unwrap_or(self.template)
    }

    pub fn is_playing(&self) -> bool {
        self.game_phase == GamePhase::Playing
    }

    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    /// Flags are monotonic: once set they stay set.
    pub fn set_flag(&mut self, name: impl Into<String>) {
        self.flags.insert(name.into(), true);
    }

    pub fn stat(&self, key: StatKey) -> f64 {
        match key {
            StatKey::Leader(stat) => f64::from(self.leader.get(stat)),
            StatKey::Company(stat) => f64::from(self.company.get(stat)),
            StatKey::Hidden(stat) => f64::from(self.hidden.get(stat)),
            StatKey::Economy(stat) => self.economy.get(stat),
        }
    }

    /// Add `delta` to a stat. Leader, company and hidden stats are rounded
    /// and clamped into [0, 100]; economy values only floor at 0.
    pub fn apply_delta(&mut self, key: StatKey, delta: f64) {
        if !delta.is_finite() {
            return;
        }
        let slot = match key {
            StatKey::Leader(stat) => self.leader.get_mut(stat),
            StatKey::Company(stat) => self.company.get_mut(stat),
            StatKey::Hidden(stat) => self.hidden.get_mut(stat),
            StatKey::Economy(stat) => {
                let value = self.economy.get_mut(stat);
                *value = (*value + delta).max(0.0);
                return;
            }
        };
        *slot = clamp_stat((f64::from(*slot) + delta).round() as i32);
    }

    pub fn apply_deltas(&mut self, deltas: &Deltas) {
        for (key, delta) in deltas {
            self.apply_delta(*key, *delta);
        }
    }

    /// 0-100 blend of stakeholder misalignment, financial weakness and crisis risk.
    pub fn pressure(&self) -> f64 {
        let stakeholder_gap = f64::from(100 - self.company.stakeholder);
        let financial_gap = f64::from(100 - self.company.financials);
        let crisis = (f64::from(self.hidden.crisis) * 12.0).min(100.0);
        (0.4 * stakeholder_gap + 0.4 * financial_gap + 0.2 * crisis).clamp(0.0, 100.0)
    }

    /// Resolve a condition variable: any stat by bare or dotted name, plus
    /// `turn`, `pressure` and `score` (latest quarterly score).
    pub fn variable(&self, name: &str) -> Option<f64> {
        match name {
            "turn" => Some(f64::from(self.turn)),
            "pressure" => Some(self.pressure()),
            "score" => self.quarterly_scores.last().copied(),
            _ => StatKey::from_name(name).map(|key| self.stat(key)),
        }
    }

    pub(crate) fn push_recent_scenario(&mut self, id: &str) {
        self.recent_scenarios.retain(|existing| existing != id);
        self.recent_scenarios.insert(0, id.to_string());
        self.recent_scenarios.truncate(RECENT_LIMIT);
    }

    pub(crate) fn push_recent_choice(&mut self, record: ChoiceRecord) {
        self.recent_choices.insert(0, record);
        self.recent_choices.truncate(RECENT_LIMIT);
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(Archetype::Operator, CompanyTemplate::Startup, 1)
    }
}
