//! Scenario service client.
//!
//! When the local deck has nothing to offer, scenarios can come from an
//! external service that answers a [`ScenarioContext`] with either one
//! `{id, scenario}` pair or a batch of them. Every failure on this path is
//! logged and turned into `None` so the caller can fall back locally.

mod http;
mod mock;
mod normalize;
mod queue;

pub use http::{parse_host, parse_http_status, HttpScenarioProvider};
pub use mock::{fallback_scenario, MockScenarioProvider};
pub use normalize::{normalize_scenario, summarize, WireOption, WireScenario, ALLOWED_KEYS};
pub use queue::{ScenarioQueue, DEFAULT_TARGET};

use std::collections::BTreeMap;
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dice::{dice_influence, Dice, DiceInfluence};
use crate::profiles::table_to_map;
use crate::scenario::{Phase, Scenario};
use crate::selector::ScenarioFallback;
use crate::state::{ChoiceRecord, GameState};
use crate::stats::{CompanyStats, Economy, HiddenStats, LeaderStats};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("invalid provider address {0:?}")]
    InvalidAddress(String),
    #[error("failed to resolve {host}")]
    Resolve { host: String },
    #[error("provider i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("HTTP error: {code} {reason}")]
    Status { code: u16, reason: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("payload contained no usable scenarios")]
    EmptyPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Single,
    Batch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchetypePreferences {
    pub scenario_affinity: BTreeMap<String, f64>,
    pub option_modifiers: BTreeMap<String, f64>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyContext {
    pub scenario_types: BTreeMap<String, f64>,
    pub exclusive_scenarios: Vec<String>,
    pub description: String,
}

/// Everything the scenario service is told about the current game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioContext {
    pub turn: u32,
    pub archetype: String,
    pub template: String,
    pub leader: LeaderStats,
    pub company: CompanyStats,
    pub hidden: HiddenStats,
    pub economy: Economy,
    pub flags: BTreeMap<String, bool>,
    pub recent_scenarios: Vec<String>,
    pub recent_choices: Vec<ChoiceRecord>,
    pub pressure: f64,
    pub dice: Option<Dice>,
    pub dice_influence: Option<DiceInfluence>,
    pub archetype_preferences: ArchetypePreferences,
    pub company_context: CompanyContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_type: Option<RequestType>,
}

impl ScenarioContext {
    pub fn from_state(state: &GameState, dice: Option<&Dice>) -> Self {
        let archetype = state.archetype.profile();
        let template = state.template.profile();
        Self {
            turn: state.turn,
            archetype: state.archetype.as_str().to_string(),
            template: state.template.as_str().to_string(),
            leader: state.leader,
            company: state.company,
            hidden: state.hidden,
            economy: state.economy,
            flags: state.flags.clone(),
            recent_scenarios: state.recent_scenarios.clone(),
            recent_choices: state.recent_choices.clone(),
            pressure: state.pressure(),
            dice: dice.copied(),
            dice_influence: dice.map(dice_influence),
            archetype_preferences: ArchetypePreferences {
                scenario_affinity: table_to_map(archetype.scenario_affinity),
                option_modifiers: table_to_map(archetype.option_modifiers),
                description: archetype.description.to_string(),
            },
            company_context: CompanyContext {
                scenario_types: table_to_map(template.scenario_types),
                exclusive_scenarios: template
                    .exclusive_scenarios
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                description: template.description.to_string(),
            },
            request_type: None,
        }
    }

    pub fn with_request_type(mut self, request_type: RequestType) -> Self {
        self.request_type = Some(request_type);
        self
    }

    pub fn is_batch(&self) -> bool {
        self.request_type == Some(RequestType::Batch)
    }

    /// Phase the service generates for: up to 3 early, up to 6 mid.
    pub fn phase(&self) -> Phase {
        Phase::for_scaling(self.turn)
    }
}

/// A normalized scenario received from the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderScenario {
    pub id: String,
    pub scenario: Scenario,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderPayload {
    Single(ProviderScenario),
    Batch(Vec<ProviderScenario>),
}

impl ProviderPayload {
    pub fn into_scenarios(self) -> Vec<ProviderScenario> {
        match self {
            ProviderPayload::Single(scenario) => vec![scenario],
            ProviderPayload::Batch(scenarios) => scenarios,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireEntry {
    id: String,
    scenario: WireScenario,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WirePayload {
    Batch { scenarios: Vec<serde_json::Value> },
    Single(WireEntry),
}

/// Decode and normalize a service response body. Batch entries that do not
/// decode are skipped; an empty result is an error.
pub fn parse_payload(body: &str, phase: Phase) -> Result<ProviderPayload, ProviderError> {
    let wire: WirePayload = serde_json::from_str(body)?;
    match wire {
        WirePayload::Single(entry) => Ok(ProviderPayload::Single(ProviderScenario {
            scenario: normalize_scenario(entry.scenario, phase),
            id: entry.id,
        })),
        WirePayload::Batch { scenarios } => {
            let scenarios: Vec<ProviderScenario> = scenarios
                .into_iter()
                .filter_map(|value| serde_json::from_value::<WireEntry>(value).ok())
                .map(|entry| ProviderScenario {
                    scenario: normalize_scenario(entry.scenario, phase),
                    id: entry.id,
                })
                .collect();
            if scenarios.is_empty() {
                return Err(ProviderError::EmptyPayload);
            }
            Ok(ProviderPayload::Batch(scenarios))
        }
    }
}

/// Trait for scenario services.
pub trait ScenarioProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// One request, no retries. `None` means the service was unavailable.
    fn request(&self, context: &ScenarioContext) -> Option<ProviderPayload>;
}

/// Selector fallback backed by the prefetch queue and a provider.
pub struct ProviderFallback<'a> {
    provider: &'a dyn ScenarioProvider,
    queue: Option<&'a mut ScenarioQueue>,
}

impl<'a> ProviderFallback<'a> {
    pub fn new(provider: &'a dyn ScenarioProvider, queue: Option<&'a mut ScenarioQueue>) -> Self {
        Self { provider, queue }
    }
}

impl ScenarioFallback for ProviderFallback<'_> {
    fn fetch(&mut self, state: &GameState, dice: &Dice) -> Option<ProviderScenario> {
        let context = ScenarioContext::from_state(state, Some(dice));

        let queued = self.queue.as_deref_mut().and_then(ScenarioQueue::pop);
        let scenario = match queued {
            Some(scenario) => Some(scenario),
            None => self
                .provider
                .request(&context.clone().with_request_type(RequestType::Single))
                .and_then(|payload| payload.into_scenarios().into_iter().next()),
        };

        if let Some(queue) = self.queue.as_deref_mut() {
            queue.refill(context);
        }
        scenario
    }
}
