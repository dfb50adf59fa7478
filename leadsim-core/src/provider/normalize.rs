//! Turning loosely-shaped service scenarios into playable ones.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::effects::ensure_tradeoffs;
use crate::scenario::{Phase, Scenario, ScenarioOption};
use crate::stats::{Deltas, StatKey};

/// Keys a service scenario may touch.
pub const ALLOWED_KEYS: [StatKey; 16] = StatKey::ALL;

const OPTION_COUNT: usize = 3;
const MAX_DELTAS: usize = 3;

/// A scenario as the service sends it. Everything is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireScenario {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub options: BTreeMap<String, WireOption>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireOption {
    #[serde(default)]
    pub hint: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub immediate: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Exactly three options, each with two or three whitelisted deltas that
/// include both a gain and a cost, and a summary. The phase is always the
/// one the request was made for.
pub fn normalize_scenario(wire: WireScenario, phase: Phase) -> Scenario {
    let mut options: BTreeMap<String, ScenarioOption> = wire
        .options
        .into_iter()
        .take(OPTION_COUNT)
        .map(|(id, option)| (id, normalize_option(option)))
        .collect();

    let mut next = options.len() + 1;
    while options.len() < OPTION_COUNT {
        let id = format!("alt_{next}");
        next += 1;
        if options.contains_key(&id) {
            continue;
        }
        options.insert(id, alternative_option());
    }

    Scenario {
        phase,
        tags: wire.tags,
        title: wire.title,
        text: wire.text,
        options,
        requires_flags: Vec::new(),
    }
}

fn alternative_option() -> ScenarioOption {
    let immediate: Deltas = [(StatKey::VELOCITY, 1.0), (StatKey::MORALE, -1.0)]
        .into_iter()
        .collect();
    ScenarioOption {
        hint: "Alternative".to_string(),
        description: "Alternative approach with tradeoffs.".to_string(),
        summary: Some(summarize(&immediate)),
        immediate,
        tags: vec!["strategic".to_string()],
        ..ScenarioOption::default()
    }
}

fn normalize_option(wire: WireOption) -> ScenarioOption {
    let immediate = normalize_deltas(&wire.immediate);
    let summary = wire
        .summary
        .filter(|summary| !summary.trim().is_empty())
        .unwrap_or_else(|| summarize(&immediate));

    ScenarioOption {
        hint: wire.hint,
        description: wire.description,
        immediate,
        tags: wire.tags,
        summary: Some(summary),
        ..ScenarioOption::default()
    }
}

fn allowed_key(name: &str) -> Option<StatKey> {
    ALLOWED_KEYS
        .iter()
        .find(|key| key.to_string() == name)
        .copied()
}

fn normalize_deltas(raw: &BTreeMap<String, serde_json::Value>) -> Deltas {
    let mut deltas: Deltas = raw
        .iter()
        .filter_map(|(name, value)| {
            let key = allowed_key(name)?;
            let value = value.as_f64().filter(|v| v.is_finite() && *v != 0.0)?;
            Some((key, value))
        })
        .take(MAX_DELTAS)
        .collect();

    match deltas.len() {
        0 => {
            deltas.insert(StatKey::VELOCITY, 1.0);
            deltas.insert(StatKey::MORALE, -1.0);
            deltas
        }
        1 => {
            let only = deltas.iter().next().map(|(key, value)| (*key, *value));
            if let Some((key, value)) = only {
                let partner = if key == StatKey::VELOCITY {
                    StatKey::MORALE
                } else {
                    StatKey::VELOCITY
                };
                deltas.insert(partner, if value > 0.0 { -1.0 } else { 1.0 });
            }
            deltas
        }
        _ => {
            let positive = deltas.values().any(|v| *v > 0.0);
            let negative = deltas.values().any(|v| *v < 0.0);
            if positive && negative {
                return deltas;
            }
            let pair: Deltas = deltas.into_iter().take(2).collect();
            ensure_tradeoffs(&pair)
        }
    }
}

fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// One-line "Gains: ... Costs: ..." description of a delta set.
pub fn summarize(deltas: &Deltas) -> String {
    let gains: Vec<String> = deltas
        .iter()
        .filter(|(_, v)| **v > 0.0)
        .map(|(key, v)| format!("{} +{}", key.stat_name(), format_amount(*v)))
        .collect();
    let costs: Vec<String> = deltas
        .iter()
        .filter(|(_, v)| **v < 0.0)
        .map(|(key, v)| format!("{} {}", key.stat_name(), format_amount(*v)))
        .collect();

    let mut parts = Vec::new();
    if !gains.is_empty() {
        parts.push(format!("Gains: {}", gains.join(", ")));
    }
    if !costs.is_empty() {
        parts.push(format!("Costs: {}", costs.join(", ")));
    }
    parts.join(". ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wire(value: serde_json::Value) -> WireScenario {
        serde_json::from_value(value).unwrap()
    }

    fn is_tradeoff(deltas: &Deltas) -> bool {
        deltas.values().any(|v| *v > 0.0) && deltas.values().any(|v| *v < 0.0)
    }

    #[test]
    fn pads_to_three_options() {
        let scenario = normalize_scenario(
            wire(json!({"title": "Lonely", "options": {
                "only": {"hint": "Go", "immediate": {"company.velocity": 2, "leader.trust": -1}}
            }})),
            Phase::Early,
        );
        let ids: Vec<_> = scenario.options.keys().cloned().collect();
        assert_eq!(ids, vec!["alt_2", "alt_3", "only"]);
        let alt = &scenario.options["alt_2"];
        assert_eq!(alt.hint, "Alternative");
        assert_eq!(alt.tags, vec!["strategic".to_string()]);
        assert_eq!(alt.immediate.get(&StatKey::VELOCITY), Some(&1.0));
        assert_eq!(alt.immediate.get(&StatKey::MORALE), Some(&-1.0));
    }

    #[test]
    fn trims_extra_options() {
        let scenario = normalize_scenario(
            wire(json!({"options": {"a": {}, "b": {}, "c": {}, "d": {}}})),
            Phase::Late,
        );
        assert_eq!(scenario.options.len(), 3);
        assert!(!scenario.options.contains_key("d"));
        assert_eq!(scenario.phase, Phase::Late);
    }

    #[test]
    fn unknown_keys_are_dropped() {
        let scenario = normalize_scenario(
            wire(json!({"options": {"a": {"immediate": {
                "company.happiness": 5, "leader.trust": "lots", "company.velocity": 3, "leader.vision": -2
            }}}})),
            Phase::Mid,
        );
        let deltas = &scenario.options["a"].immediate;
        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas.get(&StatKey::VELOCITY), Some(&3.0));
        assert_eq!(deltas.get(&StatKey::VISION), Some(&-2.0));
    }

    #[test]
    fn single_delta_gets_a_partner() {
        let scenario = normalize_scenario(
            wire(json!({"options": {
                "a": {"immediate": {"company.velocity": 3}},
                "b": {"immediate": {"leader.trust": -2}}
            }})),
            Phase::Mid,
        );
        let a = &scenario.options["a"].immediate;
        assert_eq!(a.get(&StatKey::MORALE), Some(&-1.0));
        let b = &scenario.options["b"].immediate;
        assert_eq!(b.get(&StatKey::VELOCITY), Some(&1.0));
    }

    #[test]
    fn one_sided_sets_become_tradeoffs() {
        let scenario = normalize_scenario(
            wire(json!({"options": {"a": {"immediate": {
                "company.velocity": 2, "leader.trust": 2, "leader.vision": 2
            }}}})),
            Phase::Mid,
        );
        let deltas = &scenario.options["a"].immediate;
        assert!(is_tradeoff(deltas));
        assert!((2..=3).contains(&deltas.len()));
    }

    #[test]
    fn every_option_has_a_summary() {
        let scenario = normalize_scenario(
            wire(json!({"options": {
                "a": {"immediate": {"company.velocity": 2, "leader.trust": -1}},
                "b": {"summary": "Kept as written", "immediate": {"company.morale": 1, "company.tech_debt": 2}}
            }})),
            Phase::Early,
        );
        assert_eq!(
            scenario.options["a"].summary.as_deref(),
            Some("Gains: velocity +2. Costs: trust -1")
        );
        assert_eq!(scenario.options["b"].summary.as_deref(), Some("Kept as written"));
        assert!(scenario.options.values().all(|o| o.summary.is_some()));
    }
}
