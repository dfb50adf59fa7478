//! Weighted scenario selection.
//!
//! Each turn the selector first honours any due follow-up, then builds a
//! candidate pool from the deck (phase and freshness first, widening when
//! that comes up empty), gates it on flags, weights every candidate and
//! spins a roulette wheel over the shuffled pool. All randomness comes from
//! the generator stored in [`GameState`], so a resumed game picks the same
//! scenarios it would have picked before saving.

use thiserror::Error;

use crate::dice::{dice_influence, Dice, DiceInfluence};
use crate::provider::ProviderScenario;
use crate::rng::{index_below, unit_float, RngCore};
use crate::scenario::{Phase, Scenario, ScenarioDeck, ScenarioSource, SelectedScenario};
use crate::state::{GameState, ScheduledFollowup};

pub const FOLLOWUP_REASON: &str = "Follow-up from earlier decision";
pub const GENERATED_REASON: &str = "Generated by scenario service";

/// Lowest weight any candidate can end up with.
pub const MIN_WEIGHT: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("no scenario available for turn {turn}")]
    NoScenarioAvailable { turn: u32 },
}

/// Source of a scenario when the deck holds nothing at all.
pub trait ScenarioFallback {
    fn fetch(&mut self, state: &GameState, dice: &Dice) -> Option<ProviderScenario>;
}

/// Fallback that never produces anything.
pub struct NoFallback;

impl ScenarioFallback for NoFallback {
    fn fetch(&mut self, _state: &GameState, _dice: &Dice) -> Option<ProviderScenario> {
        None
    }
}

/// A candidate's final weight and the reasons that shaped it.
#[derive(Debug, Clone, PartialEq)]
pub struct Weighted {
    pub weight: f64,
    pub reasons: Vec<String>,
}

/// Pick the scenario for the current turn and record it as seen.
pub fn select_scenario(
    state: &mut GameState,
    deck: &mut ScenarioDeck,
    dice: &Dice,
    fallback: &mut dyn ScenarioFallback,
) -> Result<SelectedScenario, SelectionError> {
    while let Some(due) = take_due_followup(state) {
        let Some(scenario) = deck.get(&due.scenario_id).cloned() else {
            tracing::warn!(
                target: "leadsim::selector",
                scenario = %due.scenario_id,
                turn = state.turn,
                "followup.missing"
            );
            continue;
        };
        tracing::info!(
            target: "leadsim::selector",
            scenario = %due.scenario_id,
            turn = state.turn,
            "followup.selected"
        );
        record_selection(state, &due.scenario_id);
        return Ok(SelectedScenario {
            id: due.scenario_id,
            scenario,
            reasons: vec![FOLLOWUP_REASON.to_string()],
            source: ScenarioSource::Followup,
        });
    }

    if deck.is_empty() {
        return match fallback.fetch(state, dice) {
            Some(generated) => {
                tracing::info!(
                    target: "leadsim::selector",
                    scenario = %generated.id,
                    turn = state.turn,
                    "scenario.generated"
                );
                deck.remember_generated(&generated.id, &generated.scenario);
                record_selection(state, &generated.id);
                Ok(SelectedScenario {
                    id: generated.id,
                    scenario: generated.scenario,
                    reasons: vec![GENERATED_REASON.to_string()],
                    source: ScenarioSource::Provider,
                })
            }
            None => {
                tracing::warn!(
                    target: "leadsim::selector",
                    turn = state.turn,
                    "scenario.unavailable"
                );
                Err(SelectionError::NoScenarioAvailable { turn: state.turn })
            }
        };
    }

    let phase = Phase::for_selection(state.turn);
    let (mut pool, widened) = candidate_pool(state, deck, phase);
    shuffle(&mut pool, &mut state.rng);
    let pool = gate_on_flags(state, deck, pool);

    let influence = dice_influence(dice);
    let weighted: Vec<(&str, Weighted)> = pool
        .iter()
        .filter_map(|id| {
            deck.get(id)
                .map(|scenario| (id.as_str(), candidate_weight(state, id, scenario, &influence)))
        })
        .collect();

    let Some(index) = roulette(&weighted, &mut state.rng) else {
        return Err(SelectionError::NoScenarioAvailable { turn: state.turn });
    };
    let (id, chosen) = &weighted[index];
    let id = id.to_string();
    let mut reasons = chosen.reasons.clone();
    if let Some(note) = widened {
        reasons.insert(0, note);
    }
    let Some(scenario) = deck.get(&id).cloned() else {
        return Err(SelectionError::NoScenarioAvailable { turn: state.turn });
    };

    tracing::info!(
        target: "leadsim::selector",
        scenario = %id,
        turn = state.turn,
        phase = %phase,
        candidates = weighted.len(),
        weight = chosen.weight,
        "scenario.selected"
    );

    record_selection(state, &id);
    Ok(SelectedScenario {
        id,
        scenario,
        reasons,
        source: ScenarioSource::Deck,
    })
}

/// Remove and return the earliest follow-up due on or before this turn.
pub fn take_due_followup(state: &mut GameState) -> Option<ScheduledFollowup> {
    let index = state
        .followups
        .iter()
        .enumerate()
        .filter(|(_, followup)| followup.turn <= state.turn)
        .min_by_key(|(position, followup)| (followup.turn, *position))
        .map(|(position, _)| position)?;
    Some(state.followups.remove(index))
}

fn record_selection(state: &mut GameState, id: &str) {
    state.seen_scenario_ids.insert(id.to_string());
    state.push_recent_scenario(id);
}

/// Candidate ids in id order, plus a note when the pool had to be widened.
fn candidate_pool(
    state: &GameState,
    deck: &ScenarioDeck,
    phase: Phase,
) -> (Vec<String>, Option<String>) {
    let pick = |accept: &dyn Fn(&String, &Scenario) -> bool| -> Vec<String> {
        deck.iter()
            .filter(|entry| accept(entry.0, entry.1))
            .map(|(id, _)| id.clone())
            .collect()
    };
    let unseen = |id: &String| !state.seen_scenario_ids.contains(id);

    let fresh = pick(&|id, scenario| scenario.phase == phase && unseen(id));
    if !fresh.is_empty() {
        return (fresh, None);
    }

    let replay = pick(&|_, scenario| scenario.phase == phase);
    if !replay.is_empty() {
        return (
            replay,
            Some(format!("Revisiting {} scenarios", phase)),
        );
    }

    let neighbours = phase.adjacent();
    let adjacent = pick(&|id, scenario| neighbours.contains(&scenario.phase) && unseen(id));
    if !adjacent.is_empty() {
        return (
            adjacent,
            Some(format!("No {} scenarios left; drawing from nearby phases", phase)),
        );
    }

    (
        pick(&|_, _| true),
        Some("Drawing from the whole deck".to_string()),
    )
}

/// Fisher-Yates over the generator stored in the game state.
fn shuffle(ids: &mut [String], rng: &mut dyn RngCore) {
    for i in (1..ids.len()).rev() {
        let j = index_below(rng, i + 1);
        ids.swap(i, j);
    }
}

/// Drop candidates whose required flags are not all set, unless that
/// would leave nothing to draw.
fn gate_on_flags(state: &GameState, deck: &ScenarioDeck, pool: Vec<String>) -> Vec<String> {
    let gated: Vec<String> = pool
        .iter()
        .filter(|id| {
            deck.get(id).map_or(false, |scenario| {
                scenario.requires_flags.iter().all(|flag| state.flag(flag))
            })
        })
        .cloned()
        .collect();

    if gated.is_empty() {
        tracing::debug!(
            target: "leadsim::selector",
            candidates = pool.len(),
            "flag_gate.ignored"
        );
        pool
    } else {
        gated
    }
}

/// Additive bonus from a scenario tag that matches a current pain point.
fn pain_point(tag: &str, state: &GameState, pressure: f64) -> Option<(f64, String)> {
    let company = &state.company;
    let hidden = &state.hidden;
    match tag {
        "velocity_low" if company.velocity <= 55 => {
            Some((2.0, format!("Velocity is low ({})", company.velocity)))
        }
        "morale_low" if company.morale <= 55 => {
            Some((2.0, format!("Morale is low ({})", company.morale)))
        }
        "tech_debt_high" if company.tech_debt >= 60 => {
            Some((2.0, format!("Tech debt is high ({})", company.tech_debt)))
        }
        "financials_low" if company.financials <= 40 => {
            Some((3.0, format!("Financials are weak ({})", company.financials)))
        }
        "trust_low" if state.leader.trust <= 50 => {
            Some((2.0, format!("Trust is low ({})", state.leader.trust)))
        }
        "stakeholder_pressure" if company.stakeholder <= 55 || pressure >= 60.0 => Some((
            2.0,
            format!(
                "Stakeholders are restless ({}, pressure {:.0})",
                company.stakeholder, pressure
            ),
        )),
        "burnout_high" if hidden.burnout >= 5 => {
            Some((3.0, format!("Burnout is building ({})", hidden.burnout)))
        }
        "crisis_risk" if hidden.crisis >= 5 => {
            Some((3.0, format!("Crisis risk is elevated ({})", hidden.crisis)))
        }
        "onboarding" if state.turn == 1 => Some((3.0, "First turn in the role".to_string())),
        _ => None,
    }
}

/// Weight a single candidate against the current state and dice.
pub fn candidate_weight(
    state: &GameState,
    id: &str,
    scenario: &Scenario,
    influence: &DiceInfluence,
) -> Weighted {
    let pressure = state.pressure();
    let mut weight = 1.0;
    let mut reasons = Vec::new();

    for tag in &scenario.tags {
        if let Some((bonus, reason)) = pain_point(tag, state, pressure) {
            weight += bonus;
            reasons.push(reason);
        }
    }

    for tag in &scenario.tags {
        if let Some(bonus) = state.template.scenario_bias(tag) {
            weight += bonus;
            reasons.push(format!("Common at a {} ({})", state.template, tag));
        }
    }

    for tag in &scenario.tags {
        if let Some(factor) = influence.scenario_modifiers.get(tag) {
            weight *= factor;
            reasons.push(format!("Dice favour {} (x{})", tag, factor));
        }
    }

    if let Some(idx) = state.recent_scenarios.iter().position(|recent| recent == id) {
        let penalty = (1.0 - 0.2 * (idx as f64 + 1.0)).max(0.1);
        weight *= penalty;
        reasons.push(format!("Seen recently (x{:.1})", penalty));
    }

    Weighted {
        weight: weight.max(MIN_WEIGHT),
        reasons,
    }
}

/// Roulette-wheel draw; returns the winning index.
fn roulette(weighted: &[(&str, Weighted)], rng: &mut dyn RngCore) -> Option<usize> {
    if weighted.is_empty() {
        return None;
    }
    let total: f64 = weighted.iter().map(|(_, w)| w.weight).sum();
    let mut roll = unit_float(rng) * total;
    for (index, (_, candidate)) in weighted.iter().enumerate() {
        roll -= candidate.weight;
        if roll <= 0.0 {
            return Some(index);
        }
    }
    Some(weighted.len() - 1)
}
