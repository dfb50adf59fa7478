//! Resolving a chosen option into committed stat changes.

use crate::dice::{dice_influence, Dice, EffectMultipliers};
use crate::profiles::phase_factor;
use crate::scenario::{Phase, ScenarioOption};
use crate::state::{ChoiceRecord, DelayedEffect, GameState, ScheduledFollowup};
use crate::stats::{Deltas, StatKey};

/// Base multiplier applied to every delta before the situational factors.
pub const BASE_SCALE: f64 = 1.2;
/// How strongly pressure amplifies effects at 100 pressure.
pub const PRESSURE_BOOST: f64 = 0.5;

const POSITIVE_COUNTERWEIGHTS: [StatKey; 4] = [
    StatKey::MORALE,
    StatKey::VELOCITY,
    StatKey::TRUST,
    StatKey::STAKEHOLDER,
];

const NEGATIVE_COUNTERWEIGHTS: [StatKey; 4] = [
    StatKey::TRUST,
    StatKey::STAKEHOLDER,
    StatKey::MORALE,
    StatKey::VELOCITY,
];

fn has_positive(deltas: &Deltas) -> bool {
    deltas.values().any(|v| *v > 0.0)
}

fn has_negative(deltas: &Deltas) -> bool {
    deltas.values().any(|v| *v < 0.0)
}

/// Guarantee at least one gain and one cost.
///
/// A single-signed delta set gets a counterweight of roughly a third of its
/// total magnitude (at least 1) on the first preferred stat it does not
/// already touch.
pub fn ensure_tradeoffs(deltas: &Deltas) -> Deltas {
    let mut balanced = deltas.clone();
    let positive = has_positive(deltas);
    let negative = has_negative(deltas);

    if positive && negative {
        return balanced;
    }
    if !positive && !negative {
        balanced.insert(StatKey::VELOCITY, 1.0);
        balanced.insert(StatKey::MORALE, -1.0);
        return balanced;
    }

    let magnitude: f64 = deltas.values().map(|v| v.abs()).sum();
    let counterweight = (magnitude / 3.0).round().max(1.0);
    let (preferred, sign) = if positive {
        (&POSITIVE_COUNTERWEIGHTS, -1.0)
    } else {
        (&NEGATIVE_COUNTERWEIGHTS, 1.0)
    };

    let target = preferred
        .iter()
        .chain(StatKey::ALL.iter().filter(|key| key.group().is_bounded()))
        .find(|key| deltas.get(*key).map_or(true, |v| *v == 0.0))
        .copied();

    if let Some(key) = target {
        balanced.insert(key, sign * counterweight);
    }
    balanced
}

/// Combined scalar for an option chosen in the current state.
pub fn effect_scale(
    state: &GameState,
    option: &ScenarioOption,
    multipliers: &EffectMultipliers,
) -> f64 {
    let phase = Phase::for_scaling(state.turn);
    let pressure = state.pressure();
    let mut scale = BASE_SCALE
        * phase_factor(phase)
        * state.template.profile().effect_factor
        * (1.0 + PRESSURE_BOOST * pressure / 100.0);

    scale *= state.archetype.option_multiplier(&option.tags);

    if let Some(positive) = multipliers.positive {
        if has_positive(&option.immediate) {
            scale *= positive;
        }
    }
    if let Some(negative) = multipliers.negative {
        if has_negative(&option.immediate) {
            scale *= negative;
        }
    }
    scale
}

/// Multiply every delta by `scale`. Leader, company and hidden deltas are
/// rounded to whole points, never below one point in magnitude, so the
/// result is exactly what gets added before clamping. Economy deltas stay
/// fractional.
pub fn scale_effects(deltas: &Deltas, scale: f64) -> Deltas {
    deltas
        .iter()
        .map(|(key, value)| {
            let scaled = value * scale;
            if !key.group().is_bounded() || scaled == 0.0 {
                return (*key, scaled);
            }
            let rounded = scaled.round();
            let whole = if rounded == 0.0 { scaled.signum() } else { rounded };
            (*key, whole)
        })
        .collect()
}

/// Apply a chosen option to the state and return the deltas actually
/// committed. Also queues delayed effects and follow-ups, sets flags and
/// records the choice.
pub fn resolve_option(
    state: &mut GameState,
    scenario_id: &str,
    option_id: &str,
    option: &ScenarioOption,
    dice: Option<&Dice>,
) -> Deltas {
    let multipliers = dice
        .map(|dice| dice_influence(dice).effect_multipliers)
        .unwrap_or_default();
    let balanced = ensure_tradeoffs(&option.immediate);
    let scale = effect_scale(state, option, &multipliers);
    let applied = scale_effects(&balanced, scale);

    state.apply_deltas(&applied);

    let turn = state.turn;
    if let Some(delayed) = &option.delayed {
        state.delayed.push(DelayedEffect {
            turn: turn.saturating_add(delayed.turns),
            effects: delayed.effects.clone(),
        });
    }
    for flag in &option.set_flags {
        state.set_flag(flag.as_str());
    }
    if let Some(followup) = &option.followup {
        state.followups.push(ScheduledFollowup {
            turn: turn.saturating_add(followup.turns),
            scenario_id: followup.scenario_id.clone(),
        });
    }
    for tag in &option.tags {
        state.set_flag(format!("chose_{}", tag));
    }
    state.push_recent_choice(ChoiceRecord {
        turn,
        scenario_id: scenario_id.to_string(),
        option_id: option_id.to_string(),
        hint: option.hint.clone(),
        tags: option.tags.clone(),
    });

    tracing::info!(
        target: "leadsim::effects",
        scenario = scenario_id,
        option = option_id,
        turn,
        scale,
        deltas = applied.len(),
        "option.resolved"
    );

    state.last_deltas = applied.clone();
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::{Archetype, CompanyTemplate};
    use crate::scenario::{DelayedSpec, FollowupSpec};

    fn deltas(entries: &[(StatKey, f64)]) -> Deltas {
        entries.iter().copied().collect()
    }

    fn calm_state() -> GameState {
        let mut state = GameState::new(Archetype::Operator, CompanyTemplate::Startup, 7);
        state.company.stakeholder = 100;
        state.company.financials = 100;
        state.hidden.crisis = 0;
        state
    }

    fn make_option(immediate: Deltas, tags: &[&str]) -> ScenarioOption {
        ScenarioOption {
            hint: "Do it".to_string(),
            immediate,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..ScenarioOption::default()
        }
    }

    #[test]
    fn mixed_deltas_are_left_alone() {
        let input = deltas(&[(StatKey::VELOCITY, 2.0), (StatKey::TRUST, -1.0)]);
        assert_eq!(ensure_tradeoffs(&input), input);
    }

    #[test]
    fn all_positive_gets_a_cost() {
        let input = deltas(&[(StatKey::VELOCITY, 4.0), (StatKey::EXECUTION, 2.0)]);
        let balanced = ensure_tradeoffs(&input);
        assert_eq!(balanced.get(&StatKey::MORALE), Some(&-2.0));
        assert_eq!(balanced.len(), 3);
    }

    #[test]
    fn counterweight_skips_stats_already_used() {
        let input = deltas(&[(StatKey::MORALE, 1.0), (StatKey::VELOCITY, 1.0)]);
        let balanced = ensure_tradeoffs(&input);
        assert_eq!(balanced.get(&StatKey::TRUST), Some(&-1.0));
    }

    #[test]
    fn all_negative_gets_a_gain() {
        let input = deltas(&[(StatKey::TRUST, -3.0), (StatKey::MORALE, -6.0)]);
        let balanced = ensure_tradeoffs(&input);
        assert_eq!(balanced.get(&StatKey::STAKEHOLDER), Some(&3.0));
    }

    #[test]
    fn empty_deltas_get_default_pair() {
        let balanced = ensure_tradeoffs(&Deltas::new());
        assert_eq!(balanced.get(&StatKey::VELOCITY), Some(&1.0));
        assert_eq!(balanced.get(&StatKey::MORALE), Some(&-1.0));
    }

    #[test]
    fn scaling_rounds_whole_points_and_keeps_fractions() {
        let input = deltas(&[
            (StatKey::VELOCITY, 2.0),
            (StatKey::TRUST, -1.0),
            (StatKey::BURN_RATE, 0.05),
            (StatKey::RUNWAY_MONTHS, 1.5),
        ]);
        let scaled = scale_effects(&input, 1.584);
        assert_eq!(scaled.get(&StatKey::VELOCITY), Some(&3.0));
        assert_eq!(scaled.get(&StatKey::TRUST), Some(&-2.0));
        let burn = scaled[&StatKey::BURN_RATE];
        assert!((burn - 0.0792).abs() < 1e-9);
        let runway = scaled[&StatKey::RUNWAY_MONTHS];
        assert!((runway - 2.376).abs() < 1e-9);
    }

    #[test]
    fn small_stat_deltas_commit_one_point() {
        let scaled = scale_effects(
            &deltas(&[(StatKey::VELOCITY, 0.3), (StatKey::TRUST, -0.3)]),
            1.0,
        );
        assert_eq!(scaled.get(&StatKey::VELOCITY), Some(&1.0));
        assert_eq!(scaled.get(&StatKey::TRUST), Some(&-1.0));
    }

    #[test]
    fn reported_deltas_match_committed_stats() {
        let mut state = calm_state();
        let before = state.clone();
        let option = make_option(
            deltas(&[(StatKey::VELOCITY, 0.3), (StatKey::TRUST, -0.3)]),
            &[],
        );
        let applied = resolve_option(&mut state, "s", "o", &option, None);
        for (key, delta) in &applied {
            assert_eq!(delta.fract(), 0.0, "{key:?} reported {delta}");
            assert_eq!(state.stat(*key) - before.stat(*key), *delta);
        }
    }

    #[test]
    fn huge_turn_offsets_saturate() {
        let mut state = calm_state();
        state.turn = 3;
        let option = ScenarioOption {
            delayed: Some(DelayedSpec {
                turns: u32::MAX,
                effects: deltas(&[(StatKey::MORALE, -3.0)]),
            }),
            followup: Some(FollowupSpec {
                turns: u32::MAX,
                scenario_id: "never".to_string(),
            }),
            ..make_option(
                deltas(&[(StatKey::VELOCITY, 2.0), (StatKey::MORALE, -1.0)]),
                &[],
            )
        };

        resolve_option(&mut state, "s", "o", &option, None);

        assert_eq!(state.delayed[0].turn, u32::MAX);
        assert_eq!(state.followups[0].turn, u32::MAX);
    }

    #[test]
    fn early_startup_scale_without_modifiers() {
        let state = calm_state();
        let option = make_option(deltas(&[(StatKey::VELOCITY, 2.0)]), &[]);
        let scale = effect_scale(&state, &option, &EffectMultipliers::default());
        assert!((scale - 1.2 * 1.1 * 1.2).abs() < 1e-9);
    }

    #[test]
    fn velocity_clamps_at_one_hundred() {
        let mut state = calm_state();
        state.company.velocity = 99;
        let option = make_option(
            deltas(&[(StatKey::VELOCITY, 2.0), (StatKey::TRUST, -1.0)]),
            &[],
        );
        let applied = resolve_option(&mut state, "s", "o", &option, None);
        assert_eq!(applied.get(&StatKey::VELOCITY), Some(&3.0));
        assert_eq!(state.company.velocity, 100);
        assert_eq!(state.leader.trust, 43);
    }

    #[test]
    fn archetype_and_dice_multipliers_compound() {
        let state = calm_state();
        let option = make_option(
            deltas(&[(StatKey::VELOCITY, 2.0), (StatKey::TRUST, -1.0)]),
            &["execution_focused", "quick_decision"],
        );
        let multipliers = EffectMultipliers {
            positive: Some(1.2),
            negative: Some(1.2),
        };
        let scale = effect_scale(&state, &option, &multipliers);
        let expected = 1.2 * 1.1 * 1.2 * 1.2 * 1.1 * 1.2 * 1.2;
        assert!((scale - expected).abs() < 1e-9);
    }

    #[test]
    fn side_effects_are_recorded() {
        let mut state = calm_state();
        state.turn = 4;
        let option = ScenarioOption {
            delayed: Some(DelayedSpec {
                turns: 2,
                effects: deltas(&[(StatKey::MORALE, -3.0)]),
            }),
            set_flags: vec!["shipped_early".to_string()],
            followup: Some(FollowupSpec {
                turns: 1,
                scenario_id: "postmortem".to_string(),
            }),
            ..make_option(
                deltas(&[(StatKey::VELOCITY, 2.0), (StatKey::MORALE, -1.0)]),
                &["quick_decision"],
            )
        };

        resolve_option(&mut state, "ship_it", "ship", &option, None);

        assert_eq!(state.delayed.len(), 1);
        assert_eq!(state.delayed[0].turn, 6);
        assert_eq!(state.followups[0].turn, 5);
        assert_eq!(state.followups[0].scenario_id, "postmortem");
        assert!(state.flag("shipped_early"));
        assert!(state.flag("chose_quick_decision"));
        assert_eq!(state.recent_choices[0].option_id, "ship");
        assert!(!state.last_deltas.is_empty());
    }

    #[test]
    fn resolved_options_always_trade_off() {
        let mut state = calm_state();
        let option = make_option(deltas(&[(StatKey::CULTURE, 5.0)]), &[]);
        let applied = resolve_option(&mut state, "s", "o", &option, None);
        assert!(applied.values().any(|v| *v > 0.0));
        assert!(applied.values().any(|v| *v < 0.0));
    }
}
