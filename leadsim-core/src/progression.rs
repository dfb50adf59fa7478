//! Turn advancement: delayed effects, reviews, economy, promotion, endings.

use serde::{Deserialize, Serialize};

use crate::economy::{economy_tick, EconomyTick};
use crate::milestones::{MilestoneConfig, QuarterlyReview};
use crate::profiles::{nudge_deltas, CompanyTemplate};
use crate::state::{GameEnding, GamePhase, GameState};
use crate::stats::Deltas;

/// Composite health needed to move up a company tier.
pub const PROMOTION_THRESHOLD: f64 = 68.0;

pub const OUT_OF_CASH_MESSAGE: &str =
    "The company has run out of cash. Payroll cannot be met and the doors close.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub from: CompanyTemplate,
    pub to: CompanyTemplate,
    pub nudge: Deltas,
}

/// Everything that happened while advancing one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub delayed_applied: Vec<Deltas>,
    pub quarterly: Option<QuarterlyReview>,
    pub economy: EconomyTick,
    pub promotion: Option<Promotion>,
    pub ending: Option<GameEnding>,
}

/// Apply and drop every delayed effect due on or before the current turn.
pub fn process_delayed(state: &mut GameState) -> Vec<Deltas> {
    let now = state.turn;
    let (due, pending): (Vec<_>, Vec<_>) = state
        .delayed
        .drain(..)
        .partition(|delayed| delayed.turn <= now);
    state.delayed = pending;

    due.into_iter()
        .map(|delayed| {
            state.apply_deltas(&delayed.effects);
            delayed.effects
        })
        .collect()
}

/// 0-100 progress towards the next company tier.
pub fn promotion_score(state: &GameState) -> f64 {
    let company = &state.company;
    let composite = 0.35 * f64::from(company.stakeholder)
        + 0.35 * f64::from(company.financials)
        + 0.2 * f64::from(company.velocity)
        + 0.1 * f64::from(company.morale)
        - 0.15 * f64::from(company.tech_debt);
    composite.clamp(0.0, 100.0)
}

/// Move the company up one tier if it is healthy enough.
pub fn check_promotion(state: &mut GameState) -> Option<Promotion> {
    let score = promotion_score(state);
    state.promotion_progress = score;

    let tier = state.template.promotion()?;
    if score < PROMOTION_THRESHOLD {
        return None;
    }

    let nudge = nudge_deltas(tier.nudge);
    let from = state.template;
    state.template = tier.to;
    state.apply_deltas(&nudge);

    tracing::info!(
        target: "leadsim::progression",
        turn = state.turn,
        from = from.as_str(),
        to = tier.to.as_str(),
        score,
        "template.promoted"
    );

    Some(Promotion {
        from,
        to: tier.to,
        nudge,
    })
}

/// Mark the game as ended. Re-ending an ended game changes nothing.
pub fn end_game(state: &mut GameState, ending: GameEnding) -> Option<GameEnding> {
    if state.ending.is_some() {
        return None;
    }
    tracing::info!(
        target: "leadsim::progression",
        turn = state.turn,
        message = ending.message(),
        "game.ended"
    );
    state.game_phase = GamePhase::Ended;
    state.ending = Some(ending.clone());
    Some(ending)
}

/// Run every end-of-turn step, in order, after a choice has been committed.
pub fn advance_turn(state: &mut GameState, milestones: &MilestoneConfig) -> TurnOutcome {
    let delayed_applied = process_delayed(state);

    state.turn += 1;

    let quarterly = if milestones.quarterly.is_due(state.turn) {
        Some(milestones.run_quarterly_review(state))
    } else {
        None
    };

    let economy = economy_tick(state);
    let mut ending = None;
    if economy.out_of_cash {
        ending = end_game(
            state,
            GameEnding::OutOfCash {
                turn: state.turn,
                message: OUT_OF_CASH_MESSAGE.to_string(),
            },
        );
    }

    let promotion = if state.ending.is_none() {
        check_promotion(state)
    } else {
        None
    };

    if state.ending.is_none() {
        if let Some(rule) = milestones.check_endings(state) {
            let annual = GameEnding::Annual {
                turn: state.turn,
                message: rule.message.clone(),
            };
            ending = end_game(state, annual);
        }
    }

    TurnOutcome {
        delayed_applied,
        quarterly,
        economy,
        promotion,
        ending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::builtin_milestones;
    use crate::state::DelayedEffect;
    use crate::stats::StatKey;

    fn healthy_state() -> GameState {
        let mut state = GameState::default();
        state.economy.runway_months = 30.0;
        state
    }

    #[test]
    fn delayed_effects_fire_once_when_due() {
        let mut state = healthy_state();
        state.turn = 3;
        state.delayed = vec![
            DelayedEffect {
                turn: 3,
                effects: [(StatKey::MORALE, -5.0)].into_iter().collect(),
            },
            DelayedEffect {
                turn: 5,
                effects: [(StatKey::MORALE, 10.0)].into_iter().collect(),
            },
        ];

        let applied = process_delayed(&mut state);
        assert_eq!(applied.len(), 1);
        assert_eq!(state.company.morale, 55);
        assert_eq!(state.delayed.len(), 1);
        assert_eq!(state.delayed[0].turn, 5);

        assert!(process_delayed(&mut state).is_empty());
    }

    #[test]
    fn quarterly_review_runs_on_cadence() {
        let milestones = builtin_milestones();
        let mut state = healthy_state();
        state.turn = 1;
        let outcome = advance_turn(&mut state, &milestones);
        assert_eq!(state.turn, 2);
        assert!(outcome.quarterly.is_none());

        let outcome = advance_turn(&mut state, &milestones);
        assert_eq!(state.turn, 3);
        assert!(outcome.quarterly.is_some());
        assert_eq!(state.quarterly_scores.len(), 1);
    }

    #[test]
    fn promotion_moves_one_tier_with_nudge() {
        let mut state = healthy_state();
        state.company.stakeholder = 90;
        state.company.financials = 90;
        state.company.velocity = 80;
        state.company.morale = 80;
        state.company.tech_debt = 20;

        let promotion = check_promotion(&mut state).unwrap();
        assert_eq!(promotion.from, CompanyTemplate::Startup);
        assert_eq!(state.template, CompanyTemplate::Scaleup);
        assert_eq!(state.company.stakeholder, 95);
        assert_eq!(state.company.tech_debt, 25);
        assert!(state.promotion_progress >= PROMOTION_THRESHOLD);
    }

    #[test]
    fn terminal_tier_is_never_promoted() {
        let mut state = healthy_state();
        state.template = CompanyTemplate::Bigco;
        state.company.stakeholder = 100;
        state.company.financials = 100;
        assert!(check_promotion(&mut state).is_none());
        assert_eq!(state.template, CompanyTemplate::Bigco);
    }

    #[test]
    fn weak_company_is_not_promoted() {
        let mut state = healthy_state();
        assert!(check_promotion(&mut state).is_none());
        assert!(state.promotion_progress < PROMOTION_THRESHOLD);
    }

    #[test]
    fn running_out_of_cash_ends_the_game() {
        let milestones = builtin_milestones();
        let mut state = GameState::default();
        state.game_phase = GamePhase::Playing;
        state.economy.runway_months = 0.2;
        state.economy.burn_rate = 2.0;

        let outcome = advance_turn(&mut state, &milestones);
        assert!(matches!(outcome.ending, Some(GameEnding::OutOfCash { .. })));
        assert_eq!(state.game_phase, GamePhase::Ended);
        assert!(outcome.promotion.is_none());
    }

    #[test]
    fn ending_is_idempotent() {
        let mut state = GameState::default();
        let first = end_game(
            &mut state,
            GameEnding::Annual {
                turn: 12,
                message: "done".to_string(),
            },
        );
        assert!(first.is_some());
        let second = end_game(
            &mut state,
            GameEnding::OutOfCash {
                turn: 12,
                message: OUT_OF_CASH_MESSAGE.to_string(),
            },
        );
        assert!(second.is_none());
        assert_eq!(state.ending.as_ref().unwrap().message(), "done");
    }

    #[test]
    fn annual_turn_ends_a_surviving_run() {
        let milestones = builtin_milestones();
        let mut state = healthy_state();
        state.game_phase = GamePhase::Playing;
        state.turn = milestones.annual.turn - 1;
        let outcome = advance_turn(&mut state, &milestones);
        assert!(matches!(outcome.ending, Some(GameEnding::Annual { .. })));
        assert_eq!(state.game_phase, GamePhase::Ended);
    }
}
