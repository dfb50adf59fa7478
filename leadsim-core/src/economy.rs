//! Per-turn economy tick: user growth, revenue, runway and financials.

use crate::state::GameState;
use crate::stats::clamp_stat;

/// Largest MAU change per tick, as a share of current MAU (+1).
pub const MAX_GROWTH_SHARE: f64 = 0.1;

/// What one tick changed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EconomyTick {
    pub mau_delta: f64,
    pub revenue_index: f64,
    pub runway_months: f64,
    pub out_of_cash: bool,
}

/// Growth rate in percent for the current state. All three terms are in
/// percentage points, so a crisis of 20 costs one point of growth.
pub fn growth_percent(state: &GameState) -> f64 {
    let velocity_term = (f64::from(state.company.velocity) - 50.0) / 50.0;
    let opportunity_term = state
        .current_dice
        .map(|dice| (f64::from(dice.opportunity) - 3.0) / 6.0)
        .unwrap_or(0.0);
    let crisis_term = -f64::from(state.hidden.crisis) / 20.0;
    3.0 * velocity_term + 2.0 * opportunity_term + crisis_term
}

pub fn economy_tick(state: &mut GameState) -> EconomyTick {
    let economy = state.economy;
    let limit = MAX_GROWTH_SHARE * (economy.mau + 1.0);
    let mau_delta = (economy.mau * growth_percent(state) / 100.0).clamp(-limit, limit);
    let mau = (economy.mau + mau_delta).max(0.0);

    let baseline = state.template.profile().baseline_mau;
    let normalized_mau = (mau / (2.0 * baseline)).clamp(0.0, 1.0);
    let revenue_index =
        0.7 * normalized_mau + 0.3 * (f64::from(state.company.stakeholder) / 100.0);
    let runway_months = (economy.runway_months + revenue_index - economy.burn_rate).max(0.0);

    state.economy.mau = mau;
    state.economy.revenue_index = revenue_index;
    state.economy.runway_months = runway_months;
    state.company.financials = clamp_stat((runway_months * 10.0).round() as i32);

    let out_of_cash = runway_months <= 0.0;
    tracing::debug!(
        target: "leadsim::economy",
        turn = state.turn,
        mau,
        mau_delta,
        revenue_index,
        runway_months,
        "economy.tick"
    );
    if out_of_cash {
        tracing::warn!(target: "leadsim::economy", turn = state.turn, "economy.out_of_cash");
    }

    EconomyTick {
        mau_delta,
        revenue_index,
        runway_months,
        out_of_cash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::Dice;

    #[test]
    fn healthy_velocity_grows_users() {
        let mut state = GameState::default();
        state.company.velocity = 100;
        state.hidden.crisis = 0;
        let before = state.economy.mau;
        let tick = economy_tick(&mut state);
        assert!(tick.mau_delta > 0.0);
        assert!((state.economy.mau - before * 1.03).abs() < 1e-6);
    }

    #[test]
    fn opportunity_die_feeds_growth() {
        let mut state = GameState::default();
        state.company.velocity = 50;
        state.hidden.crisis = 0;
        state.current_dice = Some(Dice {
            internal: 3,
            external: 3,
            opportunity: 6,
            luck: 3,
        });
        assert!((growth_percent(&state) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn growth_terms_are_percentage_points() {
        let mut state = GameState::default();
        state.economy.mau = 1_000.0;
        state.company.velocity = 75;
        state.hidden.crisis = 10;
        state.current_dice = Some(Dice {
            internal: 3,
            external: 3,
            opportunity: 6,
            luck: 3,
        });
        // 3 * 0.5 + 2 * 0.5 - 10 / 20
        assert!((growth_percent(&state) - 2.0).abs() < 1e-9);
        let tick = economy_tick(&mut state);
        assert!((tick.mau_delta - 20.0).abs() < 1e-9);
        assert!((state.economy.mau - 1_020.0).abs() < 1e-9);
    }

    #[test]
    fn growth_is_capped_per_tick() {
        let mut state = GameState::default();
        state.hidden.crisis = 100;
        state.company.velocity = 0;
        let before = state.economy.mau;
        let tick = economy_tick(&mut state);
        assert!(tick.mau_delta >= -0.1 * (before + 1.0) - 1e-9);
    }

    #[test]
    fn economy_never_goes_negative() {
        let mut state = GameState::default();
        state.company.velocity = 0;
        state.company.stakeholder = 0;
        state.hidden.crisis = 100;
        state.economy.burn_rate = 5.0;
        for _ in 0..200 {
            economy_tick(&mut state);
            assert!(state.economy.mau >= 0.0);
            assert!(state.economy.runway_months >= 0.0);
        }
    }

    #[test]
    fn runway_drives_financials_and_cash_out() {
        let mut state = GameState::default();
        state.economy.runway_months = 1.0;
        state.economy.burn_rate = 3.0;
        let tick = economy_tick(&mut state);
        assert!(tick.out_of_cash);
        assert_eq!(state.economy.runway_months, 0.0);
        assert_eq!(state.company.financials, 0);
    }

    #[test]
    fn revenue_blends_users_and_stakeholders() {
        let mut state = GameState::default();
        state.economy.mau = 2_000.0;
        state.company.stakeholder = 100;
        state.company.velocity = 50;
        state.hidden.crisis = 0;
        let tick = economy_tick(&mut state);
        assert!((tick.revenue_index - 1.0).abs() < 1e-9);
    }
}
