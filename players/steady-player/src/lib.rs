use leadsim_core::scenario::{Scenario, ScenarioOption};
use leadsim_core::state::GameState;
use leadsim_core::stats::{StatGroup, StatKey};
use leadsim_core::Player;

/// SteadyPlayer shores up whatever is weakest. Each option is scored by its
/// declared deltas, with gains on low stats and cuts to high risks counting
/// the most. Option order never matters; ties go to the smallest id.
pub struct SteadyPlayer;

/// How much one point on `key` is worth right now.
fn urgency(key: StatKey, state: &GameState) -> f64 {
    let value = state.stat(key);
    match key.group() {
        StatGroup::Economy => match key {
            StatKey::RUNWAY_MONTHS => 1.0,
            _ => 0.0,
        },
        _ if key.is_risk() => -(value / 100.0 + 0.5),
        _ => (100.0 - value) / 100.0 + 0.5,
    }
}

pub fn option_score(option: &ScenarioOption, state: &GameState) -> f64 {
    option
        .immediate
        .iter()
        .map(|(key, delta)| delta * urgency(*key, state))
        .sum()
}

impl Player for SteadyPlayer {
    fn name(&self) -> &'static str {
        "steady-player"
    }

    fn choose(&self, scenario: &Scenario, state: &GameState) -> String {
        let mut best: Option<(&String, f64)> = None;
        for (id, option) in &scenario.options {
            let score = option_score(option, state);
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((id, score)),
            }
        }
        best.map(|(id, _)| id.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use leadsim_core::scenario::Phase;
    use leadsim_core::stats::Deltas;

    fn option(entries: &[(StatKey, f64)]) -> ScenarioOption {
        ScenarioOption {
            immediate: entries.iter().copied().collect::<Deltas>(),
            ..ScenarioOption::default()
        }
    }

    fn scenario(options: Vec<(&str, ScenarioOption)>) -> Scenario {
        Scenario {
            phase: Phase::Mid,
            tags: Vec::new(),
            title: "Test".to_string(),
            text: String::new(),
            options: options
                .into_iter()
                .map(|(id, option)| (id.to_string(), option))
                .collect::<BTreeMap<_, _>>(),
            requires_flags: Vec::new(),
        }
    }

    #[test]
    fn props_up_the_weakest_stat() {
        let mut state = GameState::default();
        state.company.morale = 10;
        state.company.velocity = 90;
        let scenario = scenario(vec![
            ("a_speed", option(&[(StatKey::VELOCITY, 3.0), (StatKey::MORALE, -1.0)])),
            ("b_care", option(&[(StatKey::MORALE, 3.0), (StatKey::VELOCITY, -1.0)])),
        ]);
        assert_eq!(SteadyPlayer.choose(&scenario, &state), "b_care");

        state.company.morale = 90;
        state.company.velocity = 10;
        assert_eq!(SteadyPlayer.choose(&scenario, &state), "a_speed");
    }

    #[test]
    fn reducing_risk_counts_as_a_gain() {
        let mut state = GameState::default();
        state.company.tech_debt = 90;
        state.company.morale = 50;
        let scenario = scenario(vec![
            ("a_pay_down", option(&[(StatKey::TECH_DEBT, -3.0), (StatKey::MORALE, -1.0)])),
            ("b_pile_on", option(&[(StatKey::TECH_DEBT, 3.0), (StatKey::MORALE, 1.0)])),
        ]);
        assert_eq!(SteadyPlayer.choose(&scenario, &state), "a_pay_down");
    }

    #[test]
    fn ties_go_to_smallest_id() {
        let state = GameState::default();
        let same = option(&[(StatKey::TRUST, 1.0), (StatKey::VISION, -1.0)]);
        let scenario = scenario(vec![("zeta", same.clone()), ("alpha", same)]);
        assert_eq!(SteadyPlayer.choose(&scenario, &state), "alpha");
    }
}
