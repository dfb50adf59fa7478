use leadsim_core::scenario::Scenario;
use leadsim_core::state::GameState;
use leadsim_core::Player;

/// CyclePlayer rotates through a scenario's options by turn number, so every
/// option position gets played over a run.
pub struct CyclePlayer;

impl Player for CyclePlayer {
    fn name(&self) -> &'static str {
        "cycle-player"
    }

    fn choose(&self, scenario: &Scenario, state: &GameState) -> String {
        let num = scenario.options.len();
        if num == 0 {
            return String::new();
        }
        let index = (state.turn as usize).saturating_sub(1) % num;
        scenario
            .options
            .keys()
            .nth(index)
            .cloned()
            .unwrap_or_default()
    }
}
