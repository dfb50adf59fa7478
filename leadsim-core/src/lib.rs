//! Leadership role-play engine.
//!
//! A run is a sequence of turns: roll the dice, draw a weighted scenario,
//! commit one of its options, then let the progression engine advance the
//! turn. [`session::Session`] drives that loop for interactive play;
//! [`simulate_run`] drives it with a [`Player`] policy.

pub mod config;
pub mod dice;
pub mod economy;
pub mod effects;
pub mod expr;
pub mod milestones;
pub mod outcome;
pub mod profiles;
pub mod progression;
pub mod provider;
pub mod rng;
pub mod scenario;
pub mod scoring;
pub mod selector;
pub mod session;
pub mod snapshot;
pub mod state;
pub mod stats;

use scenario::{Scenario, ScenarioSource};
use scoring::ScoreTracker;
use session::{Session, TurnError};
use state::{GameEnding, GameState};

/// Core trait that all autopilot players implement.
pub trait Player {
    fn name(&self) -> &'static str;
    /// Id of the option to commit. Must be a key of `scenario.options`.
    fn choose(&self, scenario: &Scenario, state: &GameState) -> String;
}

/// One committed turn of an autopilot run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnSummary {
    pub turn: u32,
    pub scenario_id: String,
    pub option_id: String,
    pub source: ScenarioSource,
}

/// Aggregated results for an autopilot run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub player: &'static str,
    pub turns: Vec<TurnSummary>,
    pub scores: ScoreTracker,
    pub ending: Option<GameEnding>,
    pub final_state: GameState,
}

impl RunReport {
    pub fn rating(&self) -> &'static str {
        self.scores.rating()
    }
}

/// Play turns with `player` until the game ends or `max_turns` have been
/// committed. The session must already be in a running game.
pub fn simulate_run(
    session: &mut Session,
    player: &dyn Player,
    max_turns: u32,
) -> Result<RunReport, TurnError> {
    let mut turns = Vec::new();
    let mut scores = ScoreTracker::new();

    for _ in 0..max_turns {
        if !session.state().is_playing() {
            break;
        }
        let selected = session.draw_scenario()?;
        let mut option_id = player.choose(&selected.scenario, session.state());
        if selected.scenario.option(&option_id).is_none() {
            let Some(first) = selected.scenario.options.keys().next() else {
                break;
            };
            tracing::warn!(
                target: "leadsim::session",
                player = player.name(),
                scenario = %selected.id,
                option = %option_id,
                "player.invalid_option"
            );
            option_id = first.clone();
        }

        let report = session.choose(&option_id)?;
        if let Some(review) = &report.progression.quarterly {
            scores.add(review.turn, review.score, &review.messages.join("; "));
        }
        turns.push(TurnSummary {
            turn: report.turn,
            scenario_id: report.scenario_id,
            option_id: report.option_id,
            source: report.source,
        });
    }

    Ok(RunReport {
        player: player.name(),
        turns,
        scores,
        ending: session.state().ending.clone(),
        final_state: session.state().clone(),
    })
}
