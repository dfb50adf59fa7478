//! Game controller: one run from setup to ending.

use std::sync::Arc;

use thiserror::Error;

use crate::dice::Dice;
use crate::effects::resolve_option;
use crate::milestones::MilestoneConfig;
use crate::outcome::{describe_outcome, Outcome};
use crate::profiles::{Archetype, CompanyTemplate};
use crate::progression::{advance_turn, TurnOutcome};
use crate::provider::{
    fallback_scenario, ProviderFallback, ScenarioContext, ScenarioProvider, ScenarioQueue,
};
use crate::scenario::{Phase, ScenarioDeck, ScenarioSource, SelectedScenario};
use crate::selector::{select_scenario, NoFallback, SelectionError};
use crate::snapshot::{SaveStore, SnapshotError};
use crate::state::{GamePhase, GameState};
use crate::stats::Deltas;

pub const SYNTHESIZED_REASON: &str = "Nothing else was available; using a default scenario";

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("the game has ended")]
    GameOver,
    #[error("no game in progress; start a new run first")]
    NotPlaying,
    #[error("no scenario has been drawn for turn {turn}")]
    NoScenario { turn: u32 },
    #[error("scenario {scenario_id} has no option {option_id:?}")]
    UnknownOption {
        scenario_id: String,
        option_id: String,
    },
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Everything that happened when a choice was committed.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    /// The turn the choice was made on.
    pub turn: u32,
    pub scenario_id: String,
    pub option_id: String,
    pub source: ScenarioSource,
    pub applied: Deltas,
    pub outcome: Outcome,
    pub progression: TurnOutcome,
}

pub struct Session {
    state: GameState,
    deck: ScenarioDeck,
    milestones: MilestoneConfig,
    provider: Option<Arc<dyn ScenarioProvider>>,
    queue: Option<ScenarioQueue>,
}

impl Session {
    pub fn new(deck: ScenarioDeck, milestones: MilestoneConfig) -> Self {
        Self {
            state: GameState::default(),
            deck,
            milestones,
            provider: None,
            queue: None,
        }
    }

    /// Use `provider` when the deck has nothing to offer. A non-zero
    /// `prefetch` keeps that many provider scenarios buffered.
    pub fn with_provider(mut self, provider: Arc<dyn ScenarioProvider>, prefetch: usize) -> Self {
        self.queue = (prefetch > 0).then(|| ScenarioQueue::new(Arc::clone(&provider), prefetch));
        self.provider = Some(provider);
        self
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn deck(&self) -> &ScenarioDeck {
        &self.deck
    }

    pub fn milestones(&self) -> &MilestoneConfig {
        &self.milestones
    }

    pub fn is_over(&self) -> bool {
        self.state.game_phase == GamePhase::Ended
    }

    pub fn new_run(&mut self, archetype: Archetype, template: CompanyTemplate, seed: u32) {
        self.state = GameState::new(archetype, template, seed);
        self.state.game_phase = GamePhase::Playing;
        tracing::info!(
            target: "leadsim::session",
            archetype = archetype.as_str(),
            template = template.as_str(),
            seed,
            "run.started"
        );

        if let Some(queue) = self.queue.as_mut() {
            queue.reset();
            if self.deck.is_empty() {
                queue.refill(ScenarioContext::from_state(&self.state, None));
            }
        }
    }

    /// Back to setup with the run's starting profiles and seed.
    pub fn reset(&mut self) {
        self.state = GameState::new(
            self.state.archetype,
            self.state.starting_template(),
            self.state.rng.seed,
        );
        if let Some(queue) = self.queue.as_mut() {
            queue.reset();
        }
    }

    fn ensure_playing(&self) -> Result<(), TurnError> {
        match self.state.game_phase {
            GamePhase::Playing => Ok(()),
            GamePhase::Ended => Err(TurnError::GameOver),
            GamePhase::Setup => Err(TurnError::NotPlaying),
        }
    }

    /// Roll this turn's dice. Rolling again in the same turn returns the
    /// same dice.
    pub fn roll_dice(&mut self) -> Result<Dice, TurnError> {
        self.ensure_playing()?;
        if let Some(dice) = self.state.current_dice {
            return Ok(dice);
        }
        let dice = Dice::roll(&mut self.state.rng);
        self.state.current_dice = Some(dice);
        Ok(dice)
    }

    /// The scenario for this turn, drawing one if none is showing yet.
    pub fn draw_scenario(&mut self) -> Result<SelectedScenario, TurnError> {
        self.ensure_playing()?;
        if let Some(current) = &self.state.current_scenario {
            return Ok(current.clone());
        }
        let dice = self.roll_dice()?;

        let selected = {
            let Session {
                state,
                deck,
                provider,
                queue,
                ..
            } = self;
            let result = match provider.as_deref() {
                Some(provider) => {
                    let mut fallback = ProviderFallback::new(provider, queue.as_mut());
                    select_scenario(state, deck, &dice, &mut fallback)
                }
                None => select_scenario(state, deck, &dice, &mut NoFallback),
            };
            match result {
                Ok(selected) => selected,
                Err(SelectionError::NoScenarioAvailable { turn }) => {
                    synthesize(state, deck, turn)
                }
            }
        };

        self.state.current_scenario = Some(selected.clone());
        Ok(selected)
    }

    /// Commit `option_id` for the current scenario and advance the turn.
    pub fn choose(&mut self, option_id: &str) -> Result<TurnReport, TurnError> {
        self.ensure_playing()?;
        let selected = self
            .state
            .current_scenario
            .clone()
            .ok_or(TurnError::NoScenario {
                turn: self.state.turn,
            })?;
        let option = selected
            .scenario
            .option(option_id)
            .ok_or_else(|| TurnError::UnknownOption {
                scenario_id: selected.id.clone(),
                option_id: option_id.to_string(),
            })?;

        let turn = self.state.turn;
        let dice = self.state.current_dice;
        let applied = resolve_option(&mut self.state, &selected.id, option_id, option, dice.as_ref());
        let outcome = describe_outcome(option, &applied);
        let progression = advance_turn(&mut self.state, &self.milestones);

        self.state.current_scenario = None;
        self.state.current_dice = None;

        Ok(TurnReport {
            turn,
            scenario_id: selected.id,
            option_id: option_id.to_string(),
            source: selected.source,
            applied,
            outcome,
            progression,
        })
    }

    pub fn save(&self, store: &SaveStore) -> Result<(), TurnError> {
        store.save(&self.state)?;
        Ok(())
    }

    /// Replace the running game with the saved one. The random stream picks
    /// up exactly where it was when saved.
    pub fn resume(&mut self, store: &SaveStore) -> Result<(), TurnError> {
        let state = store.load()?;
        if let Some(current) = &state.current_scenario {
            self.deck.remember_generated(&current.id, &current.scenario);
        }
        self.state = state;
        if let Some(queue) = self.queue.as_mut() {
            queue.reset();
        }
        tracing::info!(
            target: "leadsim::session",
            turn = self.state.turn,
            phase = ?self.state.game_phase,
            "run.resumed"
        );
        Ok(())
    }
}

fn synthesize(state: &mut GameState, deck: &mut ScenarioDeck, turn: u32) -> SelectedScenario {
    let generated = fallback_scenario(Phase::for_scaling(turn), state.template);
    tracing::warn!(
        target: "leadsim::session",
        scenario = %generated.id,
        turn,
        "scenario.synthesized"
    );
    deck.remember_generated(&generated.id, &generated.scenario);
    state.seen_scenario_ids.insert(generated.id.clone());
    state.push_recent_scenario(&generated.id);
    SelectedScenario {
        id: generated.id,
        scenario: generated.scenario,
        reasons: vec![SYNTHESIZED_REASON.to_string()],
        source: ScenarioSource::Fallback,
    }
}
