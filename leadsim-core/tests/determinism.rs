use std::collections::BTreeMap;
use std::sync::Arc;

use leadsim_core::config::{builtin_deck, builtin_milestones};
use leadsim_core::profiles::{Archetype, CompanyTemplate};
use leadsim_core::provider::MockScenarioProvider;
use leadsim_core::rng::Lcg;
use leadsim_core::scenario::{Scenario, ScenarioDeck};
use leadsim_core::session::Session;
use leadsim_core::snapshot::SaveStore;
use leadsim_core::state::GameState;
use leadsim_core::{simulate_run, Player};

/// Picks the option whose id sorts last, so runs differ from a first-option policy.
struct LastOption;

impl Player for LastOption {
    fn name(&self) -> &'static str {
        "last-option"
    }

    fn choose(&self, scenario: &Scenario, _state: &GameState) -> String {
        scenario.options.keys().last().cloned().unwrap_or_default()
    }
}

fn started(seed: u32) -> Session {
    let mut session = Session::new(builtin_deck(), builtin_milestones());
    session.new_run(Archetype::Operator, CompanyTemplate::Startup, seed);
    session
}

#[test]
fn same_seed_same_stream() {
    let mut a = Lcg::new(42);
    let mut b = Lcg::new(42);
    for _ in 0..1_000 {
        assert_eq!(a.next_uint32(), b.next_uint32());
    }
}

#[test]
fn same_seed_same_first_scenario() {
    let mut first = started(42);
    let mut second = started(42);

    assert_eq!(first.roll_dice().unwrap(), second.roll_dice().unwrap());
    let a = first.draw_scenario().unwrap();
    let b = second.draw_scenario().unwrap();
    assert_eq!(a.id, b.id);
    assert_eq!(a.reasons, b.reasons);
    assert_eq!(first.state().rng, second.state().rng);
}

#[test]
fn same_seed_same_run() {
    let mut first = started(2024);
    let mut second = started(2024);
    let a = simulate_run(&mut first, &LastOption, 20).unwrap();
    let b = simulate_run(&mut second, &LastOption, 20).unwrap();

    assert_eq!(a.turns, b.turns);
    assert_eq!(a.ending, b.ending);
    assert_eq!(a.final_state, b.final_state);
}

#[test]
fn resume_continues_the_exact_stream() {
    let dir = tempfile::tempdir().unwrap();
    let store = SaveStore::new(dir.path().join("save.json"));

    let mut original = started(99);
    simulate_run(&mut original, &LastOption, 3).unwrap();
    original.draw_scenario().unwrap();
    original.save(&store).unwrap();
    let rest = simulate_run(&mut original, &LastOption, 4).unwrap();

    let mut resumed = Session::new(builtin_deck(), builtin_milestones());
    resumed.resume(&store).unwrap();
    let replay = simulate_run(&mut resumed, &LastOption, 4).unwrap();

    assert_eq!(rest.turns, replay.turns);
    assert_eq!(rest.final_state, replay.final_state);
}

#[test]
fn different_seeds_diverge_somewhere() {
    let a = simulate_run(&mut started(1), &LastOption, 12).unwrap();
    let b = simulate_run(&mut started(2), &LastOption, 12).unwrap();
    assert_ne!(a.final_state.rng, b.final_state.rng);
}

#[test]
fn provider_runs_without_prefetch_are_reproducible() {
    let run = |seed| {
        let mut session = Session::new(ScenarioDeck::new(BTreeMap::new()), builtin_milestones())
            .with_provider(Arc::new(MockScenarioProvider::new()), 0);
        session.new_run(Archetype::Visionary, CompanyTemplate::Scaleup, seed);
        simulate_run(&mut session, &LastOption, 8).unwrap()
    };

    let a = run(31);
    let b = run(31);
    assert_eq!(a.turns, b.turns);
    assert_eq!(a.final_state, b.final_state);
}
