use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use cycle_player::CyclePlayer;
use leadsim_core::config::{self, DEFAULT_SAVE_PATH, PROVIDER_URL_ENV, SAVE_PATH_ENV};
use leadsim_core::dice::{dice_influence, OptionBadge};
use leadsim_core::profiles::{Archetype, CompanyTemplate};
use leadsim_core::provider::{
    HttpScenarioProvider, MockScenarioProvider, ScenarioProvider, DEFAULT_TARGET,
};
use leadsim_core::session::{Session, TurnReport};
use leadsim_core::snapshot::{SaveStore, SnapshotError};
use leadsim_core::state::GameState;
use leadsim_core::{simulate_run, Player, RunReport};
use serde::Serialize;
use steady_player::SteadyPlayer;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Leadership role-play simulator", long_about = None)]
struct Cli {
    /// Scenario deck JSON (overrides LEADSIM_DECK_PATH).
    #[arg(long, global = true)]
    deck: Option<PathBuf>,
    /// Milestone and ending config JSON (overrides LEADSIM_MILESTONES_PATH).
    #[arg(long, global = true)]
    milestones: Option<PathBuf>,
    /// Where scenarios come from when the deck runs dry.
    #[arg(long, value_enum, global = true)]
    provider: Option<ProviderKind>,
    /// Base URL of the scenario service (overrides LEADSIM_PROVIDER_URL).
    #[arg(long, global = true)]
    provider_url: Option<String>,
    /// Save file (overrides LEADSIM_SAVE_PATH).
    #[arg(long, global = true)]
    save: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play interactively, saving after every turn.
    Play {
        #[command(flatten)]
        run: RunArgs,
        /// Continue the saved game instead of starting a new one.
        #[arg(long)]
        resume: bool,
    },
    /// Let an autopilot player run a whole game.
    Auto {
        #[command(flatten)]
        run: RunArgs,
        #[arg(long, value_enum, default_value_t = PlayerKind::Steady)]
        player: PlayerKind,
        #[arg(long, default_value_t = 50)]
        turns: u32,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    #[arg(long, default_value = "operator")]
    archetype: Archetype,
    #[arg(long, default_value = "startup")]
    template: CompanyTemplate,
    /// RNG seed; random when omitted.
    #[arg(long)]
    seed: Option<u32>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProviderKind {
    Off,
    Mock,
    Http,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PlayerKind {
    Steady,
    Cycle,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut session = build_session(&cli)?;
    let store = SaveStore::new(
        cli.save
            .clone()
            .or_else(|| config::env_path(SAVE_PATH_ENV))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SAVE_PATH)),
    );

    match cli.command {
        Command::Play { run, resume } => play(&mut session, &store, &run, resume),
        Command::Auto {
            run,
            player,
            turns,
            json,
        } => autopilot(&mut session, &run, player, turns, json),
    }
}

fn build_session(cli: &Cli) -> Result<Session> {
    let deck = config::load_deck(cli.deck.as_deref());
    let milestones = config::load_milestones(cli.milestones.as_deref());
    let session = Session::new(deck, milestones);

    let url = cli
        .provider_url
        .clone()
        .or_else(|| std::env::var(PROVIDER_URL_ENV).ok())
        .filter(|url| !url.trim().is_empty());
    let kind = match (cli.provider, &url) {
        (Some(kind), _) => kind,
        (None, Some(_)) => ProviderKind::Http,
        (None, None) => ProviderKind::Off,
    };

    let provider: Arc<dyn ScenarioProvider> = match kind {
        ProviderKind::Off => return Ok(session),
        ProviderKind::Mock => Arc::new(MockScenarioProvider::new()),
        ProviderKind::Http => {
            let url = url.ok_or_else(|| {
                anyhow!("--provider http needs --provider-url or {PROVIDER_URL_ENV}")
            })?;
            let http = HttpScenarioProvider::new(&url)
                .with_context(|| format!("invalid provider url {url:?}"))?;
            info!(target: "leadsim::cli", address = %http.address(), "provider.configured");
            Arc::new(http)
        }
    };
    Ok(session.with_provider(provider, DEFAULT_TARGET))
}

fn seed_for(run: &RunArgs) -> u32 {
    run.seed.unwrap_or_else(rand::random::<u32>)
}

fn play(session: &mut Session, store: &SaveStore, run: &RunArgs, resume: bool) -> Result<()> {
    if resume {
        match session.resume(store) {
            Ok(()) => println!("Resumed turn {}.", session.state().turn),
            Err(err) => {
                if !matches!(
                    err,
                    leadsim_core::session::TurnError::Snapshot(SnapshotError::NotFound { .. })
                ) {
                    return Err(err).context("failed to resume saved game");
                }
                println!("No saved game found; starting a new run.");
            }
        }
    }
    if !session.state().is_playing() {
        let seed = seed_for(run);
        session.new_run(run.archetype, run.template, seed);
        println!(
            "New run: {} at a {} (seed {}).",
            run.archetype, run.template, seed
        );
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    while session.state().is_playing() {
        let dice = session.roll_dice()?;
        let selected = session.draw_scenario()?;
        print_status(session.state());
        println!(
            "\nDice: internal {} | external {} | opportunity {} | luck {}",
            dice.internal, dice.external, dice.opportunity, dice.luck
        );
        println!("\n== {} ==", display_title(&selected.scenario.title, &selected.id));
        if !selected.scenario.text.is_empty() {
            println!("{}", selected.scenario.text);
        }
        for reason in &selected.reasons {
            println!("  ({reason})");
        }

        let influence = dice_influence(&dice);
        let ids: Vec<&String> = selected.scenario.options.keys().collect();
        for (n, (id, option)) in selected.scenario.options.iter().enumerate() {
            let badge = option
                .tags
                .iter()
                .filter_map(|tag| influence.option_filters.get(tag))
                .fold(None, |best, badge| match (best, badge) {
                    (Some(OptionBadge::Preferred), _) | (_, OptionBadge::Preferred) => {
                        Some(OptionBadge::Preferred)
                    }
                    _ => Some(OptionBadge::Available),
                });
            let marker = match badge {
                Some(OptionBadge::Preferred) => " [dice favour]",
                Some(OptionBadge::Available) => " [dice allow]",
                None => "",
            };
            println!("  {}) {} ({}){}", n + 1, option.hint, id, marker);
            if !option.description.is_empty() {
                println!("     {}", option.description);
            }
        }

        print!("Choose 1-{} (q to save and quit): ", ids.len());
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let input = line.trim();
        if input.eq_ignore_ascii_case("q") {
            break;
        }
        let option_id = match input.parse::<usize>() {
            Ok(n) if (1..=ids.len()).contains(&n) => ids[n - 1].clone(),
            _ => input.to_string(),
        };

        match session.choose(&option_id) {
            Ok(report) => {
                print_report(&report);
                session
                    .save(store)
                    .with_context(|| format!("failed to save to {}", store.path().display()))?;
            }
            Err(err) => println!("{err}"),
        }
    }

    session
        .save(store)
        .with_context(|| format!("failed to save to {}", store.path().display()))?;
    if let Some(ending) = &session.state().ending {
        println!("\n*** {} ***", ending.message());
    } else {
        println!("Saved to {}.", store.path().display());
    }
    Ok(())
}

fn display_title<'a>(title: &'a str, id: &'a str) -> &'a str {
    if title.is_empty() {
        id
    } else {
        title
    }
}

fn print_status(state: &GameState) {
    let l = &state.leader;
    let c = &state.company;
    println!(
        "\nTurn {} | {} at {} | pressure {:.0}",
        state.turn,
        state.archetype,
        state.template,
        state.pressure()
    );
    println!(
        "Leader  trust {} execution {} vision {} culture {}",
        l.trust, l.execution, l.vision, l.culture
    );
    println!(
        "Company morale {} velocity {} tech debt {} stakeholder {} financials {}",
        c.morale, c.velocity, c.tech_debt, c.stakeholder, c.financials
    );
    println!(
        "Economy runway {:.1} months | MAU {:.0} | revenue index {:.2}",
        state.economy.runway_months, state.economy.mau, state.economy.revenue_index
    );
}

fn print_report(report: &TurnReport) {
    println!("\n{}", report.outcome.summary);
    for change in &report.outcome.changes {
        println!("  - {change}");
    }
    for delayed in &report.progression.delayed_applied {
        println!("  Earlier decisions caught up with you ({} changes).", delayed.len());
    }
    if let Some(review) = &report.progression.quarterly {
        println!("Quarterly review: {:.1}", review.score);
        for message in &review.messages {
            println!("  {message}");
        }
    }
    if let Some(promotion) = &report.progression.promotion {
        println!("The company has grown from {} to {}!", promotion.from, promotion.to);
    }
}

#[derive(Serialize)]
struct ReportJson<'a> {
    player: &'a str,
    seed: u32,
    turns_played: usize,
    choices: Vec<(u32, &'a str, &'a str)>,
    quarterly_scores: Vec<f64>,
    rating: &'a str,
    ending: Option<&'a str>,
    final_template: &'a str,
}

fn autopilot(
    session: &mut Session,
    run: &RunArgs,
    kind: PlayerKind,
    turns: u32,
    json: bool,
) -> Result<()> {
    let player: Box<dyn Player> = match kind {
        PlayerKind::Steady => Box::new(SteadyPlayer),
        PlayerKind::Cycle => Box::new(CyclePlayer),
    };
    let seed = seed_for(run);
    session.new_run(run.archetype, run.template, seed);
    let report = simulate_run(session, player.as_ref(), turns).context("autopilot run failed")?;

    if json {
        let out = ReportJson {
            player: report.player,
            seed,
            turns_played: report.turns.len(),
            choices: report
                .turns
                .iter()
                .map(|t| (t.turn, t.scenario_id.as_str(), t.option_id.as_str()))
                .collect(),
            quarterly_scores: report.scores.history.iter().map(|e| e.score).collect(),
            rating: report.rating(),
            ending: report.ending.as_ref().map(|e| e.message()),
            final_template: report.final_state.template.as_str(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_summary(&report, seed);
    }
    Ok(())
}

fn print_summary(report: &RunReport, seed: u32) {
    println!("{} played {} turns (seed {}).", report.player, report.turns.len(), seed);
    for turn in &report.turns {
        println!("  turn {:>2}: {} -> {}", turn.turn, turn.scenario_id, turn.option_id);
    }
    for event in &report.scores.history {
        println!("  quarter at turn {}: {:.1}", event.turn, event.score);
    }
    if let Some(best) = report.scores.best_moment() {
        println!("Best quarter: turn {} ({:.1})", best.turn, best.score);
    }
    if let Some(worst) = report.scores.worst_moment() {
        println!("Worst quarter: turn {} ({:.1})", worst.turn, worst.score);
    }
    println!("Rating: {}", report.rating());
    match &report.ending {
        Some(ending) => println!("Ending: {}", ending.message()),
        None => println!("The run was cut off before an ending."),
    }
    print_status(&report.final_state);
}
