//! Offline scenario service.
//!
//! Answers every request from a small phase x template table with the same
//! three archetypal options. Used for offline play and as the last-resort
//! scenario when nothing else is available.

use std::sync::atomic::{AtomicU64, Ordering};

use super::{ProviderPayload, ProviderScenario, ScenarioContext, ScenarioProvider};
use crate::profiles::CompanyTemplate;
use crate::scenario::{Phase, Scenario, ScenarioOption};
use crate::stats::{Deltas, StatKey};

pub const BATCH_SIZE: usize = 3;

struct Situation {
    title: &'static str,
    text: &'static str,
    tags: &'static [&'static str],
}

fn situation(phase: Phase, template: CompanyTemplate) -> Situation {
    match (phase, template) {
        (Phase::Early, CompanyTemplate::Startup) => Situation {
            title: "Team Onboarding Challenge",
            text: "Different stakeholders are pulling your new team in different directions and nobody is sure what matters first. How do you create clarity?",
            tags: &["onboarding", "clarity", "stakeholder_pressure"],
        },
        (Phase::Early, CompanyTemplate::Scaleup) => Situation {
            title: "Growing Pains",
            text: "Headcount doubled while the processes stayed the same. Messages get lost between teams and delivery is slowing down.",
            tags: &["scaling_issues", "communication", "process_heavy"],
        },
        (Phase::Early, CompanyTemplate::Bigco) => Situation {
            title: "Legacy System Challenge",
            text: "You now own an undocumented critical system that the team is scared to change, and stakeholders expect it to get better.",
            tags: &["legacy_systems", "technical_debt", "stakeholder_pressure"],
        },
        (Phase::Mid, CompanyTemplate::Startup) => Situation {
            title: "Feature vs. Quality",
            text: "Product wants features out the door while engineers warn about mounting tech debt. The CEO expects both.",
            tags: &["velocity_low", "tech_debt_high", "stakeholder_pressure"],
        },
        (Phase::Mid, CompanyTemplate::Scaleup) => Situation {
            title: "Architecture Decision",
            text: "The platform is reaching its scaling limits. Engineers want to rebuild core pieces; stakeholders want the roadmap delivered.",
            tags: &["tech_debt_high", "scaling_issues", "resource_constraint"],
        },
        (Phase::Mid, CompanyTemplate::Bigco) => Situation {
            title: "Process Overload",
            text: "Audit requirements are eating into delivery time. The team is tired of the bureaucracy, yet compliance is not optional.",
            tags: &["process_heavy", "compliance", "morale_low"],
        },
        (Phase::Late, CompanyTemplate::Startup) => Situation {
            title: "Growth Crisis",
            text: "Usage is climbing faster than the infrastructure can handle. Do you invest in scaling or keep shipping features?",
            tags: &["scaling_issues", "crisis_risk", "resource_constraint"],
        },
        (Phase::Late, CompanyTemplate::Scaleup) => Situation {
            title: "Team Restructure",
            text: "The organization has outgrown its team layout. Some engineers want to stay with their crew while others are hungry for something new.",
            tags: &["team_growth", "morale_low", "strategic_decision"],
        },
        (Phase::Late, CompanyTemplate::Bigco) => Situation {
            title: "Strategic Pivot",
            text: "The market moved and leadership is changing course. Much of your team's current work may no longer fit the new direction.",
            tags: &["strategic_decision", "stakeholder_pressure", "crisis_risk"],
        },
    }
}

fn deltas(entries: &[(StatKey, f64)]) -> Deltas {
    entries.iter().copied().collect()
}

fn option(
    hint: &str,
    description: &str,
    immediate: Deltas,
    tags: &[&str],
    summary: &str,
) -> ScenarioOption {
    ScenarioOption {
        hint: hint.to_string(),
        description: description.to_string(),
        immediate,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        summary: Some(summary.to_string()),
        ..ScenarioOption::default()
    }
}

fn standard_options() -> [(String, ScenarioOption); 3] {
    [
        (
            "option1".to_string(),
            option(
                "Quick action",
                "Act decisively right now to get things moving.",
                deltas(&[
                    (StatKey::VELOCITY, 2.0),
                    (StatKey::TRUST, -1.0),
                    (StatKey::MORALE, -1.0),
                ]),
                &["execution_focused", "quick_decision"],
                "You moved fast, at some cost to your relationships.",
            ),
        ),
        (
            "option2".to_string(),
            option(
                "Collaborate",
                "Get the stakeholders in one room and work out a shared answer.",
                deltas(&[
                    (StatKey::TRUST, 2.0),
                    (StatKey::STAKEHOLDER, 1.0),
                    (StatKey::VELOCITY, -1.0),
                ]),
                &["collaborative", "people_focused"],
                "You built trust through collaboration, and progress slowed.",
            ),
        ),
        (
            "option3".to_string(),
            option(
                "Strategic",
                "Step back, study the situation and build a longer-term plan.",
                deltas(&[
                    (StatKey::VISION, 2.0),
                    (StatKey::STAKEHOLDER, -1.0),
                    (StatKey::VELOCITY, -1.0),
                ]),
                &["strategic", "long_term"],
                "You played the long game and let some short-term wins slip by.",
            ),
        ),
    ]
}

fn build_scenario(phase: Phase, template: CompanyTemplate) -> Scenario {
    let situation = situation(phase, template);
    Scenario {
        phase,
        tags: situation.tags.iter().map(|t| t.to_string()).collect(),
        title: situation.title.to_string(),
        text: situation.text.to_string(),
        options: standard_options().into_iter().collect(),
        requires_flags: Vec::new(),
    }
}

/// Locally synthesized scenario for when neither the deck nor any service
/// has anything to offer.
pub fn fallback_scenario(phase: Phase, template: CompanyTemplate) -> ProviderScenario {
    ProviderScenario {
        id: format!("fallback-{}-{}", phase, template.as_str()),
        scenario: build_scenario(phase, template),
    }
}

/// In-process stand-in for the scenario service.
#[derive(Debug, Default)]
pub struct MockScenarioProvider {
    issued: AtomicU64,
}

impl MockScenarioProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn generate(&self, context: &ScenarioContext) -> ProviderScenario {
        let phase = context.phase();
        let template = context
            .template
            .parse::<CompanyTemplate>()
            .unwrap_or(CompanyTemplate::Startup);
        let n = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        ProviderScenario {
            id: format!("dynamic-{}-{}-t{}-{}", phase, template.as_str(), context.turn, n),
            scenario: build_scenario(phase, template),
        }
    }
}

impl ScenarioProvider for MockScenarioProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn request(&self, context: &ScenarioContext) -> Option<ProviderPayload> {
        let payload = if context.is_batch() {
            ProviderPayload::Batch((0..BATCH_SIZE).map(|_| self.generate(context)).collect())
        } else {
            ProviderPayload::Single(self.generate(context))
        };
        Some(payload)
    }
}
