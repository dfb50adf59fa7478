//! Leader archetypes and company templates: immutable base profiles.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scenario::Phase;
use crate::stats::{CompanyStats, Deltas, Economy, LeaderStats, StatKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    Operator,
    ServantLeader,
    Visionary,
    Firefighter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyTemplate {
    Startup,
    Scaleup,
    Bigco,
}

pub struct ArchetypeProfile {
    pub name: &'static str,
    pub description: &'static str,
    pub stats: LeaderStats,
    /// Scenario tags this leader gravitates towards.
    pub scenario_affinity: &'static [(&'static str, f64)],
    /// Option tag -> effect magnitude multiplier.
    pub option_modifiers: &'static [(&'static str, f64)],
}

pub struct TemplateProfile {
    pub name: &'static str,
    pub description: &'static str,
    pub stats: CompanyStats,
    /// Scenario tag -> additive selection weight bonus.
    pub scenario_types: &'static [(&'static str, f64)],
    /// Informational only.
    pub exclusive_scenarios: &'static [&'static str],
    pub economy: Economy,
    pub baseline_mau: f64,
    pub effect_factor: f64,
}

static OPERATOR: ArchetypeProfile = ArchetypeProfile {
    name: "Operator",
    description: "High execution, moderate trust/vision, lower culture",
    stats: LeaderStats {
        trust: 45,
        execution: 75,
        vision: 50,
        culture: 35,
    },
    scenario_affinity: &[
        ("velocity_low", 1.3),
        ("tech_debt_high", 1.2),
        ("process_heavy", 1.1),
    ],
    option_modifiers: &[
        ("execution_focused", 1.2),
        ("quick_decision", 1.1),
        ("people_focused", 0.9),
    ],
};

static SERVANT_LEADER: ArchetypeProfile = ArchetypeProfile {
    name: "Servant Leader",
    description: "High culture/trust, weaker execution",
    stats: LeaderStats {
        trust: 70,
        execution: 45,
        vision: 60,
        culture: 80,
    },
    scenario_affinity: &[
        ("morale_low", 1.3),
        ("team_building", 1.2),
        ("promotion_pressure", 1.2),
    ],
    option_modifiers: &[
        ("people_focused", 1.2),
        ("collaborative", 1.15),
        ("execution_focused", 0.9),
    ],
};

static VISIONARY: ArchetypeProfile = ArchetypeProfile {
    name: "Visionary",
    description: "High vision, lower execution",
    stats: LeaderStats {
        trust: 60,
        execution: 40,
        vision: 85,
        culture: 55,
    },
    scenario_affinity: &[
        ("strategic_decision", 1.3),
        ("stakeholder_pressure", 1.1),
        ("scaling_issues", 1.2),
    ],
    option_modifiers: &[
        ("strategic", 1.2),
        ("vision_driven", 1.2),
        ("innovative", 1.1),
        ("quick_decision", 0.9),
    ],
};

static FIREFIGHTER: ArchetypeProfile = ArchetypeProfile {
    name: "Firefighter",
    description: "Scrappy, strong in crisis, weaker long-term trust/culture",
    stats: LeaderStats {
        trust: 35,
        execution: 70,
        vision: 45,
        culture: 30,
    },
    scenario_affinity: &[
        ("crisis_risk", 1.4),
        ("burnout_high", 1.1),
        ("financials_low", 1.1),
    ],
    option_modifiers: &[
        ("crisis_response", 1.3),
        ("quick_decision", 1.15),
        ("long_term", 0.85),
    ],
};

static STARTUP: TemplateProfile = TemplateProfile {
    name: "Startup",
    description: "Scrappy, lower stakeholder alignment & cash, high velocity",
    stats: CompanyStats {
        morale: 60,
        velocity: 75,
        tech_debt: 40,
        stakeholder: 35,
        financials: 25,
    },
    scenario_types: &[
        ("velocity_low", 1.0),
        ("stakeholder_pressure", 1.0),
        ("financials_low", 1.0),
        ("tech_debt_high", 1.0),
    ],
    exclusive_scenarios: &["first_hire", "seed_pitch"],
    economy: Economy {
        runway_months: 8.0,
        burn_rate: 0.55,
        mau: 1_200.0,
        revenue_index: 0.5,
    },
    baseline_mau: 1_000.0,
    effect_factor: 1.2,
};

static SCALEUP: TemplateProfile = TemplateProfile {
    name: "Scaleup",
    description: "Higher financials, but rising tech debt",
    stats: CompanyStats {
        morale: 55,
        velocity: 65,
        tech_debt: 60,
        stakeholder: 60,
        financials: 70,
    },
    scenario_types: &[
        ("tech_debt_high", 2.0),
        ("morale_low", 1.0),
        ("promotion_pressure", 1.0),
        ("stakeholder_pressure", 1.0),
    ],
    exclusive_scenarios: &["reorg", "series_c"],
    economy: Economy {
        runway_months: 14.0,
        burn_rate: 0.5,
        mau: 25_000.0,
        revenue_index: 0.6,
    },
    baseline_mau: 20_000.0,
    effect_factor: 1.1,
};

static BIGCO: TemplateProfile = TemplateProfile {
    name: "BigCo",
    description: "Strong financials/stakeholders, but sluggish velocity",
    stats: CompanyStats {
        morale: 50,
        velocity: 45,
        tech_debt: 70,
        stakeholder: 80,
        financials: 85,
    },
    scenario_types: &[
        ("stakeholder_pressure", 1.0),
        ("process_heavy", 2.0),
        ("crisis_risk", 1.0),
    ],
    exclusive_scenarios: &["compliance_audit", "reorg"],
    economy: Economy {
        runway_months: 24.0,
        burn_rate: 0.45,
        mau: 250_000.0,
        revenue_index: 0.7,
    },
    baseline_mau: 200_000.0,
    effect_factor: 1.0,
};

impl Archetype {
    pub const ALL: [Archetype; 4] = [
        Archetype::Operator,
        Archetype::ServantLeader,
        Archetype::Visionary,
        Archetype::Firefighter,
    ];

    pub fn profile(&self) -> &'static ArchetypeProfile {
        match self {
            Archetype::Operator => &OPERATOR,
            Archetype::ServantLeader => &SERVANT_LEADER,
            Archetype::Visionary => &VISIONARY,
            Archetype::Firefighter => &FIREFIGHTER,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::Operator => "operator",
            Archetype::ServantLeader => "servant_leader",
            Archetype::Visionary => "visionary",
            Archetype::Firefighter => "firefighter",
        }
    }

    /// Product of every option modifier matching one of `tags`.
    pub fn option_multiplier(&self, tags: &[String]) -> f64 {
        self.profile()
            .option_modifiers
            .iter()
            .filter(|(tag, _)| tags.iter().any(|t| t == tag))
            .map(|(_, modifier)| modifier)
            .product()
    }
}

/// Stat nudge applied once when a company is promoted into a tier.
pub struct TierPromotion {
    pub to: CompanyTemplate,
    pub nudge: &'static [(StatKey, f64)],
}

impl CompanyTemplate {
    pub const ALL: [CompanyTemplate; 3] = [
        CompanyTemplate::Startup,
        CompanyTemplate::Scaleup,
        CompanyTemplate::Bigco,
    ];

    pub fn profile(&self) -> &'static TemplateProfile {
        match self {
            CompanyTemplate::Startup => &STARTUP,
            CompanyTemplate::Scaleup => &SCALEUP,
            CompanyTemplate::Bigco => &BIGCO,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyTemplate::Startup => "startup",
            CompanyTemplate::Scaleup => "scaleup",
            CompanyTemplate::Bigco => "bigco",
        }
    }

    /// The next tier and its one-time nudge, or `None` at the terminal tier.
    pub fn promotion(&self) -> Option<TierPromotion> {
        match self {
            CompanyTemplate::Startup => Some(TierPromotion {
                to: CompanyTemplate::Scaleup,
                nudge: &[
                    (StatKey::STAKEHOLDER, 5.0),
                    (StatKey::FINANCIALS, 5.0),
                    (StatKey::TECH_DEBT, 5.0),
                ],
            }),
            CompanyTemplate::Scaleup => Some(TierPromotion {
                to: CompanyTemplate::Bigco,
                nudge: &[
                    (StatKey::STAKEHOLDER, 5.0),
                    (StatKey::FINANCIALS, 5.0),
                    (StatKey::VELOCITY, -5.0),
                ],
            }),
            CompanyTemplate::Bigco => None,
        }
    }

    /// Additive selection bonus for a scenario tag.
    pub fn scenario_bias(&self, tag: &str) -> Option<f64> {
        self.profile()
            .scenario_types
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, bonus)| *bonus)
    }
}

/// Phase multiplier used by effect scaling.
pub fn phase_factor(phase: Phase) -> f64 {
    match phase {
        Phase::Early => 1.1,
        Phase::Mid => 1.25,
        Phase::Late => 1.35,
    }
}

pub(crate) fn table_to_map(table: &[(&'static str, f64)]) -> BTreeMap<String, f64> {
    table
        .iter()
        .map(|(tag, value)| (tag.to_string(), *value))
        .collect()
}

pub(crate) fn nudge_deltas(nudge: &[(StatKey, f64)]) -> Deltas {
    nudge.iter().copied().collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} {value:?}")]
pub struct ProfileParseError {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for Archetype {
    type Err = ProfileParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Archetype::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ProfileParseError {
                kind: "archetype",
                value: s.to_string(),
            })
    }
}

impl FromStr for CompanyTemplate {
    type Err = ProfileParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CompanyTemplate::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ProfileParseError {
                kind: "template",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.profile().name)
    }
}

impl fmt::Display for CompanyTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.profile().name)
    }
}
