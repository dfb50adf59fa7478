//! Stat groups and typed `"group.stat"` addressing.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lower bound shared by every bounded stat.
pub const STAT_MIN: i32 = 0;
/// Upper bound shared by every bounded stat.
pub const STAT_MAX: i32 = 100;

/// Delta map keyed by typed stat address.
pub type Deltas = BTreeMap<StatKey, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatGroup {
    Leader,
    Company,
    Hidden,
    Economy,
}

impl StatGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatGroup::Leader => "leader",
            StatGroup::Company => "company",
            StatGroup::Hidden => "hidden",
            StatGroup::Economy => "economy",
        }
    }

    /// Leader, company and hidden stats are clamped into [0, 100].
    pub fn is_bounded(&self) -> bool {
        !matches!(self, StatGroup::Economy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LeaderStat {
    Trust,
    Execution,
    Vision,
    Culture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CompanyStat {
    Morale,
    Velocity,
    TechDebt,
    Stakeholder,
    Financials,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HiddenStat {
    Burnout,
    Attrition,
    Crisis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EconomyStat {
    RunwayMonths,
    BurnRate,
    Mau,
    RevenueIndex,
}

/// A validated stat address such as `company.velocity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StatKey {
    Leader(LeaderStat),
    Company(CompanyStat),
    Hidden(HiddenStat),
    Economy(EconomyStat),
}

impl StatKey {
    pub const TRUST: StatKey = StatKey::Leader(LeaderStat::Trust);
    pub const EXECUTION: StatKey = StatKey::Leader(LeaderStat::Execution);
    pub const VISION: StatKey = StatKey::Leader(LeaderStat::Vision);
    pub const CULTURE: StatKey = StatKey::Leader(LeaderStat::Culture);
    pub const MORALE: StatKey = StatKey::Company(CompanyStat::Morale);
    pub const VELOCITY: StatKey = StatKey::Company(CompanyStat::Velocity);
    pub const TECH_DEBT: StatKey = StatKey::Company(CompanyStat::TechDebt);
    pub const STAKEHOLDER: StatKey = StatKey::Company(CompanyStat::Stakeholder);
    pub const FINANCIALS: StatKey = StatKey::Company(CompanyStat::Financials);
    pub const BURNOUT: StatKey = StatKey::Hidden(HiddenStat::Burnout);
    pub const ATTRITION: StatKey = StatKey::Hidden(HiddenStat::Attrition);
    pub const CRISIS: StatKey = StatKey::Hidden(HiddenStat::Crisis);
    pub const RUNWAY_MONTHS: StatKey = StatKey::Economy(EconomyStat::RunwayMonths);
    pub const BURN_RATE: StatKey = StatKey::Economy(EconomyStat::BurnRate);
    pub const MAU: StatKey = StatKey::Economy(EconomyStat::Mau);
    pub const REVENUE_INDEX: StatKey = StatKey::Economy(EconomyStat::RevenueIndex);

    /// Every addressable stat, in display order.
    pub const ALL: [StatKey; 16] = [
        StatKey::TRUST,
        StatKey::EXECUTION,
        StatKey::VISION,
        StatKey::CULTURE,
        StatKey::MORALE,
        StatKey::VELOCITY,
        StatKey::TECH_DEBT,
        StatKey::STAKEHOLDER,
        StatKey::FINANCIALS,
        StatKey::BURNOUT,
        StatKey::ATTRITION,
        StatKey::CRISIS,
        StatKey::RUNWAY_MONTHS,
        StatKey::BURN_RATE,
        StatKey::MAU,
        StatKey::REVENUE_INDEX,
    ];

    pub fn group(&self) -> StatGroup {
        match self {
            StatKey::Leader(_) => StatGroup::Leader,
            StatKey::Company(_) => StatGroup::Company,
            StatKey::Hidden(_) => StatGroup::Hidden,
            StatKey::Economy(_) => StatGroup::Economy,
        }
    }

    /// The part after the dot, e.g. `tech_debt`.
    pub fn stat_name(&self) -> &'static str {
        match self {
            StatKey::Leader(LeaderStat::Trust) => "trust",
            StatKey::Leader(LeaderStat::Execution) => "execution",
            StatKey::Leader(LeaderStat::Vision) => "vision",
            StatKey::Leader(LeaderStat::Culture) => "culture",
            StatKey::Company(CompanyStat::Morale) => "morale",
            StatKey::Company(CompanyStat::Velocity) => "velocity",
            StatKey::Company(CompanyStat::TechDebt) => "tech_debt",
            StatKey::Company(CompanyStat::Stakeholder) => "stakeholder",
            StatKey::Company(CompanyStat::Financials) => "financials",
            StatKey::Hidden(HiddenStat::Burnout) => "burnout",
            StatKey::Hidden(HiddenStat::Attrition) => "attrition",
            StatKey::Hidden(HiddenStat::Crisis) => "crisis",
            StatKey::Economy(EconomyStat::RunwayMonths) => "runwayMonths",
            StatKey::Economy(EconomyStat::BurnRate) => "burnRate",
            StatKey::Economy(EconomyStat::Mau) => "mau",
            StatKey::Economy(EconomyStat::RevenueIndex) => "revenueIndex",
        }
    }

    /// Stats where a higher value is bad for the company.
    pub fn is_risk(&self) -> bool {
        matches!(
            self,
            StatKey::Company(CompanyStat::TechDebt)
                | StatKey::Hidden(_)
                | StatKey::Economy(EconomyStat::BurnRate)
        )
    }

    /// Look a stat up by its bare name (`morale`) or full address (`company.morale`).
    pub fn from_name(name: &str) -> Option<StatKey> {
        StatKey::ALL
            .iter()
            .find(|key| key.stat_name() == name || key.to_string() == name)
            .copied()
    }
}

impl fmt::Display for StatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group().as_str(), self.stat_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown stat key {0:?}")]
pub struct UnknownStatKey(pub String);

impl FromStr for StatKey {
    type Err = UnknownStatKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (group, stat) = s
            .split_once('.')
            .ok_or_else(|| UnknownStatKey(s.to_string()))?;
        StatKey::ALL
            .iter()
            .find(|key| key.group().as_str() == group && key.stat_name() == stat)
            .copied()
            .ok_or_else(|| UnknownStatKey(s.to_string()))
    }
}

impl TryFrom<String> for StatKey {
    type Error = UnknownStatKey;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StatKey> for String {
    fn from(key: StatKey) -> Self {
        key.to_string()
    }
}

/// Clamp into the bounded stat range.
pub fn clamp_stat(value: i32) -> i32 {
    value.clamp(STAT_MIN, STAT_MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderStats {
    pub trust: i32,
    pub execution: i32,
    pub vision: i32,
    pub culture: i32,
}

impl LeaderStats {
    pub fn get(&self, stat: LeaderStat) -> i32 {
        match stat {
            LeaderStat::Trust => self.trust,
            LeaderStat::Execution => self.execution,
            LeaderStat::Vision => self.vision,
            LeaderStat::Culture => self.culture,
        }
    }

    pub fn get_mut(&mut self, stat: LeaderStat) -> &mut i32 {
        match stat {
            LeaderStat::Trust => &mut self.trust,
            LeaderStat::Execution => &mut self.execution,
            LeaderStat::Vision => &mut self.vision,
            LeaderStat::Culture => &mut self.culture,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyStats {
    pub morale: i32,
    pub velocity: i32,
    pub tech_debt: i32,
    pub stakeholder: i32,
    pub financials: i32,
}

impl CompanyStats {
    pub fn get(&self, stat: CompanyStat) -> i32 {
        match stat {
            CompanyStat::Morale => self.morale,
            CompanyStat::Velocity => self.velocity,
            CompanyStat::TechDebt => self.tech_debt,
            CompanyStat::Stakeholder => self.stakeholder,
            CompanyStat::Financials => self.financials,
        }
    }

    pub fn get_mut(&mut self, stat: CompanyStat) -> &mut i32 {
        match stat {
            CompanyStat::Morale => &mut self.morale,
            CompanyStat::Velocity => &mut self.velocity,
            CompanyStat::TechDebt => &mut self.tech_debt,
            CompanyStat::Stakeholder => &mut self.stakeholder,
            CompanyStat::Financials => &mut self.financials,
        }
    }
}

/// Risk scores that feed pressure and scenario weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiddenStats {
    pub burnout: i32,
    pub attrition: i32,
    pub crisis: i32,
}

impl HiddenStats {
    pub fn get(&self, stat: HiddenStat) -> i32 {
        match stat {
            HiddenStat::Burnout => self.burnout,
            HiddenStat::Attrition => self.attrition,
            HiddenStat::Crisis => self.crisis,
        }
    }

    pub fn get_mut(&mut self, stat: HiddenStat) -> &mut i32 {
        match stat {
            HiddenStat::Burnout => &mut self.burnout,
            HiddenStat::Attrition => &mut self.attrition,
            HiddenStat::Crisis => &mut self.crisis,
        }
    }
}

impl Default for HiddenStats {
    fn default() -> Self {
        Self {
            burnout: 2,
            attrition: 16,
            crisis: 5,
        }
    }
}

/// Economy sub-model. Runway and MAU never drop below zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Economy {
    pub runway_months: f64,
    pub burn_rate: f64,
    pub mau: f64,
    pub revenue_index: f64,
}

impl Economy {
    pub fn get(&self, stat: EconomyStat) -> f64 {
        match stat {
            EconomyStat::RunwayMonths => self.runway_months,
            EconomyStat::BurnRate => self.burn_rate,
            EconomyStat::Mau => self.mau,
            EconomyStat::RevenueIndex => self.revenue_index,
        }
    }

    pub fn get_mut(&mut self, stat: EconomyStat) -> &mut f64 {
        match stat {
            EconomyStat::RunwayMonths => &mut self.runway_months,
            EconomyStat::BurnRate => &mut self.burn_rate,
            EconomyStat::Mau => &mut self.mau,
            EconomyStat::RevenueIndex => &mut self.revenue_index,
        }
    }
}
