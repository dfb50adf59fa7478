//! The four per-turn dice and how they bias scenarios and effects.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::rng::{die_face, RngCore};

/// Four independent 1-6 rolls made at the start of each turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dice {
    pub internal: u8,
    pub external: u8,
    pub opportunity: u8,
    pub luck: u8,
}

impl Dice {
    /// Roll in a fixed order so the draw count per turn is stable.
    pub fn roll(rng: &mut dyn RngCore) -> Self {
        Self {
            internal: die_face(rng),
            external: die_face(rng),
            opportunity: die_face(rng),
            luck: die_face(rng),
        }
    }
}

/// Display badge for option tags; has no weighting effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionBadge {
    Preferred,
    Available,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectMultipliers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positive: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceInfluence {
    /// Scenario tag -> multiplicative selection weight factor.
    pub scenario_modifiers: BTreeMap<String, f64>,
    pub option_filters: BTreeMap<String, OptionBadge>,
    pub effect_multipliers: EffectMultipliers,
}

#[derive(Clone, Copy)]
enum Axis {
    Internal,
    External,
    Opportunity,
    Luck,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Roll {
    Low,
    High,
}

#[derive(Clone, Copy)]
enum Swing {
    Positive,
    Negative,
}

struct DiceRule {
    axis: Axis,
    roll: Roll,
    scenario_modifiers: &'static [(&'static str, f64)],
    option_filters: &'static [(&'static str, OptionBadge)],
    effect: Option<(Swing, f64)>,
}

const DICE_RULES: [DiceRule; 8] = [
    DiceRule {
        axis: Axis::Internal,
        roll: Roll::Low,
        scenario_modifiers: &[("morale_low", 2.0), ("burnout_high", 1.5)],
        option_filters: &[("people_focused", OptionBadge::Preferred)],
        effect: Some((Swing::Negative, 1.2)),
    },
    DiceRule {
        axis: Axis::Internal,
        roll: Roll::High,
        scenario_modifiers: &[("team_building", 1.5), ("promotion_pressure", 1.3)],
        option_filters: &[("collaborative", OptionBadge::Available)],
        effect: Some((Swing::Positive, 1.2)),
    },
    DiceRule {
        axis: Axis::External,
        roll: Roll::Low,
        scenario_modifiers: &[("stakeholder_pressure", 2.0), ("crisis_risk", 1.5)],
        option_filters: &[("crisis_response", OptionBadge::Preferred)],
        effect: Some((Swing::Negative, 1.2)),
    },
    DiceRule {
        axis: Axis::External,
        roll: Roll::High,
        scenario_modifiers: &[("scaling_issues", 1.5)],
        option_filters: &[("strategic", OptionBadge::Available)],
        effect: None,
    },
    DiceRule {
        axis: Axis::Opportunity,
        roll: Roll::Low,
        scenario_modifiers: &[("financials_low", 1.5), ("resource_constraint", 1.5)],
        option_filters: &[("execution_focused", OptionBadge::Available)],
        effect: None,
    },
    DiceRule {
        axis: Axis::Opportunity,
        roll: Roll::High,
        scenario_modifiers: &[("strategic_decision", 1.5), ("innovation", 1.5)],
        option_filters: &[("innovative", OptionBadge::Preferred)],
        effect: Some((Swing::Positive, 1.2)),
    },
    DiceRule {
        axis: Axis::Luck,
        roll: Roll::Low,
        scenario_modifiers: &[("crisis_risk", 1.5), ("tech_debt_high", 1.3)],
        option_filters: &[],
        effect: Some((Swing::Negative, 1.2)),
    },
    DiceRule {
        axis: Axis::Luck,
        roll: Roll::High,
        scenario_modifiers: &[("lucky_break", 2.0)],
        option_filters: &[("quick_decision", OptionBadge::Available)],
        effect: Some((Swing::Positive, 1.2)),
    },
];

fn classify(value: u8) -> Option<Roll> {
    match value {
        0..=2 => Some(Roll::Low),
        5.. => Some(Roll::High),
        _ => None,
    }
}

/// Map a roll to its scenario modifiers, option badges and effect multipliers.
///
/// When two rules touch the same scenario tag the stronger factor wins;
/// badges never downgrade from `Preferred`.
pub fn dice_influence(dice: &Dice) -> DiceInfluence {
    let mut influence = DiceInfluence::default();

    for rule in &DICE_RULES {
        let value = match rule.axis {
            Axis::Internal => dice.internal,
            Axis::External => dice.external,
            Axis::Opportunity => dice.opportunity,
            Axis::Luck => dice.luck,
        };
        if classify(value) != Some(rule.roll) {
            continue;
        }

        for (tag, factor) in rule.scenario_modifiers {
            let entry = influence
                .scenario_modifiers
                .entry(tag.to_string())
                .or_insert(*factor);
            *entry = entry.max(*factor);
        }
        for (tag, badge) in rule.option_filters {
            let entry = influence
                .option_filters
                .entry(tag.to_string())
                .or_insert(*badge);
            if *badge == OptionBadge::Preferred {
                *entry = OptionBadge::Preferred;
            }
        }
        match rule.effect {
            Some((Swing::Positive, factor)) => {
                let current = influence.effect_multipliers.positive.unwrap_or(factor);
                influence.effect_multipliers.positive = Some(current.max(factor));
            }
            Some((Swing::Negative, factor)) => {
                let current = influence.effect_multipliers.negative.unwrap_or(factor);
                influence.effect_multipliers.negative = Some(current.max(factor));
            }
            None => {}
        }
    }

    influence
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::Lcg;

    fn dice(internal: u8, external: u8, opportunity: u8, luck: u8) -> Dice {
        Dice {
            internal,
            external,
            opportunity,
            luck,
        }
    }

    #[test]
    fn middling_rolls_have_no_influence() {
        let influence = dice_influence(&dice(3, 4, 3, 4));
        assert!(influence.scenario_modifiers.is_empty());
        assert!(influence.option_filters.is_empty());
        assert_eq!(influence.effect_multipliers, EffectMultipliers::default());
    }

    #[test]
    fn low_internal_roll_raises_morale_scenarios() {
        let influence = dice_influence(&dice(1, 3, 3, 3));
        assert_eq!(influence.scenario_modifiers.get("morale_low"), Some(&2.0));
        assert_eq!(influence.scenario_modifiers.get("burnout_high"), Some(&1.5));
        assert_eq!(influence.effect_multipliers.negative, Some(1.2));
        assert_eq!(influence.effect_multipliers.positive, None);
    }

    #[test]
    fn high_luck_roll_adds_lucky_break() {
        let influence = dice_influence(&dice(3, 3, 3, 6));
        assert_eq!(influence.scenario_modifiers.get("lucky_break"), Some(&2.0));
        assert_eq!(influence.effect_multipliers.positive, Some(1.2));
    }

    #[test]
    fn overlapping_tags_keep_stronger_factor() {
        let influence = dice_influence(&dice(3, 1, 3, 1));
        assert_eq!(influence.scenario_modifiers.get("crisis_risk"), Some(&1.5));
        assert_eq!(influence.scenario_modifiers.get("tech_debt_high"), Some(&1.3));
        assert_eq!(
            influence.scenario_modifiers.get("stakeholder_pressure"),
            Some(&2.0)
        );
    }

    #[test]
    fn roll_uses_four_draws() {
        let mut a = Lcg::new(42);
        let mut b = Lcg::new(42);
        let rolled = Dice::roll(&mut a);
        for face in [rolled.internal, rolled.external, rolled.opportunity, rolled.luck] {
            assert!((1..=6).contains(&face));
        }
        for _ in 0..4 {
            b.next_uint32();
        }
        assert_eq!(a, b);
    }
}
