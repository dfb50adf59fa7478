//! Player-facing description of what a choice did.

use crate::scenario::ScenarioOption;
use crate::stats::{Deltas, StatGroup, StatKey};

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// The option's own summary, or the change lines joined.
    pub summary: String,
    pub changes: Vec<String>,
}

fn format_magnitude(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude.fract() == 0.0 {
        format!("{}", magnitude as i64)
    } else {
        format!("{:.1}", magnitude)
    }
}

fn describe(key: StatKey, value: f64) -> Option<String> {
    if value == 0.0 {
        return None;
    }
    let name = key.stat_name().replace('_', " ");
    let direction = if value > 0.0 { "increased" } else { "decreased" };
    let magnitude = format_magnitude(value);
    let line = match key.group() {
        StatGroup::Leader => format!("Your {name} {direction} by {magnitude} points"),
        StatGroup::Company => format!("Company {name} {direction} by {magnitude} points"),
        StatGroup::Hidden => format!("Hidden {name} {direction} by {magnitude} points"),
        StatGroup::Economy => return None,
    };
    Some(line)
}

/// One line per non-zero leader, company or hidden delta.
pub fn describe_deltas(deltas: &Deltas) -> Vec<String> {
    deltas
        .iter()
        .filter_map(|(key, value)| describe(*key, *value))
        .collect()
}

pub fn describe_outcome(option: &ScenarioOption, applied: &Deltas) -> Outcome {
    let changes = describe_deltas(applied);
    let summary = match option.summary.as_deref().map(str::trim) {
        Some(summary) if !summary.is_empty() => summary.to_string(),
        _ => changes.join(". "),
    };
    Outcome { summary, changes }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_per_group() {
        let deltas: Deltas = [
            (StatKey::TRUST, -2.0),
            (StatKey::TECH_DEBT, 3.0),
            (StatKey::BURNOUT, 1.0),
            (StatKey::RUNWAY_MONTHS, 0.5),
        ]
        .into_iter()
        .collect();
        let lines = describe_deltas(&deltas);
        assert!(lines.contains(&"Your trust decreased by 2 points".to_string()));
        assert!(lines.contains(&"Company tech debt increased by 3 points".to_string()));
        assert!(lines.contains(&"Hidden burnout increased by 1 points".to_string()));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn summary_is_preferred() {
        let applied: Deltas = [(StatKey::VELOCITY, 3.0), (StatKey::MORALE, -1.0)]
            .into_iter()
            .collect();
        let mut option = ScenarioOption {
            summary: Some("Shipped it.".to_string()),
            ..ScenarioOption::default()
        };
        assert_eq!(describe_outcome(&option, &applied).summary, "Shipped it.");

        option.summary = None;
        let outcome = describe_outcome(&option, &applied);
        assert_eq!(
            outcome.summary,
            "Company morale decreased by 1 points. Company velocity increased by 3 points"
        );
    }
}
