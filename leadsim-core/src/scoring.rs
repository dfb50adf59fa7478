//! Quarterly score tracking for run reports.

use serde::{Deserialize, Serialize};

/// Tracks every quarterly review of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreTracker {
    /// Reviews in the order they happened.
    pub history: Vec<ScoreEvent>,
}

/// A single quarterly review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEvent {
    /// Turn the review ran on.
    pub turn: u32,
    pub score: f64,
    /// Messages of the review effects that fired, joined.
    pub reason: String,
}

impl ScoreTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, turn: u32, score: f64, reason: &str) {
        self.history.push(ScoreEvent {
            turn,
            score,
            reason: reason.to_string(),
        });
    }

    pub fn average(&self) -> Option<f64> {
        if self.history.is_empty() {
            return None;
        }
        let total: f64 = self.history.iter().map(|e| e.score).sum();
        Some(total / self.history.len() as f64)
    }

    /// Rating based on the average quarterly score.
    pub fn rating(&self) -> &'static str {
        let Some(average) = self.average() else {
            return "Unrated";
        };
        match average.round() as i32 {
            80.. => "Exceptional Leader",
            65..=79 => "Trusted Leader",
            50..=64 => "Steady Hand",
            35..=49 => "Struggling",
            _ => "On Thin Ice",
        }
    }

    /// Highest-scoring quarter.
    pub fn best_moment(&self) -> Option<&ScoreEvent> {
        self.history
            .iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }

    /// Lowest-scoring quarter.
    pub fn worst_moment(&self) -> Option<&ScoreEvent> {
        self.history
            .iter()
            .min_by(|a, b| a.score.total_cmp(&b.score))
    }
}
