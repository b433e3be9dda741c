// Caller-supplied user history and the adjustments it implies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CrisisError;

/// One self-reported mood entry (score 1-10)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub score: u8,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl MoodEntry {
    pub fn new(score: u8) -> Self {
        Self {
            score,
            timestamp: None,
        }
    }
}

/// User history consulted (never mutated) by the detector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserContext {
    pub recent_crisis_count: u32,
    pub has_safety_plan: bool,
    pub support_network_size: u32,
    /// Oldest first
    pub mood_history: Vec<MoodEntry>,
}

impl UserContext {
    /// Reject mood scores outside 1-10
    pub fn validate(&self) -> Result<(), CrisisError> {
        if let Some(entry) = self
            .mood_history
            .iter()
            .find(|m| !(1..=10).contains(&m.score))
        {
            return Err(CrisisError::InvalidContext(format!(
                "mood score {} outside 1-10",
                entry.score
            )));
        }
        Ok(())
    }

    /// Apply the history rules to a context modifier.
    ///
    /// Every rule is checked; none short-circuits the others.
    pub fn adjust(&self, modifier: f64) -> f64 {
        let mut modifier = modifier;

        if self.recent_crisis_count > 0 {
            modifier *= 1.2;
        }
        if self.has_safety_plan {
            modifier *= 0.8;
        }
        if self.support_network_size > 3 {
            modifier *= 0.9;
        }
        if self.has_stable_recent_mood() {
            modifier *= 0.8;
        }

        modifier
    }

    /// Last three mood entries all at 6 or above
    pub fn has_stable_recent_mood(&self) -> bool {
        let n = self.mood_history.len();
        n >= 3 && self.mood_history[n - 3..].iter().all(|m| m.score >= 6)
    }

    /// Entries scoring below 4 among the last seven
    pub fn low_mood_days(&self) -> usize {
        let n = self.mood_history.len();
        self.mood_history[n.saturating_sub(7)..]
            .iter()
            .filter(|m| m.score < 4)
            .count()
    }
}

/// Result of a periodic "does this user need a check-in" evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellbeingCheck {
    pub needs_crisis_check: bool,
    pub recent_detections: usize,
    pub low_mood_days: usize,
    pub has_safety_plan: bool,
}

/// More than two detections in the past week, or more than four low-mood
/// days among the last seven entries, warrants a check-in.
pub fn needs_crisis_check(recent_detections: usize, context: &UserContext) -> WellbeingCheck {
    let low_mood_days = context.low_mood_days();
    WellbeingCheck {
        needs_crisis_check: recent_detections > 2 || low_mood_days > 4,
        recent_detections,
        low_mood_days,
        has_safety_plan: context.has_safety_plan,
    }
}
