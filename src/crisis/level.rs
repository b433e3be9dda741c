// Severity levels, recommended actions and response priorities

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered crisis severity scale
///
/// Declaration order is the total order: `None < Concern < Warning < Critical < Emergency`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    None,
    Concern,
    Warning,
    Critical,
    Emergency,
}

impl SeverityLevel {
    pub const ALL: [SeverityLevel; 5] = [
        SeverityLevel::None,
        SeverityLevel::Concern,
        SeverityLevel::Warning,
        SeverityLevel::Critical,
        SeverityLevel::Emergency,
    ];

    /// Threshold a final risk score into a level (highest threshold first)
    pub fn from_score(score: f64) -> Self {
        if score >= 1.5 {
            SeverityLevel::Emergency
        } else if score >= 1.0 {
            SeverityLevel::Critical
        } else if score >= 0.5 {
            SeverityLevel::Warning
        } else if score >= 0.2 {
            SeverityLevel::Concern
        } else {
            SeverityLevel::None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityLevel::None => "none",
            SeverityLevel::Concern => "concern",
            SeverityLevel::Warning => "warning",
            SeverityLevel::Critical => "critical",
            SeverityLevel::Emergency => "emergency",
        }
    }

    /// Critical and Emergency surface the user's emergency contact
    pub fn is_severe(&self) -> bool {
        *self >= SeverityLevel::Critical
    }
}

impl Default for SeverityLevel {
    fn default() -> Self {
        SeverityLevel::None
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the calling chat handler should do with a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    ImmediateIntervention,
    UrgentResources,
    ProvideResources,
    SupportiveResponse,
    ContinueConversation,
}

impl RecommendedAction {
    /// Map a level and the immediacy flag to an action
    pub fn for_level(level: SeverityLevel, immediate_risk: bool) -> Self {
        if level == SeverityLevel::Emergency || immediate_risk {
            return RecommendedAction::ImmediateIntervention;
        }
        match level {
            SeverityLevel::Emergency => RecommendedAction::ImmediateIntervention,
            SeverityLevel::Critical => RecommendedAction::UrgentResources,
            SeverityLevel::Warning => RecommendedAction::ProvideResources,
            SeverityLevel::Concern => RecommendedAction::SupportiveResponse,
            SeverityLevel::None => RecommendedAction::ContinueConversation,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendedAction::ImmediateIntervention => "immediate_intervention",
            RecommendedAction::UrgentResources => "urgent_resources",
            RecommendedAction::ProvideResources => "provide_resources",
            RecommendedAction::SupportiveResponse => "supportive_response",
            RecommendedAction::ContinueConversation => "continue_conversation",
        }
    }
}

impl fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Immediate,
    Urgent,
    Moderate,
    Low,
}
