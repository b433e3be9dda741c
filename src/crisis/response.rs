// Supportive message templates keyed by severity

use serde::{Deserialize, Serialize};

use super::level::{Priority, RecommendedAction, SeverityLevel};

const SEEKING_HELP_ACKNOWLEDGEMENT: &str = " I'm glad you're reaching out for support.";

/// Message descriptor handed to the reply renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrisisResponse {
    pub message: String,
    pub show_resources: bool,
    pub priority: Priority,
    pub suggest_emergency: bool,
}

impl CrisisResponse {
    /// Template for a level. `None` has no crisis response.
    ///
    /// Only the level and the fired factor tags are consulted, never the score.
    pub fn compose(level: SeverityLevel, factors: &[String]) -> Option<Self> {
        let mut response = match level {
            SeverityLevel::None => return None,
            SeverityLevel::Emergency => Self {
                message: "I'm very concerned about what you're sharing. Your life has value and \
                          help is available right now. Please reach out to a crisis counselor \
                          immediately:"
                    .to_string(),
                show_resources: true,
                priority: Priority::Immediate,
                suggest_emergency: true,
            },
            SeverityLevel::Critical => Self {
                message: "I hear you're going through an incredibly difficult time. You don't \
                          have to face this alone. There are people who want to help:"
                    .to_string(),
                show_resources: true,
                priority: Priority::Urgent,
                suggest_emergency: false,
            },
            SeverityLevel::Warning => Self {
                message: "It sounds like you're dealing with some really heavy feelings. Thank \
                          you for trusting me with this. Here are some resources that might help:"
                    .to_string(),
                show_resources: true,
                priority: Priority::Moderate,
                suggest_emergency: false,
            },
            SeverityLevel::Concern => Self {
                message: "I can sense you're struggling right now. It's okay to feel this way, \
                          and it's brave of you to reach out. Would you like to talk more about \
                          what's on your mind?"
                    .to_string(),
                show_resources: false,
                priority: Priority::Low,
                suggest_emergency: false,
            },
        };

        if seeks_help(factors) {
            response.message.push_str(SEEKING_HELP_ACKNOWLEDGEMENT);
        }

        Some(response)
    }

    /// Used when detection could not run; still offers resources
    pub fn fallback() -> Self {
        Self {
            message: "I want to make sure you have support. If you're going through a hard time, \
                      these services are available to talk with you:"
                .to_string(),
            show_resources: true,
            priority: Priority::Urgent,
            suggest_emergency: false,
        }
    }

    /// Action paired with the fallback response
    pub fn fallback_action() -> RecommendedAction {
        RecommendedAction::ProvideResources
    }
}

/// Help-seeking fires as a modifier in the built-in tables; custom tables may
/// declare it as a protective factor instead.
fn seeks_help(factors: &[String]) -> bool {
    factors
        .iter()
        .any(|f| f == "modifier_seeking_help" || f == "protective_seeking_help")
}
