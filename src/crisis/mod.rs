// Crisis module
// Rule-based crisis and mental-state scoring plus the collaborators that act on it

mod assessment;
mod context;
mod detector;
mod level;
mod render;
mod resources;
mod response;
mod rules;
mod sentiment;

pub use assessment::{Assessment, CrisisEngine};
pub use context::{needs_crisis_check, MoodEntry, UserContext, WellbeingCheck};
pub use detector::{CrisisDetector, DetectionResult, IMMEDIACY_PHRASES};
pub use level::{Priority, RecommendedAction, SeverityLevel};
pub use render::{primary_contact, render_reply, EmergencyContact, AI_DISCLAIMER};
pub use resources::{CrisisResource, ResourceDirectory, INTERNATIONAL};
pub use response::CrisisResponse;
pub use rules::{Category, Modifier, ProtectiveFactor, RuleSet, BUILTIN_RULES};
pub use sentiment::{LexicalSentiment, NoSentiment, SentimentAnalyzer};
