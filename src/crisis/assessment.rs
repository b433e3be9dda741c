// One chat turn through detection, response composition and rendering

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::context::UserContext;
use super::detector::{CrisisDetector, DetectionResult};
use super::level::{RecommendedAction, SeverityLevel};
use super::render::{primary_contact, render_reply, EmergencyContact};
use super::resources::ResourceDirectory;
use super::response::CrisisResponse;

/// Everything the chat handler needs to act on a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Absent when detection could not run
    pub detection: Option<DetectionResult>,
    pub recommended_action: RecommendedAction,
    pub response: Option<CrisisResponse>,
    /// Rendered text; absent when the conversation should simply continue
    pub reply: Option<String>,
    pub fallback: bool,
}

impl Assessment {
    pub fn level(&self) -> Option<SeverityLevel> {
        self.detection.as_ref().map(|d| d.level)
    }
}

/// Detector plus resource directory, shared across request handlers
#[derive(Debug, Clone)]
pub struct CrisisEngine {
    detector: Arc<CrisisDetector>,
    directory: Arc<ResourceDirectory>,
    default_country: String,
}

impl CrisisEngine {
    pub fn new(
        detector: CrisisDetector,
        directory: ResourceDirectory,
        default_country: impl Into<String>,
    ) -> Self {
        Self {
            detector: Arc::new(detector),
            directory: Arc::new(directory),
            default_country: default_country.into(),
        }
    }

    pub fn detector(&self) -> &CrisisDetector {
        &self.detector
    }

    pub fn directory(&self) -> &ResourceDirectory {
        &self.directory
    }

    pub fn default_country(&self) -> &str {
        &self.default_country
    }

    /// Score a message and build the reply for it
    pub fn assess(
        &self,
        message: &str,
        context: Option<&UserContext>,
        country: Option<&str>,
        contacts: &[EmergencyContact],
    ) -> Assessment {
        let detection = self.detector.detect(message, context);

        // Immediate-risk language gets the emergency template even at a low score
        let response_level =
            if detection.recommended_action == RecommendedAction::ImmediateIntervention {
                SeverityLevel::Emergency
            } else {
                detection.level
            };

        let response = CrisisResponse::compose(response_level, &detection.factors);
        let reply = response.as_ref().map(|response| {
            let resources = self.directory.for_country(country.unwrap_or(&self.default_country));
            render_reply(response_level, response, &resources, primary_contact(contacts))
        });

        Assessment {
            recommended_action: detection.recommended_action,
            detection: Some(detection),
            response,
            reply,
            fallback: false,
        }
    }

    /// Conservative assessment used when detection failed
    pub fn fallback(&self, country: Option<&str>) -> Assessment {
        let response = CrisisResponse::fallback();
        let resources = self.directory.for_country(country.unwrap_or(&self.default_country));
        let reply = render_reply(SeverityLevel::Warning, &response, &resources, None);
        Assessment {
            detection: None,
            recommended_action: CrisisResponse::fallback_action(),
            response: Some(response),
            reply: Some(reply),
            fallback: true,
        }
    }
}

impl Default for CrisisEngine {
    fn default() -> Self {
        Self::new(CrisisDetector::default(), ResourceDirectory::builtin(), "US")
    }
}
