// Final user-facing reply text

use serde::{Deserialize, Serialize};

use super::level::SeverityLevel;
use super::resources::CrisisResource;
use super::response::CrisisResponse;

pub const AI_DISCLAIMER: &str = "I'm an AI companion, not a substitute for professional care. \
     If you are in danger, please contact emergency services.";

const EMERGENCY_SERVICES_LINE: &str =
    "If you are in immediate danger, call your local emergency number (911 in the US) now.";

/// A user's personal emergency contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub relationship: String,
    pub phone_number: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

/// First contact flagged primary, if any
pub fn primary_contact(contacts: &[EmergencyContact]) -> Option<&EmergencyContact> {
    contacts.iter().find(|c| c.is_primary)
}

fn format_resource(resource: &CrisisResource) -> String {
    let mut line = format!("• {}", resource.name);
    if !resource.phone_number.is_empty() {
        line.push_str(&format!(": {}", resource.phone_number));
    }
    if let Some(text) = resource.text_number.as_deref() {
        if text != resource.phone_number {
            line.push_str(&format!(" (text: {})", text));
        }
    }
    if resource.phone_number.is_empty() && resource.text_number.is_none() {
        if let Some(website) = resource.website.as_deref() {
            line.push_str(&format!(": {}", website));
        }
    }
    if resource.is_24_7 {
        line.push_str(" [24/7]");
    }
    line
}

/// Compose the reply: message, resources, emergency line, contact, disclaimer
pub fn render_reply(
    level: SeverityLevel,
    response: &CrisisResponse,
    resources: &[&CrisisResource],
    primary: Option<&EmergencyContact>,
) -> String {
    let mut sections = vec![response.message.clone()];

    if response.show_resources && !resources.is_empty() {
        let lines: Vec<String> = resources.iter().map(|r| format_resource(r)).collect();
        sections.push(lines.join("\n"));
    }

    if response.suggest_emergency {
        sections.push(EMERGENCY_SERVICES_LINE.to_string());
    }

    if level.is_severe() {
        if let Some(contact) = primary {
            sections.push(format!(
                "You can also reach {} ({}) at {}.",
                contact.name, contact.relationship, contact.phone_number
            ));
        }
    }

    sections.push(format!("_{}_", AI_DISCLAIMER));
    sections.join("\n\n")
}
