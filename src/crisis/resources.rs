// Crisis hotline directory filtered by country and specialty

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Country code for resources available everywhere
pub const INTERNATIONAL: &str = "INTL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrisisResource {
    pub name: String,
    pub phone_number: String,
    #[serde(default)]
    pub text_number: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub description: String,
    /// ISO 3166 alpha-2, or "INTL"
    pub country: String,
    #[serde(default = "default_is_24_7")]
    pub is_24_7: bool,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub specialties: Vec<String>,
}

fn default_is_24_7() -> bool {
    true
}

impl CrisisResource {
    fn serves(&self, country: &str) -> bool {
        self.country.eq_ignore_ascii_case(country) || self.country == INTERNATIONAL
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDirectory {
    resources: Vec<CrisisResource>,
}

impl Default for ResourceDirectory {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ResourceDirectory {
    pub fn new(resources: Vec<CrisisResource>) -> Self {
        Self { resources }
    }

    /// Load a JSON array of resources
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read resources file: {}", path.display()))?;
        let resources: Vec<CrisisResource> =
            serde_json::from_str(&contents).context("Failed to parse crisis resources JSON")?;
        tracing::info!(path = %path.display(), count = resources.len(), "Loaded crisis resources");
        Ok(Self::new(resources))
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resources for a country plus international ones, ordered by country then name
    pub fn for_country(&self, country: &str) -> Vec<&CrisisResource> {
        let mut matching: Vec<&CrisisResource> =
            self.resources.iter().filter(|r| r.serves(country)).collect();
        matching.sort_by(|a, b| a.country.cmp(&b.country).then_with(|| a.name.cmp(&b.name)));
        matching
    }

    pub fn by_specialty(&self, country: &str, specialty: &str) -> Vec<&CrisisResource> {
        self.for_country(country)
            .into_iter()
            .filter(|r| r.specialties.iter().any(|s| s.eq_ignore_ascii_case(specialty)))
            .collect()
    }

    pub fn builtin() -> Self {
        Self::new(vec![
            CrisisResource {
                name: "988 Suicide & Crisis Lifeline".to_string(),
                phone_number: "988".to_string(),
                text_number: Some("988".to_string()),
                website: Some("https://988lifeline.org".to_string()),
                description: "Free, confidential support for people in distress.".to_string(),
                country: "US".to_string(),
                is_24_7: true,
                languages: vec!["en".to_string(), "es".to_string()],
                specialties: vec!["suicide".to_string(), "mental_health".to_string()],
            },
            CrisisResource {
                name: "Crisis Text Line".to_string(),
                phone_number: String::new(),
                text_number: Some("Text HOME to 741741".to_string()),
                website: Some("https://www.crisistextline.org".to_string()),
                description: "Text with a trained crisis counselor.".to_string(),
                country: "US".to_string(),
                is_24_7: true,
                languages: vec!["en".to_string()],
                specialties: vec!["suicide".to_string(), "self_harm".to_string()],
            },
            CrisisResource {
                name: "Samaritans".to_string(),
                phone_number: "116 123".to_string(),
                text_number: None,
                website: Some("https://www.samaritans.org".to_string()),
                description: "Listening support for anyone who is struggling.".to_string(),
                country: "GB".to_string(),
                is_24_7: true,
                languages: vec!["en".to_string()],
                specialties: vec!["suicide".to_string(), "mental_health".to_string()],
            },
            CrisisResource {
                name: "Find A Helpline".to_string(),
                phone_number: String::new(),
                text_number: None,
                website: Some("https://findahelpline.com".to_string()),
                description: "Directory of free helplines in over 130 countries.".to_string(),
                country: INTERNATIONAL.to_string(),
                is_24_7: true,
                languages: vec!["en".to_string()],
                specialties: vec!["suicide".to_string(), "mental_health".to_string()],
            },
        ])
    }
}
