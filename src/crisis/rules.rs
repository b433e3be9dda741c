// Crisis rule tables: weighted categories, contextual modifiers, protective factors

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use super::level::SeverityLevel;
use crate::errors::CrisisError;

/// Built-in tables, shared process-wide
pub static BUILTIN_RULES: Lazy<RuleSet> = Lazy::new(RuleSet::builtin);

/// A weighted keyword group for one crisis indicator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub keywords: Vec<String>,
    pub weight: f64,
    pub severity: SeverityLevel,
}

/// A multiplicative adjustment triggered by contextual phrases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub name: String,
    pub patterns: Vec<String>,
    pub factor: f64,
}

/// Mitigating phrases; each matched factor discounts the score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectiveFactor {
    pub name: String,
    pub patterns: Vec<String>,
}

impl Category {
    /// First keyword found in already-lowercased text
    pub fn first_match(&self, text: &str) -> Option<&str> {
        first_match(&self.keywords, text)
    }
}

impl Modifier {
    pub fn first_match(&self, text: &str) -> Option<&str> {
        first_match(&self.patterns, text)
    }

    pub fn tag(&self) -> String {
        format!("modifier_{}", self.name)
    }
}

impl ProtectiveFactor {
    pub fn first_match(&self, text: &str) -> Option<&str> {
        first_match(&self.patterns, text)
    }

    pub fn tag(&self) -> String {
        format!("protective_{}", self.name)
    }
}

fn first_match<'a>(phrases: &'a [String], text: &str) -> Option<&'a str> {
    phrases
        .iter()
        .find(|phrase| text.contains(phrase.as_str()))
        .map(String::as_str)
}

/// The complete, immutable rule configuration consulted by the detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub categories: Vec<Category>,
    pub modifiers: Vec<Modifier>,
    pub protective_factors: Vec<ProtectiveFactor>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RuleSet {
    /// Load rule tables from a JSON file and validate them
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read crisis rules file: {}", path.display()))?;

        let rules: RuleSet =
            serde_json::from_str(&contents).context("Failed to parse crisis rules JSON")?;

        rules
            .validate()
            .with_context(|| format!("Invalid crisis rules in {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            categories = rules.categories.len(),
            modifiers = rules.modifiers.len(),
            protective_factors = rules.protective_factors.len(),
            "Loaded crisis rules"
        );

        Ok(rules)
    }

    /// Check the table invariants: non-empty lowercase phrases, weight in (0, 1],
    /// positive factors, unique names within each table.
    pub fn validate(&self) -> Result<(), CrisisError> {
        let mut seen = HashSet::new();
        for category in &self.categories {
            if !seen.insert(category.name.as_str()) {
                return Err(CrisisError::invalid_rule(&category.name, "duplicate category"));
            }
            if !(category.weight > 0.0 && category.weight <= 1.0) {
                return Err(CrisisError::invalid_rule(
                    &category.name,
                    format!("weight {} outside (0, 1]", category.weight),
                ));
            }
            validate_phrases(&category.name, &category.keywords)?;
        }

        let mut seen = HashSet::new();
        for modifier in &self.modifiers {
            if !seen.insert(modifier.name.as_str()) {
                return Err(CrisisError::invalid_rule(&modifier.name, "duplicate modifier"));
            }
            if !(modifier.factor > 0.0 && modifier.factor.is_finite()) {
                return Err(CrisisError::invalid_rule(
                    &modifier.name,
                    format!("factor {} must be positive", modifier.factor),
                ));
            }
            validate_phrases(&modifier.name, &modifier.patterns)?;
        }

        let mut seen = HashSet::new();
        for factor in &self.protective_factors {
            if !seen.insert(factor.name.as_str()) {
                return Err(CrisisError::invalid_rule(&factor.name, "duplicate protective factor"));
            }
            validate_phrases(&factor.name, &factor.patterns)?;
        }

        Ok(())
    }

    pub fn category(&self, name: &str) -> Result<&Category, CrisisError> {
        self.categories
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| CrisisError::UnknownCategory(name.to_string()))
    }

    pub fn modifier(&self, name: &str) -> Result<&Modifier, CrisisError> {
        self.modifiers
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| CrisisError::UnknownModifier(name.to_string()))
    }

    pub fn protective_factor(&self, name: &str) -> Result<&ProtectiveFactor, CrisisError> {
        self.protective_factors
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| CrisisError::UnknownProtectiveFactor(name.to_string()))
    }

    /// The default tables
    pub fn builtin() -> Self {
        Self {
            categories: vec![
                category(
                    "direct_harm",
                    &[
                        "kill myself",
                        "end my life",
                        "suicide",
                        "take my life",
                        "better off dead",
                        "not worth living",
                        "want to die",
                    ],
                    1.0,
                    SeverityLevel::Emergency,
                ),
                category(
                    "self_harm",
                    &[
                        "hurt myself",
                        "hurting myself",
                        "cut myself",
                        "self harm",
                        "cutting",
                        "burning myself",
                        "overdose",
                    ],
                    0.9,
                    SeverityLevel::Critical,
                ),
                category(
                    "harm_others",
                    &[
                        "kill someone",
                        "hurt someone",
                        "harm others",
                        "violent thoughts",
                        "homicidal",
                    ],
                    0.95,
                    SeverityLevel::Emergency,
                ),
                category(
                    "planning",
                    &[
                        "have a plan",
                        "bought pills",
                        "wrote a note",
                        "saying goodbye",
                        "giving away",
                        "method to",
                    ],
                    0.8,
                    SeverityLevel::Critical,
                ),
                category(
                    "hopelessness",
                    &[
                        "no hope",
                        "hopeless",
                        "no point",
                        "give up",
                        "cant go on",
                        "no future",
                        "trapped",
                    ],
                    0.5,
                    SeverityLevel::Warning,
                ),
                category(
                    "isolation",
                    &[
                        "all alone",
                        "no one cares",
                        "nobody understands",
                        "better without me",
                        "burden to everyone",
                    ],
                    0.4,
                    SeverityLevel::Concern,
                ),
            ],
            modifiers: vec![
                modifier(
                    "temporal_immediate",
                    &["right now", "tonight", "today", "going to"],
                    1.3,
                ),
                modifier(
                    "temporal_past",
                    &["used to", "in the past", "years ago", "when i was"],
                    0.7,
                ),
                modifier(
                    "conditional",
                    &["if i", "would if", "might if", "sometimes think", "sometimes i think"],
                    0.8,
                ),
                modifier(
                    "seeking_help",
                    &["need help", "please help", "what should i do", "talk to someone"],
                    0.6,
                ),
            ],
            protective_factors: vec![
                protective(
                    "future_orientation",
                    &["planning to", "looking forward", "next week", "goals"],
                ),
                protective(
                    "social_connection",
                    &["my friend", "family", "therapist", "support group"],
                ),
                protective(
                    "coping_mention",
                    &["meditation", "exercise", "therapy", "medication"],
                ),
                protective("ambivalence", &["but", "however", "part of me", "sometimes"]),
            ],
        }
    }
}

fn validate_phrases(owner: &str, phrases: &[String]) -> Result<(), CrisisError> {
    if phrases.is_empty() {
        return Err(CrisisError::invalid_rule(owner, "no phrases"));
    }
    for phrase in phrases {
        if phrase.trim().is_empty() {
            return Err(CrisisError::invalid_rule(owner, "empty phrase"));
        }
        if phrase.to_lowercase() != *phrase {
            return Err(CrisisError::invalid_rule(
                owner,
                format!("phrase '{}' is not lowercase", phrase),
            ));
        }
    }
    Ok(())
}

fn phrases(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn category(name: &str, keywords: &[&str], weight: f64, severity: SeverityLevel) -> Category {
    Category {
        name: name.to_string(),
        keywords: phrases(keywords),
        weight,
        severity,
    }
}

fn modifier(name: &str, patterns: &[&str], factor: f64) -> Modifier {
    Modifier {
        name: name.to_string(),
        patterns: phrases(patterns),
        factor,
    }
}

fn protective(name: &str, patterns: &[&str]) -> ProtectiveFactor {
    ProtectiveFactor {
        name: name.to_string(),
        patterns: phrases(patterns),
    }
}
