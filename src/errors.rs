// Error types and user-friendly error messages
//
// `CrisisError` covers the scoring engine's own failure modes (rule table
// configuration bugs, bad caller input). The helpers below turn IO and config
// failures into actionable text for the CLI.

use anyhow::{Context, Result};
use std::fmt;
use thiserror::Error;

/// Errors raised by the crisis engine and its collaborators
#[derive(Debug, Error, PartialEq)]
pub enum CrisisError {
    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    #[error("unknown modifier '{0}'")]
    UnknownModifier(String),

    #[error("unknown protective factor '{0}'")]
    UnknownProtectiveFactor(String),

    #[error("invalid rule '{name}': {reason}")]
    InvalidRule { name: String, reason: String },

    #[error("invalid user context: {0}")]
    InvalidContext(String),

    #[error("unknown detection '{0}'")]
    UnknownDetection(String),
}

impl CrisisError {
    pub(crate) fn invalid_rule(name: &str, reason: impl Into<String>) -> Self {
        CrisisError::InvalidRule {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the error was caused by caller input rather than server state
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CrisisError::InvalidContext(_) | CrisisError::UnknownDetection(_)
        )
    }
}

/// Wrap an error with user-friendly context
pub trait UserFriendlyError {
    /// Add user-friendly context to this error
    fn user_context(self, message: &str) -> Self;

    /// Add user-friendly context with a suggestion
    fn user_context_with_suggestion(self, problem: &str, suggestion: &str) -> Self;
}

impl<T> UserFriendlyError for Result<T> {
    fn user_context(self, message: &str) -> Self {
        self.with_context(|| message.to_string())
    }

    fn user_context_with_suggestion(self, problem: &str, suggestion: &str) -> Self {
        self.with_context(|| wrap_error_with_suggestion(problem, suggestion))
    }
}

/// Format a config parse error with helpful suggestions
pub fn config_parse_error(path: &str, error: &str) -> String {
    format!(
        "Failed to parse config file {}\n\n\
        \x1b[1;33mError:\x1b[0m {}\n\n\
        \x1b[1;32mTry:\x1b[0m\n\
        1. Check config file syntax:\n\
           \x1b[36mcat {}\x1b[0m\n\n\
        2. Move the file aside to run with defaults:\n\
           \x1b[36mmv {} {}.backup\x1b[0m\n\n\
        3. Common mistakes:\n\
           • Missing quotes around strings\n\
           • Section names other than [detection], [server], [resources], [storage]\n\
           • Numbers written as strings (detect_timeout_ms = \"250\")",
        path, error, path, path, path
    )
}

/// Format a rules file error with helpful suggestions
pub fn rules_file_error(path: &str, error: &str) -> String {
    format!(
        "Failed to load crisis rules from {}\n\n\
        \x1b[1;33mError:\x1b[0m {}\n\n\
        \x1b[1;33mPossible causes:\x1b[0m\n\
        • File is not valid JSON\n\
        • A keyword or pattern is empty or not lowercase\n\
        • A category weight is outside (0, 1] or a modifier factor is not positive\n\n\
        \x1b[1;32mTry:\x1b[0m\n\
        1. Remove rules_path from [detection] to use the built-in tables\n\
        2. Export the built-in tables as a starting point:\n\
           \x1b[36mhaven rules > rules.json\x1b[0m",
        path, error
    )
}

/// Format a file not found error with helpful suggestions
pub fn file_not_found_error(path: &str, description: &str) -> String {
    format!(
        "{} not found: {}\n\n\
        \x1b[1;33mPossible causes:\x1b[0m\n\
        • File has been deleted\n\
        • Wrong path specified\n\n\
        \x1b[1;32mTry:\x1b[0m\n\
        1. Check if file exists:\n\
           \x1b[36mls -la {}\x1b[0m",
        description, path, path
    )
}

/// Wrap a generic error with suggestions
pub fn wrap_error_with_suggestion(error: impl fmt::Display, suggestion: &str) -> String {
    format!(
        "{}\n\n\
        \x1b[1;33mSuggestion:\x1b[0m {}",
        error, suggestion
    )
}
