// Crisis detector
//
// Scores a message against the rule tables, adjusts for context and user
// history, and thresholds the result into a severity level.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use super::context::UserContext;
use super::level::{RecommendedAction, SeverityLevel};
use super::rules::{RuleSet, BUILTIN_RULES};
use super::sentiment::{LexicalSentiment, NoSentiment, SentimentAnalyzer};
use crate::errors::CrisisError;

/// Phrases that flag temporally urgent language, independent of the rule tables
pub const IMMEDIACY_PHRASES: &[&str] = &["right now", "tonight", "about to"];

/// Score discount per matched protective factor
const PROTECTIVE_DISCOUNT: f64 = 0.1;

const CONFIDENCE_CAP: f64 = 0.95;

/// Outcome of scoring one message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Reported severity
    pub level: SeverityLevel,
    /// Highest severity among the categories that fired
    pub category_level: SeverityLevel,
    /// In [0, 0.95]
    pub confidence: f64,
    /// Tags of every category, modifier and protective factor that fired, in table order
    pub factors: Vec<String>,
    pub immediate_risk: bool,
    pub recommended_action: RecommendedAction,
    /// Final score after modifiers, history and sentiment
    pub risk_score: f64,
    /// Net multiplier applied to the category weights
    pub context_modifier: f64,
}

impl DetectionResult {
    pub fn has_factor(&self, tag: &str) -> bool {
        self.factors.iter().any(|f| f == tag)
    }
}

/// Accumulators for a single category scan
struct CategoryScan {
    score: f64,
    level: SeverityLevel,
}

#[derive(Clone)]
pub struct CrisisDetector {
    rules: Arc<RuleSet>,
    sentiment: Arc<dyn SentimentAnalyzer>,
}

impl Default for CrisisDetector {
    fn default() -> Self {
        Self::builtin(true)
    }
}

impl std::fmt::Debug for CrisisDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrisisDetector")
            .field("categories", &self.rules.categories.len())
            .field("modifiers", &self.rules.modifiers.len())
            .field("protective_factors", &self.rules.protective_factors.len())
            .field("sentiment", &self.sentiment.name())
            .finish()
    }
}

impl CrisisDetector {
    /// Build a detector over validated rule tables
    pub fn new(rules: RuleSet, sentiment: Arc<dyn SentimentAnalyzer>) -> Result<Self, CrisisError> {
        rules.validate()?;
        Ok(Self {
            rules: Arc::new(rules),
            sentiment,
        })
    }

    /// Load rule tables from a JSON file
    pub fn load_from_file(path: &Path, sentiment: Arc<dyn SentimentAnalyzer>) -> Result<Self> {
        let rules = RuleSet::load_from_file(path)?;
        Self::new(rules, sentiment).context("Failed to build crisis detector")
    }

    /// Built-in rules, sentiment step on or off
    pub fn builtin(sentiment_enabled: bool) -> Self {
        let sentiment: Arc<dyn SentimentAnalyzer> = if sentiment_enabled {
            Arc::new(LexicalSentiment)
        } else {
            Arc::new(NoSentiment)
        };
        Self {
            rules: Arc::new(BUILTIN_RULES.clone()),
            sentiment,
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn sentiment_name(&self) -> &str {
        self.sentiment.name()
    }

    /// Score a message. Total over all inputs, including the empty string.
    pub fn detect(&self, message: &str, context: Option<&UserContext>) -> DetectionResult {
        let message_lower = message.to_lowercase();
        let mut factors = Vec::new();

        let scan = self.scan_categories(&message_lower, &mut factors);
        let mut context_modifier = self.scan_modifiers(&message_lower, &mut factors);
        context_modifier *= self.protective_discount(&message_lower, &mut factors);

        if let Some(context) = context {
            context_modifier = context.adjust(context_modifier);
        }

        let mut risk_score = scan.score * context_modifier;
        if risk_score > 0.0 {
            risk_score *= self.sentiment.factor(message);
        }

        let mut level = SeverityLevel::from_score(risk_score);
        // When the net context modifier does not dampen, the matched category sets a floor.
        // Amplifiers can outweigh dampeners that also fired.
        if context_modifier >= 1.0 && scan.level > level {
            level = scan.level;
        }

        let immediate_risk = IMMEDIACY_PHRASES
            .iter()
            .any(|phrase| message_lower.contains(phrase));
        let confidence = (risk_score / 2.0).clamp(0.0, CONFIDENCE_CAP);
        let recommended_action = RecommendedAction::for_level(level, immediate_risk);

        if level == SeverityLevel::Emergency || immediate_risk {
            tracing::warn!(
                level = %level,
                risk_score,
                immediate_risk,
                factors = ?factors,
                "Crisis detected"
            );
        } else if level > SeverityLevel::None {
            tracing::info!(level = %level, risk_score, "Mental-state indicators detected");
        }

        DetectionResult {
            level,
            category_level: scan.level,
            confidence,
            factors,
            immediate_risk,
            recommended_action,
            risk_score,
            context_modifier,
        }
    }

    /// Sum the weight of every category with at least one matching keyword
    fn scan_categories(&self, text: &str, factors: &mut Vec<String>) -> CategoryScan {
        let mut scan = CategoryScan {
            score: 0.0,
            level: SeverityLevel::None,
        };

        for category in &self.rules.categories {
            if let Some(keyword) = category.first_match(text) {
                tracing::debug!(category = %category.name, keyword, "Category matched");
                scan.score += category.weight;
                scan.level = scan.level.max(category.severity);
                factors.push(category.name.clone());
            }
        }

        scan
    }

    fn scan_modifiers(&self, text: &str, factors: &mut Vec<String>) -> f64 {
        let mut modifier = 1.0;
        for entry in &self.rules.modifiers {
            if let Some(pattern) = entry.first_match(text) {
                tracing::debug!(modifier = %entry.name, pattern, "Modifier matched");
                modifier *= entry.factor;
                factors.push(entry.tag());
            }
        }
        modifier
    }

    /// Linear discount per matched factor, clamped at zero
    fn protective_discount(&self, text: &str, factors: &mut Vec<String>) -> f64 {
        let mut count = 0usize;
        for factor in &self.rules.protective_factors {
            if let Some(pattern) = factor.first_match(text) {
                tracing::debug!(factor = %factor.name, pattern, "Protective factor matched");
                count += 1;
                factors.push(factor.tag());
            }
        }

        if count == 0 {
            return 1.0;
        }
        (1.0 - PROTECTIVE_DISCOUNT * count as f64).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crisis::context::MoodEntry;
    use crate::crisis::rules::ProtectiveFactor;

    fn detector() -> CrisisDetector {
        CrisisDetector::builtin(true)
    }

    #[test]
    fn test_empty_message() {
        let result = detector().detect("", None);
        assert_eq!(result.risk_score, 0.0);
        assert_eq!(result.level, SeverityLevel::None);
        assert_eq!(result.category_level, SeverityLevel::None);
        assert_eq!(result.confidence, 0.0);
        assert!(result.factors.is_empty());
        assert_eq!(
            result.recommended_action,
            RecommendedAction::ContinueConversation
        );
    }

    #[test]
    fn test_direct_harm_is_emergency() {
        let result = detector().detect("I want to kill myself", None);
        assert!(result.has_factor("direct_harm"));
        assert_eq!(result.level, SeverityLevel::Emergency);
        assert_eq!(
            result.recommended_action,
            RecommendedAction::ImmediateIntervention
        );
        assert_eq!(result.risk_score, 1.0);
    }

    #[test]
    fn test_case_insensitive() {
        let upper = detector().detect("SUICIDE", None);
        let mixed = detector().detect("SuIcIdE", None);
        assert!(upper.has_factor("direct_harm"));
        assert_eq!(upper, mixed);
    }

    #[test]
    fn test_category_weight_not_double_counted() {
        let result = detector().detect("hopeless, no point, trapped", None);
        assert_eq!(result.factors, vec!["hopelessness".to_string()]);
        assert_eq!(result.risk_score, 0.5);
    }

    #[test]
    fn test_hopeless_exam_is_warning_boundary() {
        let result = detector().detect("I'm feeling a bit hopeless about my exam tomorrow", None);
        assert_eq!(result.factors, vec!["hopelessness".to_string()]);
        assert_eq!(result.risk_score, 0.5);
        assert_eq!(result.level, SeverityLevel::Warning);
        assert_eq!(result.recommended_action, RecommendedAction::ProvideResources);
    }

    #[test]
    fn test_ambivalent_self_harm_is_discounted() {
        let message = "sometimes I think about hurting myself but I would never do it, \
                       I have my therapist and family";
        let result = detector().detect(message, None);

        assert!(result.has_factor("self_harm"));
        assert!(result.has_factor("modifier_conditional"));
        assert!(result.has_factor("protective_social_connection"));
        assert!(result.has_factor("protective_ambivalence"));
        assert!(result.risk_score < 0.9);
        // 0.9 * 0.8 * (1 - 0.2)
        assert!((result.risk_score - 0.576).abs() < 1e-9);
        assert_eq!(result.level, SeverityLevel::Warning);
        assert_eq!(result.category_level, SeverityLevel::Critical);
    }

    #[test]
    fn test_modifiers_without_category_stay_zero() {
        let result = detector().detect("I'm going to the park today", None);
        assert!(result.has_factor("modifier_temporal_immediate"));
        assert_eq!(result.risk_score, 0.0);
        assert_eq!(result.level, SeverityLevel::None);
    }

    #[test]
    fn test_immediate_risk() {
        let urgent = detector().detect("I am going to do it tonight", None);
        assert!(urgent.immediate_risk);
        assert_eq!(
            urgent.recommended_action,
            RecommendedAction::ImmediateIntervention
        );

        let past = detector().detect("I used to think about it years ago", None);
        assert!(!past.immediate_risk);
        assert!(past.has_factor("modifier_temporal_past"));
    }

    #[test]
    fn test_past_tense_lowers_level_below_category() {
        let result = detector().detect("I used to want to die, years ago", None);
        assert_eq!(result.category_level, SeverityLevel::Emergency);
        assert!((result.risk_score - 0.7).abs() < 1e-9);
        assert_eq!(result.level, SeverityLevel::Warning);
    }

    #[test]
    fn test_amplified_scores_reach_emergency() {
        let result = detector().detect("I have a plan and I'm going to overdose", None);
        // (0.9 + 0.8) * 1.3
        assert!((result.risk_score - 2.21).abs() < 1e-9);
        assert_eq!(result.level, SeverityLevel::Emergency);
        assert_eq!(result.confidence, 0.95);
    }

    #[test]
    fn test_monotonic_in_emergency_keyword() {
        let base = detector().detect("", None);
        let with_keyword = detector().detect("suicide", None);
        assert!(with_keyword.risk_score > base.risk_score);
    }

    #[test]
    fn test_deterministic() {
        let context = UserContext {
            recent_crisis_count: 1,
            mood_history: vec![MoodEntry::new(3)],
            ..Default::default()
        };
        let message = "Everything is hopeless and I hate it, I'm all alone";
        let first = detector().detect(message, Some(&context));
        let second = detector().detect(message, Some(&context));
        assert_eq!(first, second);
        assert_eq!(first.risk_score.to_bits(), second.risk_score.to_bits());
    }

    #[test]
    fn test_user_context_adjusts_score() {
        let context = UserContext {
            has_safety_plan: true,
            support_network_size: 4,
            mood_history: vec![MoodEntry::new(7), MoodEntry::new(8), MoodEntry::new(6)],
            ..Default::default()
        };
        let without = detector().detect("I feel hopeless", None);
        let with = detector().detect("I feel hopeless", Some(&context));
        assert!(with.risk_score < without.risk_score);
        assert_eq!(with.level, SeverityLevel::Concern);
    }

    #[test]
    fn test_sentiment_step_is_pluggable() {
        let message = "I feel hopeless, this is awful and terrible";
        let lexical = CrisisDetector::builtin(true).detect(message, None);
        let plain = CrisisDetector::builtin(false).detect(message, None);

        assert_eq!(plain.risk_score, 0.5);
        assert!((lexical.risk_score - 0.6).abs() < 1e-9);
        assert_eq!(lexical.factors, plain.factors);

        // Nothing to nudge when the base score is zero
        let calm = CrisisDetector::builtin(true).detect("awful weather today", None);
        assert_eq!(calm.risk_score, 0.0);
    }

    #[test]
    fn test_protective_discount_clamps_at_zero() {
        let mut rules = RuleSet::builtin();
        rules.protective_factors = (0..12)
            .map(|i| ProtectiveFactor {
                name: format!("f{}", i),
                patterns: vec![format!("word{}", i)],
            })
            .collect();
        let detector = CrisisDetector::new(rules, Arc::new(NoSentiment)).unwrap();

        let message = format!(
            "suicide {}",
            (0..12).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ")
        );
        let result = detector.detect(&message, None);
        assert_eq!(result.context_modifier, 0.0);
        assert_eq!(result.risk_score, 0.0);
        assert_eq!(result.level, SeverityLevel::None);
        assert!(result.confidence >= 0.0);
    }

    #[test]
    fn test_category_floor_follows_net_modifier() {
        let context = UserContext {
            recent_crisis_count: 1,
            ..Default::default()
        };
        let result =
            CrisisDetector::builtin(false).detect("I used to want to die today", Some(&context));

        assert!(result.has_factor("modifier_temporal_past"));
        assert!(result.has_factor("modifier_temporal_immediate"));
        // 1.3 * 0.7 * 1.2
        assert!((result.context_modifier - 1.092).abs() < 1e-9);
        assert_eq!(SeverityLevel::from_score(result.risk_score), SeverityLevel::Critical);
        assert_eq!(result.level, SeverityLevel::Emergency);

        let without_history =
            CrisisDetector::builtin(false).detect("I used to want to die today", None);
        assert!(without_history.context_modifier < 1.0);
        assert_eq!(without_history.level, SeverityLevel::Warning);
    }

    #[test]
    fn test_new_rejects_invalid_rules() {
        let mut rules = RuleSet::builtin();
        rules.categories[0].weight = 0.0;
        assert!(CrisisDetector::new(rules, Arc::new(NoSentiment)).is_err());
    }
}
