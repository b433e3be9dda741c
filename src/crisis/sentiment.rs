// Optional sentiment nudge for the risk score
//
// The detector holds one `SentimentAnalyzer`, chosen at construction time.
// `NoSentiment` leaves scores untouched; `LexicalSentiment` counts polarity words.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Debug;

static WORD_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\p{L}\p{N}']+").expect("word regex is valid")
});

const NEGATIVE_WORDS: &[&str] = &["hate", "horrible", "terrible", "awful", "worst", "unbearable"];
const POSITIVE_WORDS: &[&str] = &["hope", "better", "improve", "help", "trying", "grateful"];

/// Factors applied when one polarity outweighs the other (1 +/- 0.2)
const NEGATIVE_FACTOR: f64 = 1.2;
const POSITIVE_FACTOR: f64 = 0.8;

/// Produces a multiplicative factor for an already non-zero risk score
pub trait SentimentAnalyzer: Send + Sync + Debug {
    /// 1.0 means no change
    fn factor(&self, message: &str) -> f64;

    fn name(&self) -> &str;
}

/// Skips the sentiment step
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSentiment;

impl SentimentAnalyzer for NoSentiment {
    fn factor(&self, _message: &str) -> f64 {
        1.0
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Word-count polarity over a fixed lexicon
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalSentiment;

impl LexicalSentiment {
    /// (negative, positive) token counts
    pub fn polarity_counts(message: &str) -> (usize, usize) {
        let lower = message.to_lowercase();
        let mut negative = 0;
        let mut positive = 0;
        for token in WORD_REGEX.find_iter(&lower).map(|m| m.as_str()) {
            if NEGATIVE_WORDS.contains(&token) {
                negative += 1;
            } else if POSITIVE_WORDS.contains(&token) {
                positive += 1;
            }
        }
        (negative, positive)
    }
}

impl SentimentAnalyzer for LexicalSentiment {
    fn factor(&self, message: &str) -> f64 {
        let (negative, positive) = Self::polarity_counts(message);
        if negative > positive {
            NEGATIVE_FACTOR
        } else if positive > negative {
            POSITIVE_FACTOR
        } else {
            1.0
        }
    }

    fn name(&self) -> &str {
        "lexical"
    }
}
