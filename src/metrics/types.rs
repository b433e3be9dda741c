// Detection log data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::crisis::{DetectionResult, SeverityLevel};

/// User verdict on a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    Helpful,
    NotHelpful,
    Inappropriate,
}

/// One persisted detection. The message itself is stored only as a hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub id: String,
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub message_hash: String,
    pub level: SeverityLevel,
    pub confidence: f64,
    pub factors: Vec<String>,
    pub response_provided: String,
    #[serde(default)]
    pub user_feedback: Option<Feedback>,
    #[serde(default)]
    pub false_positive: bool,
}

impl DetectionRecord {
    pub fn new(
        user_id: Option<String>,
        message_hash: String,
        detection: &DetectionResult,
        response_provided: String,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            timestamp: Utc::now(),
            message_hash,
            level: detection.level,
            confidence: detection.confidence,
            factors: detection.factors.clone(),
            response_provided,
            user_feedback: None,
            false_positive: false,
        }
    }
}

/// Feedback appended after the fact, keyed by detection id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub detection_id: String,
    pub timestamp: DateTime<Utc>,
    pub feedback: Feedback,
    pub false_positive: bool,
}

/// A line of the detection log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogEntry {
    Detection(DetectionRecord),
    Feedback(FeedbackRecord),
}

/// Aggregate counts over the log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogSummary {
    pub total: usize,
    pub by_level: BTreeMap<SeverityLevel, usize>,
    pub with_feedback: usize,
    pub false_positives: usize,
}
