// Append-only detection log (JSON lines) with an in-memory index

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fs2::FileExt;
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use super::types::{DetectionRecord, Feedback, FeedbackRecord, LogEntry, LogSummary};
use crate::crisis::DetectionResult;
use crate::errors::CrisisError;

const LOG_FILE: &str = "detections.jsonl";

pub struct DetectionLog {
    path: PathBuf,
    index: DashMap<String, DetectionRecord>,
}

impl DetectionLog {
    /// Open (or create) the log in `dir` and replay it into the index
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create data directory: {}", dir.display()))?;

        let log = Self {
            path: dir.join(LOG_FILE),
            index: DashMap::new(),
        };
        log.replay()?;

        tracing::info!(
            path = %log.path.display(),
            records = log.index.len(),
            "Opened detection log"
        );
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// SHA-256 of the message, hex encoded
    pub fn hash_message(message: &str) -> String {
        format!("{:x}", Sha256::digest(message.as_bytes()))
    }

    /// Persist a detection and return the stored record
    pub fn record(
        &self,
        user_id: Option<&str>,
        message: &str,
        detection: &DetectionResult,
        response_provided: &str,
    ) -> Result<DetectionRecord> {
        let record = DetectionRecord::new(
            user_id.map(str::to_string),
            Self::hash_message(message),
            detection,
            response_provided.to_string(),
        );
        self.append(&LogEntry::Detection(record.clone()))?;
        self.index.insert(record.id.clone(), record.clone());

        tracing::debug!(
            detection_id = %record.id,
            message_hash = %record.message_hash,
            level = %record.level,
            "Detection recorded"
        );
        Ok(record)
    }

    /// Attach user feedback to an existing detection
    pub fn record_feedback(
        &self,
        detection_id: &str,
        feedback: Feedback,
        false_positive: bool,
    ) -> Result<DetectionRecord> {
        if !self.index.contains_key(detection_id) {
            return Err(CrisisError::UnknownDetection(detection_id.to_string()).into());
        }

        let entry = FeedbackRecord {
            detection_id: detection_id.to_string(),
            timestamp: Utc::now(),
            feedback,
            false_positive,
        };
        self.append(&LogEntry::Feedback(entry.clone()))?;

        let mut record = self
            .index
            .get_mut(detection_id)
            .ok_or_else(|| CrisisError::UnknownDetection(detection_id.to_string()))?;
        apply_feedback(&mut record, &entry);

        tracing::info!(detection_id, ?feedback, false_positive, "Detection feedback recorded");
        Ok(record.clone())
    }

    pub fn get(&self, detection_id: &str) -> Option<DetectionRecord> {
        self.index.get(detection_id).map(|r| r.clone())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Detections for a user at or after `since`
    pub fn count_since(&self, user_id: &str, since: DateTime<Utc>) -> usize {
        self.index
            .iter()
            .filter(|r| r.user_id.as_deref() == Some(user_id) && r.timestamp >= since)
            .count()
    }

    pub fn summary(&self) -> LogSummary {
        let mut summary = LogSummary::default();
        for record in self.index.iter() {
            summary.total += 1;
            *summary.by_level.entry(record.level).or_insert(0) += 1;
            if record.user_feedback.is_some() {
                summary.with_feedback += 1;
            }
            if record.false_positive {
                summary.false_positives += 1;
            }
        }
        summary
    }

    fn append(&self, entry: &LogEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open detection log: {}", self.path.display()))?;

        // Other processes may share the data directory
        file.lock_exclusive()?;
        let written = file.write_all(line.as_bytes());
        file.unlock()?;
        written.with_context(|| format!("Failed to write detection log: {}", self.path.display()))
    }

    fn replay(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }

        let file = fs::File::open(&self.path)
            .with_context(|| format!("Failed to read detection log: {}", self.path.display()))?;

        for (number, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LogEntry>(&line) {
                Ok(LogEntry::Detection(record)) => {
                    self.index.insert(record.id.clone(), record);
                }
                Ok(LogEntry::Feedback(entry)) => {
                    if let Some(mut record) = self.index.get_mut(&entry.detection_id) {
                        apply_feedback(&mut record, &entry);
                    }
                }
                Err(e) => {
                    tracing::warn!(line = number + 1, error = %e, "Skipping malformed log line");
                }
            }
        }
        Ok(())
    }
}

fn apply_feedback(record: &mut DetectionRecord, entry: &FeedbackRecord) {
    record.user_feedback = Some(entry.feedback);
    record.false_positive = entry.false_positive;
}
