// Metrics module
// Detection log (persistence) and Prometheus counters

mod logger;
mod exporter;
mod types;

pub use exporter::DetectionMetrics;
pub use logger::DetectionLog;
pub use types::{DetectionRecord, Feedback, FeedbackRecord, LogEntry, LogSummary};
