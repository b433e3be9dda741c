// Feedback endpoint handler for detection accuracy
//
// Lets clients mark a logged detection as helpful, unhelpful or a false positive.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::handlers::AppError;
use super::CrisisServer;
use crate::metrics::Feedback;

/// Request body for /v1/detections/:id/feedback
#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub feedback: Feedback,
    #[serde(default)]
    pub false_positive: bool,
}

/// Response body for /v1/detections/:id/feedback
#[derive(Debug, Serialize, Deserialize)]
pub struct FeedbackResponse {
    /// Status: "recorded"
    pub status: String,
    pub message: String,
}

/// Handle POST /v1/detections/:id/feedback - Record feedback on a detection
pub async fn handle_feedback(
    State(server): State<Arc<CrisisServer>>,
    Path(detection_id): Path<String>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>, AppError> {
    info!(
        detection_id = %detection_id,
        feedback = ?request.feedback,
        false_positive = request.false_positive,
        "Received detection feedback"
    );

    server
        .detection_log()
        .record_feedback(&detection_id, request.feedback, request.false_positive)?;

    Ok(Json(FeedbackResponse {
        status: "recorded".to_string(),
        message: "Feedback recorded. Thank you for helping us improve.".to_string(),
    }))
}
