// HTTP request handlers

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::feedback_handler::handle_feedback;
use super::middleware::auth_middleware;
use super::CrisisServer;
use crate::crisis::{
    needs_crisis_check, Assessment, CrisisResource, DetectionResult, EmergencyContact,
    SeverityLevel, UserContext, WellbeingCheck,
};
use crate::errors::CrisisError;

/// Create the main application router
pub fn create_router(server: Arc<CrisisServer>) -> Router {
    let protected = Router::new()
        .route("/v1/detect", post(handle_detect))
        .route("/v1/resources", get(list_resources))
        .route("/v1/check", post(handle_check))
        .route("/v1/detections/:id/feedback", post(handle_feedback))
        .route("/metrics", get(metrics_endpoint))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&server),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected)
        .with_state(server)
}

/// Request body for /v1/detect
#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    /// Raw user message
    pub message: String,
    #[serde(default)]
    pub context: Option<UserContext>,
    /// Used for per-user history and the detection log
    #[serde(default)]
    pub user_id: Option<String>,
    /// ISO country for the resource list; server default when absent
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub contacts: Vec<EmergencyContact>,
}

/// Response body for /v1/detect
#[derive(Debug, Serialize, Deserialize)]
pub struct DetectResponse {
    /// Present when the detection was logged
    pub detection_id: Option<String>,
    #[serde(flatten)]
    pub assessment: Assessment,
}

/// Handle POST /v1/detect - Score a chat message and build the reply
async fn handle_detect(
    State(server): State<Arc<CrisisServer>>,
    Json(request): Json<DetectRequest>,
) -> Result<Json<DetectResponse>, AppError> {
    if let Some(context) = &request.context {
        context.validate()?;
    }

    let engine = server.engine().clone();
    let message = request.message.clone();
    let context = request.context.clone();
    let country = request.country.clone();
    let contacts = request.contacts.clone();

    let task = tokio::task::spawn_blocking(move || {
        engine.assess(&message, context.as_ref(), country.as_deref(), &contacts)
    });

    let assessment = match tokio::time::timeout(server.detect_timeout(), task).await {
        Ok(Ok(assessment)) => assessment,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Detection task failed, using fallback response");
            server.metrics().observe_fallback();
            server.engine().fallback(request.country.as_deref())
        }
        Err(_) => {
            tracing::warn!(
                timeout_ms = server.detect_timeout().as_millis() as u64,
                "Detection timed out, using fallback response"
            );
            server.metrics().observe_fallback();
            server.engine().fallback(request.country.as_deref())
        }
    };

    let mut detection_id = None;
    if let Some(detection) = &assessment.detection {
        server.metrics().observe(detection);

        if detection.level > SeverityLevel::None || detection.immediate_risk {
            detection_id = persist_detection(
                &server,
                request.user_id,
                request.message,
                detection.clone(),
                assessment.reply.clone().unwrap_or_default(),
            )
            .await;
        }
    }

    Ok(Json(DetectResponse {
        detection_id,
        assessment,
    }))
}

/// Write a detection to the log off the async workers.
///
/// A failed write never costs the user the reply: it is logged and counted,
/// and the response goes out without a detection id.
async fn persist_detection(
    server: &Arc<CrisisServer>,
    user_id: Option<String>,
    message: String,
    detection: DetectionResult,
    reply: String,
) -> Option<String> {
    let log = Arc::clone(server.detection_log());
    let task = tokio::task::spawn_blocking(move || {
        log.record(user_id.as_deref(), &message, &detection, &reply)
    });

    match task.await {
        Ok(Ok(record)) => Some(record.id),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Failed to record detection, replying without an id");
            server.metrics().observe_log_failure();
            None
        }
        Err(e) => {
            tracing::error!(error = %e, "Detection log task failed, replying without an id");
            server.metrics().observe_log_failure();
            None
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResourceQuery {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub specialty: Option<String>,
}

/// Handle GET /v1/resources - Crisis resources for a country
async fn list_resources(
    State(server): State<Arc<CrisisServer>>,
    Query(query): Query<ResourceQuery>,
) -> Json<Vec<CrisisResource>> {
    let engine = server.engine();
    let country = query
        .country
        .as_deref()
        .unwrap_or_else(|| engine.default_country());

    let resources = match query.specialty.as_deref() {
        Some(specialty) => engine.directory().by_specialty(country, specialty),
        None => engine.directory().for_country(country),
    };

    Json(resources.into_iter().cloned().collect())
}

/// Request body for /v1/check
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub context: UserContext,
}

/// Handle POST /v1/check - Does this user need a crisis check-in?
async fn handle_check(
    State(server): State<Arc<CrisisServer>>,
    Json(request): Json<CheckRequest>,
) -> Result<Json<WellbeingCheck>, AppError> {
    request.context.validate()?;

    let recent_detections = match request.user_id.as_deref() {
        Some(user_id) => {
            let since = Utc::now() - chrono::Duration::days(7);
            server.detection_log().count_since(user_id, since)
        }
        None => request.context.recent_crisis_count as usize,
    };

    Ok(Json(needs_crisis_check(recent_detections, &request.context)))
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub uptime_seconds: u64,
    pub detections_logged: usize,
    pub sentiment: String,
}

/// Handle GET /health - Health check endpoint
pub async fn health_check(State(server): State<Arc<CrisisServer>>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
        uptime_seconds: server.uptime().as_secs(),
        detections_logged: server.detection_log().len(),
        sentiment: server.engine().detector().sentiment_name().to_string(),
    })
}

/// Handle GET /metrics - Prometheus metrics endpoint
pub async fn metrics_endpoint(
    State(server): State<Arc<CrisisServer>>,
) -> Result<Response, AppError> {
    let body = server.metrics().render()?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

/// Application error wrapper for proper HTTP error responses
pub struct AppError(anyhow::Error);

impl AppError {
    fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<CrisisError>() {
            Some(CrisisError::UnknownDetection(_)) => StatusCode::NOT_FOUND,
            Some(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, "Request rejected");
        }

        let error_type = if status.is_server_error() {
            "api_error"
        } else {
            "invalid_request_error"
        };
        let body = serde_json::json!({
            "error": {
                "message": self.0.to_string(),
                "type": error_type
            }
        });

        (status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

