// Middleware for API key authentication

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::CrisisServer;

/// Accepts `Authorization: Bearer <key>` or `x-api-key: <key>` when auth is enabled
pub async fn auth_middleware(
    State(server): State<Arc<CrisisServer>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let config = server.config();
    if !config.auth_enabled {
        return Ok(next.run(request).await);
    }

    let headers = request.headers();
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .or_else(|| headers.get("x-api-key").and_then(|v| v.to_str().ok()))
        .map(|key| config.api_keys.iter().any(|k| k == key))
        .unwrap_or(false);

    if !authorized {
        tracing::warn!(path = %request.uri().path(), "Rejected request without valid API key");
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}
