// Haven - HTTP Server Module
// Daemon mode exposing the crisis engine to chat handlers

mod feedback_handler;
mod handlers;
mod middleware;

pub use handlers::{create_router, health_check, metrics_endpoint, AppError};
pub use middleware::auth_middleware;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::trace::TraceLayer;

use crate::config::{Config, ServerConfig};
use crate::crisis::CrisisEngine;
use crate::metrics::{DetectionLog, DetectionMetrics};

/// Main server structure, shared by every handler
pub struct CrisisServer {
    /// Detector and resource directory
    engine: CrisisEngine,
    /// Persistence for detections and feedback
    detection_log: Arc<DetectionLog>,
    /// Prometheus counters
    metrics: Arc<DetectionMetrics>,
    /// Budget for a single detection
    detect_timeout: Duration,
    /// Server configuration
    config: ServerConfig,
    started_at: Instant,
}

impl CrisisServer {
    /// Create a new server
    pub fn new(
        config: &Config,
        engine: CrisisEngine,
        detection_log: DetectionLog,
        metrics: DetectionMetrics,
    ) -> Self {
        Self {
            engine,
            detection_log: Arc::new(detection_log),
            metrics: Arc::new(metrics),
            detect_timeout: Duration::from_millis(config.detection.detect_timeout_ms),
            config: config.server.clone(),
            started_at: Instant::now(),
        }
    }

    /// Start the HTTP server
    pub async fn serve(self) -> Result<()> {
        let addr: SocketAddr = self
            .config
            .bind_address
            .parse()
            .with_context(|| format!("Invalid bind address: {}", self.config.bind_address))?;

        let app_state = Arc::new(self);
        let app = create_router(app_state).layer(TraceLayer::new_for_http());

        tracing::info!("Starting Haven crisis server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Haven crisis server stopped");
        Ok(())
    }

    pub fn engine(&self) -> &CrisisEngine {
        &self.engine
    }

    pub fn detection_log(&self) -> &Arc<DetectionLog> {
        &self.detection_log
    }

    pub fn metrics(&self) -> &Arc<DetectionMetrics> {
        &self.metrics
    }

    pub fn detect_timeout(&self) -> Duration {
        self.detect_timeout
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
