// Integration tests for the HTTP server

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use haven::{
    config::Config,
    crisis::{CrisisDetector, CrisisEngine, ResourceDirectory, RuleSet, SentimentAnalyzer},
    metrics::{DetectionLog, DetectionMetrics},
    server::{create_router, CrisisServer},
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

/// Sentiment step that stalls, to push detection past its budget
#[derive(Debug)]
struct StalledSentiment;

impl SentimentAnalyzer for StalledSentiment {
    fn factor(&self, _message: &str) -> f64 {
        std::thread::sleep(Duration::from_millis(300));
        1.0
    }

    fn name(&self) -> &str {
        "stalled"
    }
}

/// Sentiment step that crashes the detection task
#[derive(Debug)]
struct BrokenSentiment;

impl SentimentAnalyzer for BrokenSentiment {
    fn factor(&self, _message: &str) -> f64 {
        panic!("sentiment backend unavailable");
    }

    fn name(&self) -> &str {
        "broken"
    }
}

fn test_server(config: &Config, dir: &TempDir) -> Arc<CrisisServer> {
    server_with_engine(config, dir, CrisisEngine::default())
}

fn server_with_engine(config: &Config, dir: &TempDir, engine: CrisisEngine) -> Arc<CrisisServer> {
    let log = DetectionLog::open(dir.path()).expect("Failed to open detection log");
    let metrics = DetectionMetrics::new().expect("Failed to create metrics");
    Arc::new(CrisisServer::new(config, engine, log, metrics))
}

fn engine_with_sentiment(sentiment: Arc<dyn SentimentAnalyzer>) -> CrisisEngine {
    let detector = CrisisDetector::new(RuleSet::builtin(), sentiment).unwrap();
    CrisisEngine::new(detector, ResourceDirectory::builtin(), "US")
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(server: &Arc<CrisisServer>, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = create_router(Arc::clone(server))
        .oneshot(request)
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn send_json(server: &Arc<CrisisServer>, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(server, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_health_check() {
    let dir = TempDir::new().unwrap();
    let server = test_server(&Config::default(), &dir);

    let (status, body) = send_json(&server, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["sentiment"], "lexical");
    assert_eq!(body["detections_logged"], 0);
}

#[tokio::test]
async fn test_detect_emergency_is_logged() {
    let dir = TempDir::new().unwrap();
    let server = test_server(&Config::default(), &dir);

    let (status, body) = send_json(
        &server,
        post_json(
            "/v1/detect",
            json!({"message": "I want to kill myself", "user_id": "u1"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["detection"]["level"], "emergency");
    assert_eq!(body["recommended_action"], "immediate_intervention");
    assert_eq!(body["fallback"], false);
    assert!(body["reply"].as_str().unwrap().contains("988"));

    let detection_id = body["detection_id"].as_str().unwrap();
    let record = server.detection_log().get(detection_id).unwrap();
    assert_eq!(record.user_id.as_deref(), Some("u1"));
    assert_eq!(server.detection_log().len(), 1);
}

#[tokio::test]
async fn test_detect_calm_message_is_not_logged() {
    let dir = TempDir::new().unwrap();
    let server = test_server(&Config::default(), &dir);

    let (status, body) = send_json(
        &server,
        post_json("/v1/detect", json!({"message": "Had a lovely walk today"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["detection"]["level"], "none");
    assert_eq!(body["recommended_action"], "continue_conversation");
    assert!(body["detection_id"].is_null());
    assert!(body["reply"].is_null());
    assert!(server.detection_log().is_empty());
}

#[tokio::test]
async fn test_detect_uses_requested_country() {
    let dir = TempDir::new().unwrap();
    let server = test_server(&Config::default(), &dir);

    let (_, body) = send_json(
        &server,
        post_json(
            "/v1/detect",
            json!({"message": "I feel hopeless", "country": "GB"}),
        ),
    )
    .await;

    let reply = body["reply"].as_str().unwrap();
    assert!(reply.contains("Samaritans"));
    assert!(!reply.contains("988 Suicide"));
}

#[tokio::test]
async fn test_detect_rejects_invalid_context() {
    let dir = TempDir::new().unwrap();
    let server = test_server(&Config::default(), &dir);

    let (status, body) = send_json(
        &server,
        post_json(
            "/v1/detect",
            json!({"message": "I feel hopeless", "context": {"mood_history": [{"score": 11}]}}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "invalid_request_error");
}

#[tokio::test]
async fn test_feedback_round_trip() {
    let dir = TempDir::new().unwrap();
    let server = test_server(&Config::default(), &dir);

    let (_, body) = send_json(
        &server,
        post_json("/v1/detect", json!({"message": "I feel hopeless"})),
    )
    .await;
    let detection_id = body["detection_id"].as_str().unwrap().to_string();

    let (status, body) = send_json(
        &server,
        post_json(
            &format!("/v1/detections/{}/feedback", detection_id),
            json!({"feedback": "not_helpful", "false_positive": true}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "recorded");

    let record = server.detection_log().get(&detection_id).unwrap();
    assert!(record.false_positive);
    assert_eq!(server.detection_log().summary().false_positives, 1);
}

#[tokio::test]
async fn test_feedback_unknown_detection_is_404() {
    let dir = TempDir::new().unwrap();
    let server = test_server(&Config::default(), &dir);

    let (status, _) = send_json(
        &server,
        post_json(
            "/v1/detections/does-not-exist/feedback",
            json!({"feedback": "helpful"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_resources_by_country_and_specialty() {
    let dir = TempDir::new().unwrap();
    let server = test_server(&Config::default(), &dir);

    let (status, body) = send_json(&server, get("/v1/resources?country=GB")).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Samaritans", "Find A Helpline"]);

    let (_, body) = send_json(&server, get("/v1/resources?specialty=self_harm")).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "Crisis Text Line");
}

#[tokio::test]
async fn test_wellbeing_check() {
    let dir = TempDir::new().unwrap();
    let server = test_server(&Config::default(), &dir);

    let low_moods: Vec<Value> = [2, 3, 1, 2, 3].iter().map(|s| json!({"score": s})).collect();
    let (status, body) = send_json(
        &server,
        post_json("/v1/check", json!({"context": {"mood_history": low_moods}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["needs_crisis_check"], true);
    assert_eq!(body["low_mood_days"], 5);

    let (_, body) = send_json(
        &server,
        post_json("/v1/check", json!({"context": {"recent_crisis_count": 1}})),
    )
    .await;
    assert_eq!(body["needs_crisis_check"], false);
}

#[tokio::test]
async fn test_wellbeing_check_counts_logged_detections() {
    let dir = TempDir::new().unwrap();
    let server = test_server(&Config::default(), &dir);

    for _ in 0..3 {
        send_json(
            &server,
            post_json(
                "/v1/detect",
                json!({"message": "I feel hopeless", "user_id": "u7"}),
            ),
        )
        .await;
    }

    let (_, body) = send_json(&server, post_json("/v1/check", json!({"user_id": "u7"}))).await;
    assert_eq!(body["recent_detections"], 3);
    assert_eq!(body["needs_crisis_check"], true);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let dir = TempDir::new().unwrap();
    let server = test_server(&Config::default(), &dir);

    send_json(
        &server,
        post_json("/v1/detect", json!({"message": "I want to die tonight"})),
    )
    .await;

    let (status, body) = send(&server, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("haven_detections_total{level=\"emergency\"} 1"));
    assert!(text.contains("haven_immediate_risk_total 1"));
}

#[tokio::test]
async fn test_auth_required_when_enabled() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.server.auth_enabled = true;
    config.server.api_keys = vec!["secret".to_string()];
    let server = test_server(&config, &dir);

    let (status, _) = send(&server, get("/health")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&server, get("/v1/resources")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/v1/resources")
        .header("x-api-key", "wrong")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&server, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/v1/resources")
        .header("authorization", "Bearer secret")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&server, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_detect_reply_survives_log_write_failure() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("data");
    let log = DetectionLog::open(&data_dir).unwrap();
    let server = Arc::new(CrisisServer::new(
        &Config::default(),
        CrisisEngine::default(),
        log,
        DetectionMetrics::new().unwrap(),
    ));
    std::fs::remove_dir_all(&data_dir).unwrap();

    let (status, body) = send_json(
        &server,
        post_json("/v1/detect", json!({"message": "I want to kill myself"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["detection"]["level"], "emergency");
    assert!(body["detection_id"].is_null());
    let reply = body["reply"].as_str().unwrap();
    assert!(reply.contains("988 Suicide & Crisis Lifeline"));

    let (_, metrics) = send(&server, get("/metrics")).await;
    let text = String::from_utf8(metrics).unwrap();
    assert!(text.contains("haven_detection_log_failures_total 1"));
}

#[tokio::test]
async fn test_detect_timeout_uses_fallback() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.detection.detect_timeout_ms = 0;
    let server = server_with_engine(
        &config,
        &dir,
        engine_with_sentiment(Arc::new(StalledSentiment)),
    );

    let (status, body) = send_json(
        &server,
        post_json("/v1/detect", json!({"message": "I want to kill myself"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fallback"], true);
    assert_eq!(body["recommended_action"], "provide_resources");
    assert!(body["detection"].is_null());
    assert!(body["detection_id"].is_null());
    let reply = body["reply"].as_str().unwrap();
    assert!(reply.contains("988 Suicide & Crisis Lifeline"));
    assert!(reply.contains("Find A Helpline"));

    let (_, metrics) = send(&server, get("/metrics")).await;
    let text = String::from_utf8(metrics).unwrap();
    assert!(text.contains("haven_detection_fallbacks_total 1"));
}

#[tokio::test]
async fn test_detect_task_failure_uses_fallback() {
    let dir = TempDir::new().unwrap();
    let server = server_with_engine(
        &Config::default(),
        &dir,
        engine_with_sentiment(Arc::new(BrokenSentiment)),
    );

    let (status, body) = send_json(
        &server,
        post_json(
            "/v1/detect",
            json!({"message": "I want to kill myself", "country": "GB"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fallback"], true);
    assert_eq!(body["recommended_action"], "provide_resources");
    assert!(body["reply"].as_str().unwrap().contains("Samaritans"));
    assert!(server.detection_log().is_empty());
}
