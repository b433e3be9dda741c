// Prometheus counters for detections

use anyhow::Result;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::crisis::{DetectionResult, SeverityLevel};

/// Registry-scoped so tests and multiple servers don't collide
pub struct DetectionMetrics {
    registry: Registry,
    detections: IntCounterVec,
    immediate_risk: IntCounter,
    fallbacks: IntCounter,
    log_failures: IntCounter,
    risk_score: Histogram,
}

impl DetectionMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let detections = IntCounterVec::new(
            Opts::new("haven_detections_total", "Messages scored, by reported level"),
            &["level"],
        )?;
        let immediate_risk = IntCounter::new(
            "haven_immediate_risk_total",
            "Messages containing immediate-risk language",
        )?;
        let fallbacks = IntCounter::new(
            "haven_detection_fallbacks_total",
            "Requests answered with the conservative fallback response",
        )?;
        let log_failures = IntCounter::new(
            "haven_detection_log_failures_total",
            "Detections that could not be written to the detection log",
        )?;
        let risk_score = Histogram::with_opts(
            HistogramOpts::new("haven_risk_score", "Final risk score per message")
                .buckets(vec![0.0, 0.2, 0.5, 1.0, 1.5, 2.0, 3.0]),
        )?;

        registry.register(Box::new(detections.clone()))?;
        registry.register(Box::new(immediate_risk.clone()))?;
        registry.register(Box::new(fallbacks.clone()))?;
        registry.register(Box::new(log_failures.clone()))?;
        registry.register(Box::new(risk_score.clone()))?;

        // Expose every level from the start, even at zero
        for level in SeverityLevel::ALL {
            detections.with_label_values(&[level.as_str()]);
        }

        Ok(Self {
            registry,
            detections,
            immediate_risk,
            fallbacks,
            log_failures,
            risk_score,
        })
    }

    pub fn observe(&self, detection: &DetectionResult) {
        self.detections
            .with_label_values(&[detection.level.as_str()])
            .inc();
        if detection.immediate_risk {
            self.immediate_risk.inc();
        }
        self.risk_score.observe(detection.risk_score);
    }

    pub fn observe_fallback(&self) {
        self.fallbacks.inc();
    }

    pub fn observe_log_failure(&self) {
        self.log_failures.inc();
    }

    pub fn detections_at(&self, level: SeverityLevel) -> u64 {
        self.detections.with_label_values(&[level.as_str()]).get()
    }

    /// Text exposition format
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
