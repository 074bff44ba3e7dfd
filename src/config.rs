//! Runtime configuration for the monitoring pipeline.
//!
//! Every section has a `Default` matching the stock simulation; the CLI only
//! overrides what the operator passes explicitly.

use crate::domain::event::DEFAULT_EVENT_LOG_CAPACITY;
use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ISSUERS: [&str; 4] = ["CHASE", "BOA", "WELLS", "STRIPE_TEST"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Target transactions per second.
    pub tps: f64,
    pub issuers: Vec<String>,
    /// Seed for reproducible streams. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            tps: 5.0,
            issuers: DEFAULT_ISSUERS.iter().map(|s| s.to_string()).collect(),
            seed: None,
        }
    }
}

impl GeneratorConfig {
    /// Pause between emissions. Saturates at `Duration::MAX` when `1 / tps`
    /// is not representable, which includes zero and negative rates.
    pub fn interval(&self) -> Duration {
        self.try_interval().unwrap_or(Duration::MAX)
    }

    fn try_interval(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(1.0 / self.tps).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub window_size: usize,
    /// Samples required before an issuer is evaluated.
    pub min_samples: usize,
    pub z_threshold: f64,
    pub success_threshold: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_size: 50,
            min_samples: 10,
            z_threshold: 2.0,
            success_threshold: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPolicy {
    /// Minimum confidence (exclusive) required before acting.
    pub confidence_threshold: f64,
    pub divert_percentage: u8,
    pub fallback_destination: String,
    pub reset_destination: String,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.8,
            divert_percentage: 50,
            fallback_destination: "STRIPE".to_string(),
            reset_destination: "ORIGINAL".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub event_log_capacity: usize,
    pub broadcast_capacity: usize,
    pub control_capacity: usize,
    pub diagnosis_timeout_ms: u64,
    /// Stop after this many transactions. `None` runs until stopped.
    pub max_transactions: Option<u64>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            event_log_capacity: DEFAULT_EVENT_LOG_CAPACITY,
            broadcast_capacity: 1024,
            control_capacity: 64,
            diagnosis_timeout_ms: 5_000,
            max_transactions: None,
        }
    }
}

impl OrchestratorConfig {
    pub fn diagnosis_timeout(&self) -> Duration {
        Duration::from_millis(self.diagnosis_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub generator: GeneratorConfig,
    pub detector: DetectorConfig,
    pub policy: DecisionPolicy,
    pub orchestrator: OrchestratorConfig,
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<()> {
        let generator = &self.generator;
        if !(generator.tps.is_finite() && generator.tps > 0.0) {
            return Err(MonitorError::InvalidConfig(format!(
                "tps must be positive, got {}",
                generator.tps
            )));
        }
        if generator.try_interval().is_none() {
            return Err(MonitorError::InvalidConfig(format!(
                "tps {} is too low to pace emissions",
                generator.tps
            )));
        }
        if generator.issuers.is_empty() {
            return Err(MonitorError::InvalidConfig(
                "at least one issuer is required".to_string(),
            ));
        }

        let detector = &self.detector;
        if detector.window_size == 0 {
            return Err(MonitorError::InvalidConfig(
                "window size must be at least 1".to_string(),
            ));
        }
        if detector.window_size < detector.min_samples {
            return Err(MonitorError::InvalidConfig(format!(
                "window size {} is below min samples {}",
                detector.window_size, detector.min_samples
            )));
        }
        if !(detector.z_threshold.is_finite() && detector.z_threshold > 0.0) {
            return Err(MonitorError::InvalidConfig(format!(
                "z threshold must be positive, got {}",
                detector.z_threshold
            )));
        }
        if !(0.0..=1.0).contains(&detector.success_threshold) {
            return Err(MonitorError::InvalidConfig(format!(
                "success threshold must be within [0, 1], got {}",
                detector.success_threshold
            )));
        }

        let policy = &self.policy;
        if !(0.0..=1.0).contains(&policy.confidence_threshold) {
            return Err(MonitorError::InvalidConfig(format!(
                "confidence threshold must be within [0, 1], got {}",
                policy.confidence_threshold
            )));
        }
        if policy.divert_percentage > 100 {
            return Err(MonitorError::InvalidConfig(format!(
                "divert percentage must be at most 100, got {}",
                policy.divert_percentage
            )));
        }

        if self.orchestrator.broadcast_capacity == 0 || self.orchestrator.control_capacity == 0 {
            return Err(MonitorError::InvalidConfig(
                "channel capacities must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
