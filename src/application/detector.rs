use crate::config::DetectorConfig;
use crate::domain::diagnosis::AnomalyKind;
use crate::domain::transaction::Transaction;
use crate::domain::window::IssuerWindows;
use statrs::statistics::Statistics;
use std::collections::HashMap;
use tracing::warn;

/// Per-issuer sliding-window anomaly detector.
///
/// An issuer is cold until its latency window holds `min_samples` values;
/// cold issuers never signal. Warm issuers are evaluated on every sample:
/// latency spike first, then success-rate drop, at most one signal per call.
#[derive(Debug)]
pub struct AnomalyDetector {
    config: DetectorConfig,
    windows: HashMap<String, IssuerWindows>,
}

impl AnomalyDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            windows: HashMap::new(),
        }
    }

    /// Records the transaction in its issuer's windows and evaluates that issuer.
    pub fn observe(&mut self, tx: &Transaction) -> Option<AnomalyKind> {
        let capacity = self.config.window_size;
        let windows = self
            .windows
            .entry(tx.issuer.clone())
            .or_insert_with(|| IssuerWindows::new(capacity));

        windows.latency.push(tx.latency_ms);
        windows.success.push(tx.status.is_success());

        let signal = Self::evaluate(&self.config, windows);
        if let Some(kind) = signal {
            warn!(
                issuer = %tx.issuer,
                latency_ms = tx.latency_ms,
                success_rate = windows.success_rate().unwrap_or_default(),
                "Anomaly detected: {kind}"
            );
        }
        signal
    }

    /// Windows tracked for `issuer`, if it has been observed.
    pub fn windows(&self, issuer: &str) -> Option<&IssuerWindows> {
        self.windows.get(issuer)
    }

    pub fn tracked_issuers(&self) -> impl Iterator<Item = &str> {
        self.windows.keys().map(String::as_str)
    }

    fn evaluate(config: &DetectorConfig, windows: &IssuerWindows) -> Option<AnomalyKind> {
        if windows.latency.len() < config.min_samples {
            return None;
        }

        if let Some(z) = latest_z_score(windows)
            && z > config.z_threshold
        {
            return Some(AnomalyKind::LatencySpike);
        }

        if windows.success.len() >= config.min_samples
            && let Some(rate) = windows.success_rate()
            && rate < config.success_threshold
        {
            return Some(AnomalyKind::SuccessDrop);
        }

        None
    }
}

/// z-score of the newest latency against the whole window, using the sample
/// standard deviation. `None` for degenerate windows (zero or undefined spread).
fn latest_z_score(windows: &IssuerWindows) -> Option<f64> {
    let latest = *windows.latency.latest()? as f64;
    let samples: Vec<f64> = windows.latency.iter().map(|v| *v as f64).collect();
    let mean = (&samples).mean();
    let std_dev = (&samples).std_dev();

    if std_dev.is_finite() && std_dev > 0.0 {
        Some((latest - mean) / std_dev)
    } else {
        None
    }
}
