use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ERROR_CODE: &str = "500";
pub const DEFAULT_FAILURE_RATE: f64 = 0.5;
pub const DEFAULT_LATENCY_MS: u64 = 1500;

/// A chaos rule that probabilistically forces matching transactions to fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultInjection {
    pub id: String,
    /// Target issuer. `None` applies the rule to every issuer.
    pub issuer: Option<String>,
    pub error_code: String,
    pub failure_rate: f64,
    pub latency_ms: u64,
}

impl FaultInjection {
    /// Builds an injection, rejecting failure rates outside `[0, 1]`.
    pub fn new(
        id: impl Into<String>,
        issuer: Option<String>,
        error_code: impl Into<String>,
        failure_rate: f64,
        latency_ms: u64,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&failure_rate) {
            return Err(MonitorError::InvalidInjection(format!(
                "failure rate must be within [0, 1], got {failure_rate}"
            )));
        }
        Ok(Self {
            id: id.into(),
            issuer,
            error_code: error_code.into(),
            failure_rate,
            latency_ms,
        })
    }

    /// Injection with the default error code, failure rate and latency.
    pub fn with_defaults(id: impl Into<String>, issuer: Option<String>) -> Self {
        Self {
            id: id.into(),
            issuer,
            error_code: DEFAULT_ERROR_CODE.to_string(),
            failure_rate: DEFAULT_FAILURE_RATE,
            latency_ms: DEFAULT_LATENCY_MS,
        }
    }

    /// Failure rate usable as a Bernoulli probability. Out-of-range values from
    /// hand-built or deserialized injections are clamped; NaN never fires.
    pub fn probability(&self) -> f64 {
        if self.failure_rate.is_nan() {
            0.0
        } else {
            self.failure_rate.clamp(0.0, 1.0)
        }
    }

    pub fn applies_to(&self, issuer: &str) -> bool {
        self.issuer.as_deref().is_none_or(|target| target == issuer)
    }
}

/// Insertion-ordered table of active injections keyed by id.
///
/// Replacing an existing id keeps the entry at its first-insertion position,
/// so "last match wins" during generation follows the order in which ids were
/// first registered.
#[derive(Debug, Clone, Default)]
pub struct InjectionTable {
    entries: Vec<FaultInjection>,
}

impl InjectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces. Returns the previous injection for this id, if any.
    pub fn upsert(&mut self, injection: FaultInjection) -> Option<FaultInjection> {
        match self.position(&injection.id) {
            Some(idx) => Some(std::mem::replace(&mut self.entries[idx], injection)),
            None => {
                self.entries.push(injection);
                None
            }
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<FaultInjection> {
        self.position(id).map(|idx| self.entries.remove(idx))
    }

    pub fn get(&self, id: &str) -> Option<&FaultInjection> {
        self.position(id).map(|idx| &self.entries[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &FaultInjection> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }
}
