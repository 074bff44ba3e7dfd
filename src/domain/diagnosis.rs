use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
    LatencySpike,
    SuccessDrop,
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyKind::LatencySpike => f.write_str("LATENCY_SPIKE"),
            AnomalyKind::SuccessDrop => f.write_str("SUCCESS_DROP"),
        }
    }
}

/// Structured diagnosis handed to the decision engine.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Diagnosis {
    pub root_cause: String,
    /// Confidence score between 0.0 and 1.0.
    pub confidence: f64,
    pub evidence: Vec<String>,
    /// High level recommendation, e.g. `"route_traffic"` or `"Route Traffic"`.
    pub recommended_action: String,
}

/// Outcome of an operations toolkit call.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl ActionResult {
    pub fn ok(message: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: Map::new(),
        }
    }
}

/// Traffic diversion request sent to the mitigation capability.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct RouteRequest {
    /// Share of traffic to divert, 0 to 100.
    pub percentage: u8,
    pub destination: String,
    pub target_issuer: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Monitor,
    RoutedTraffic,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Monitor => f.write_str("MONITOR"),
            Decision::RoutedTraffic => f.write_str("ROUTED_TRAFFIC"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct DecisionRecord {
    pub decision: Decision,
    pub reason: String,
    pub action_result: Option<ActionResult>,
    /// Only set for `RoutedTraffic`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
}

impl DecisionRecord {
    pub fn monitor(reason: impl Into<String>) -> Self {
        Self {
            decision: Decision::Monitor,
            reason: reason.into(),
            action_result: None,
            issuer: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Failed,
}

/// Result of a rollback request. Never raised as an error.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct RollbackOutcome {
    pub status: OutcomeStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_action: Option<DecisionRecord>,
}

impl RollbackOutcome {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Failed,
            message: message.into(),
            original_action: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}
