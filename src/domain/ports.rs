use super::diagnosis::{ActionResult, AnomalyKind, Diagnosis, RouteRequest};
use crate::error::CollaboratorError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Operational capabilities available to the investigator and the decision engine.
#[async_trait]
pub trait OperationsToolkit: Send + Sync {
    /// Diverts a share of an issuer's traffic (or all traffic) to `destination`.
    async fn route_traffic(&self, request: RouteRequest) -> ActionResult;
    /// Checks the public status of a bank or processor.
    async fn check_status(&self, service: &str) -> ActionResult;
    /// Queries historical transaction data.
    async fn query_history(&self, query: &str) -> ActionResult;
}

/// Facts gathered before asking for a diagnosis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvestigationContext {
    pub external_status: Map<String, Value>,
    pub recent_errors: Map<String, Value>,
}

impl InvestigationContext {
    pub fn external_status(&self) -> Option<&str> {
        self.external_status.get("status").and_then(Value::as_str)
    }
}

#[async_trait]
pub trait Diagnoser: Send + Sync {
    async fn diagnose(
        &self,
        kind: AnomalyKind,
        issuer: &str,
        context: &InvestigationContext,
    ) -> Result<Diagnosis, CollaboratorError>;
}

#[async_trait]
pub trait ChatAssistant: Send + Sync {
    async fn answer(&self, query: &str, context: &str) -> Result<String, CollaboratorError>;
}

pub type ToolkitRef = Arc<dyn OperationsToolkit>;
pub type DiagnoserBox = Box<dyn Diagnoser>;
pub type ChatAssistantRef = Arc<dyn ChatAssistant>;
