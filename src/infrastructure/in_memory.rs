use crate::domain::diagnosis::{ActionResult, RouteRequest};
use crate::domain::ports::OperationsToolkit;
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Key used in the routing table for requests without a target issuer.
pub const ALL_ISSUERS: &str = "ALL";

/// Active diversion for one issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteState {
    pub percentage: u8,
    pub destination: String,
}

/// A thread-safe simulated operations toolkit.
///
/// Keeps the routing table and the ordered log of routing calls in memory
/// behind `Arc<RwLock<..>>`, so clones share state. Status pages are canned.
#[derive(Default, Clone)]
pub struct InMemoryToolkit {
    routes: Arc<RwLock<HashMap<String, RouteState>>>,
    route_log: Arc<RwLock<Vec<RouteRequest>>>,
}

impl InMemoryToolkit {
    /// Creates a toolkit with an empty routing table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every routing request received so far, oldest first.
    pub async fn route_calls(&self) -> Vec<RouteRequest> {
        self.route_log.read().await.clone()
    }

    /// Current diversion for `issuer`, if any traffic is diverted.
    pub async fn route_for(&self, issuer: &str) -> Option<RouteState> {
        self.routes.read().await.get(issuer).cloned()
    }

    fn canned_status(service: &str) -> (&'static str, &'static str) {
        match service.to_uppercase().as_str() {
            "CHASE" => ("degraded", "High latency on payment gateway."),
            "STRIPE" => ("operational", "All systems go."),
            "BOA" => ("maintenance", "Scheduled maintenance."),
            _ => ("unknown", "Service not found"),
        }
    }
}

fn as_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[async_trait]
impl OperationsToolkit for InMemoryToolkit {
    async fn route_traffic(&self, request: RouteRequest) -> ActionResult {
        if request.percentage > 100 {
            return ActionResult::failed(format!(
                "Invalid routing percentage {}",
                request.percentage
            ));
        }

        let key = request
            .target_issuer
            .clone()
            .unwrap_or_else(|| ALL_ISSUERS.to_string());
        info!(
            issuer = %key,
            percentage = request.percentage,
            destination = %request.destination,
            "Routing traffic"
        );

        {
            let mut routes = self.routes.write().await;
            if request.percentage == 0 {
                routes.remove(&key);
            } else {
                routes.insert(
                    key,
                    RouteState {
                        percentage: request.percentage,
                        destination: request.destination.clone(),
                    },
                );
            }
        }
        self.route_log.write().await.push(request.clone());

        ActionResult::ok(
            format!(
                "Successfully routed {}% of traffic to {}",
                request.percentage, request.destination
            ),
            as_map(json!({
                "percentage": request.percentage,
                "destination": request.destination,
            })),
        )
    }

    async fn check_status(&self, service: &str) -> ActionResult {
        let (status, details) = Self::canned_status(service);
        ActionResult::ok(
            format!("Status for {service}: {status}"),
            as_map(json!({ "status": status, "details": details })),
        )
    }

    async fn query_history(&self, query: &str) -> ActionResult {
        ActionResult::ok(
            format!("Executed query: {query}"),
            as_map(json!({
                "rows": [{ "timestamp": "2023-10-27T10:00:00", "error": "500", "count": 150 }]
            })),
        )
    }
}
