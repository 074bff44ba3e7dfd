use crate::config::DecisionPolicy;
use crate::domain::diagnosis::{
    Decision, DecisionRecord, Diagnosis, OutcomeStatus, RollbackOutcome, RouteRequest,
};
use crate::domain::ports::ToolkitRef;
use tracing::{info, warn};

const ROUTE_TRAFFIC_ACTION: &str = "route traffic";

/// Applies the confidence policy to diagnoses and keeps an undo stack of the
/// mitigations it executed.
///
/// The stack is unbounded: a sustained outage pushes one routing record per
/// alert, and each rollback undoes exactly one of them.
pub struct DecisionEngine {
    toolkit: ToolkitRef,
    policy: DecisionPolicy,
    history: Vec<DecisionRecord>,
}

impl DecisionEngine {
    pub fn new(toolkit: ToolkitRef, policy: DecisionPolicy) -> Self {
        Self {
            toolkit,
            policy,
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[DecisionRecord] {
        &self.history
    }

    /// Executes the mitigation when the diagnosis is confident enough and
    /// recommends rerouting; otherwise returns a transient `Monitor` record.
    pub async fn decide_and_act(&mut self, diagnosis: &Diagnosis, issuer: &str) -> DecisionRecord {
        info!(
            issuer,
            action = %diagnosis.recommended_action,
            confidence = diagnosis.confidence,
            "Reviewing diagnosis"
        );

        if !self.should_route(diagnosis) {
            info!(issuer, confidence = diagnosis.confidence, "Below policy, monitoring");
            return DecisionRecord::monitor("Confidence too low or no action needed.");
        }

        let request = RouteRequest {
            percentage: self.policy.divert_percentage,
            destination: self.policy.fallback_destination.clone(),
            target_issuer: Some(issuer.to_string()),
        };
        let result = self.toolkit.route_traffic(request).await;
        if !result.success {
            warn!(issuer, message = %result.message, "Mitigation reported failure");
        }

        let record = DecisionRecord {
            decision: Decision::RoutedTraffic,
            reason: format!("Mitigating {}", diagnosis.root_cause),
            action_result: Some(result),
            issuer: Some(issuer.to_string()),
        };
        self.history.push(record.clone());
        record
    }

    /// Reverts the most recent mitigation (LIFO).
    ///
    /// A record of an unexpected kind is still removed from the history before
    /// the failure is reported.
    pub async fn rollback_last_action(&mut self) -> RollbackOutcome {
        let Some(last) = self.history.pop() else {
            return RollbackOutcome::failed("No actions to rollback");
        };

        match (last.decision, last.issuer.clone()) {
            (Decision::RoutedTraffic, Some(issuer)) => {
                let request = RouteRequest {
                    percentage: 0,
                    destination: self.policy.reset_destination.clone(),
                    target_issuer: Some(issuer.clone()),
                };
                let result = self.toolkit.route_traffic(request).await;
                if !result.success {
                    warn!(issuer = %issuer, message = %result.message, "Rollback routing reported failure");
                }
                info!(issuer = %issuer, "Rolled back routing");
                RollbackOutcome {
                    status: OutcomeStatus::Success,
                    message: format!("Rolled back routing for {issuer}"),
                    original_action: Some(last),
                }
            }
            _ => {
                warn!(decision = %last.decision, "Cannot roll back record");
                RollbackOutcome::failed("Unknown action type")
            }
        }
    }

    fn should_route(&self, diagnosis: &Diagnosis) -> bool {
        diagnosis.confidence > self.policy.confidence_threshold
            && normalize_action(&diagnosis.recommended_action) == ROUTE_TRAFFIC_ACTION
    }

    #[cfg(test)]
    fn push_record(&mut self, record: DecisionRecord) {
        self.history.push(record);
    }
}

/// Lower-cases and maps underscores to spaces: `"Route_Traffic"` -> `"route traffic"`.
fn normalize_action(action: &str) -> String {
    action.trim().to_lowercase().replace('_', " ")
}
