use crate::domain::diagnosis::{AnomalyKind, Diagnosis};
use crate::domain::ports::{DiagnoserBox, InvestigationContext, ToolkitRef};
use crate::error::CollaboratorError;
use std::time::Duration;
use tracing::{info, warn};

/// Gathers context for an alert and obtains a diagnosis for it.
///
/// The external diagnoser is optional. When it is absent, fails or exceeds the
/// timeout, [`fallback_diagnosis`] is used so a well-formed diagnosis is always
/// returned.
pub struct Investigator {
    toolkit: ToolkitRef,
    diagnoser: Option<DiagnoserBox>,
    timeout: Duration,
}

impl Investigator {
    pub fn new(toolkit: ToolkitRef, diagnoser: Option<DiagnoserBox>, timeout: Duration) -> Self {
        Self {
            toolkit,
            diagnoser,
            timeout,
        }
    }

    pub async fn gather_context(&self, issuer: &str) -> InvestigationContext {
        let status = self.toolkit.check_status(issuer).await;
        let history = self
            .toolkit
            .query_history(&format!(
                "SELECT * FROM errors WHERE issuer='{issuer}' AND time > NOW() - INTERVAL '5 min'"
            ))
            .await;

        InvestigationContext {
            external_status: status.data,
            recent_errors: history.data,
        }
    }

    pub async fn investigate(&self, kind: AnomalyKind, issuer: &str) -> Diagnosis {
        info!(%kind, issuer, "Investigating alert");
        let context = self.gather_context(issuer).await;

        match self.consult(kind, issuer, &context).await {
            Ok(diagnosis) => diagnosis,
            Err(e) => {
                warn!(issuer, error = %e, "Diagnosis unavailable, using fallback");
                fallback_diagnosis(kind, issuer, &context)
            }
        }
    }

    async fn consult(
        &self,
        kind: AnomalyKind,
        issuer: &str,
        context: &InvestigationContext,
    ) -> Result<Diagnosis, CollaboratorError> {
        let diagnoser = self
            .diagnoser
            .as_ref()
            .ok_or_else(|| CollaboratorError::Unavailable("no diagnoser configured".to_string()))?;

        let diagnosis = tokio::time::timeout(self.timeout, diagnoser.diagnose(kind, issuer, context))
            .await
            .map_err(|_| CollaboratorError::Timeout(self.timeout.as_millis() as u64))??;

        if !(0.0..=1.0).contains(&diagnosis.confidence) {
            return Err(CollaboratorError::InvalidResponse(format!(
                "confidence {} outside [0, 1]",
                diagnosis.confidence
            )));
        }
        Ok(diagnosis)
    }
}

/// Deterministic diagnosis built from locally gathered context.
pub fn fallback_diagnosis(
    _kind: AnomalyKind,
    issuer: &str,
    context: &InvestigationContext,
) -> Diagnosis {
    if context.external_status() == Some("degraded") {
        Diagnosis {
            root_cause: format!("External outage detected at {issuer}"),
            confidence: 0.95,
            evidence: vec![format!("{issuer} status page reports 'degraded'")],
            recommended_action: "route_traffic".to_string(),
        }
    } else {
        Diagnosis {
            root_cause: "Unknown latency spike".to_string(),
            confidence: 0.5,
            evidence: vec![
                "No external incidents reported".to_string(),
                "High error count in DB".to_string(),
            ],
            recommended_action: "monitor".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::Diagnoser;
    use crate::infrastructure::in_memory::InMemoryToolkit;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FixedDiagnoser(Result<Diagnosis, CollaboratorError>);

    #[async_trait]
    impl Diagnoser for FixedDiagnoser {
        async fn diagnose(
            &self,
            _kind: AnomalyKind,
            _issuer: &str,
            _context: &InvestigationContext,
        ) -> Result<Diagnosis, CollaboratorError> {
            self.0.clone()
        }
    }

    struct SlowDiagnoser;

    #[async_trait]
    impl Diagnoser for SlowDiagnoser {
        async fn diagnose(
            &self,
            _kind: AnomalyKind,
            _issuer: &str,
            _context: &InvestigationContext,
        ) -> Result<Diagnosis, CollaboratorError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Err(CollaboratorError::Unavailable("unreachable".into()))
        }
    }

    fn investigator(diagnoser: Option<DiagnoserBox>) -> Investigator {
        Investigator::new(
            Arc::new(InMemoryToolkit::new()),
            diagnoser,
            Duration::from_millis(50),
        )
    }

    fn external(confidence: f64) -> Diagnosis {
        Diagnosis {
            root_cause: "Issuer gateway saturation".into(),
            confidence,
            evidence: vec!["p99 latency doubled".into()],
            recommended_action: "Route Traffic".into(),
        }
    }

    #[tokio::test]
    async fn test_fallback_for_degraded_issuer() {
        let diagnosis = investigator(None)
            .investigate(AnomalyKind::LatencySpike, "CHASE")
            .await;
        assert_eq!(diagnosis.root_cause, "External outage detected at CHASE");
        assert_eq!(diagnosis.confidence, 0.95);
        assert_eq!(diagnosis.recommended_action, "route_traffic");
    }

    #[tokio::test]
    async fn test_fallback_for_healthy_issuer() {
        let diagnosis = investigator(None)
            .investigate(AnomalyKind::SuccessDrop, "WELLS")
            .await;
        assert_eq!(diagnosis.root_cause, "Unknown latency spike");
        assert_eq!(diagnosis.confidence, 0.5);
        assert_eq!(diagnosis.recommended_action, "monitor");
        assert_eq!(diagnosis.evidence.len(), 2);
    }

    #[tokio::test]
    async fn test_external_diagnosis_is_used() {
        let diagnoser: DiagnoserBox = Box::new(FixedDiagnoser(Ok(external(0.9))));
        let diagnosis = investigator(Some(diagnoser))
            .investigate(AnomalyKind::LatencySpike, "WELLS")
            .await;
        assert_eq!(diagnosis, external(0.9));
    }

    #[tokio::test]
    async fn test_failed_diagnoser_falls_back() {
        let diagnoser: DiagnoserBox = Box::new(FixedDiagnoser(Err(
            CollaboratorError::Unavailable("connection refused".into()),
        )));
        let diagnosis = investigator(Some(diagnoser))
            .investigate(AnomalyKind::LatencySpike, "CHASE")
            .await;
        assert_eq!(diagnosis.confidence, 0.95);
    }

    #[tokio::test]
    async fn test_out_of_range_confidence_falls_back() {
        let diagnoser: DiagnoserBox = Box::new(FixedDiagnoser(Ok(external(1.7))));
        let diagnosis = investigator(Some(diagnoser))
            .investigate(AnomalyKind::LatencySpike, "BOA")
            .await;
        assert_eq!(diagnosis.recommended_action, "monitor");
    }

    #[tokio::test]
    async fn test_slow_diagnoser_times_out() {
        let diagnoser: DiagnoserBox = Box::new(SlowDiagnoser);
        let diagnosis = investigator(Some(diagnoser))
            .investigate(AnomalyKind::LatencySpike, "CHASE")
            .await;
        assert_eq!(diagnosis.root_cause, "External outage detected at CHASE");
    }

    #[tokio::test]
    async fn test_context_contains_status() {
        let context = investigator(None).gather_context("BOA").await;
        assert_eq!(context.external_status(), Some("maintenance"));
        assert!(context.recent_errors.contains_key("rows"));
    }
}
