#![allow(dead_code)]

use async_trait::async_trait;
use paysentinel::config::{GeneratorConfig, MonitorConfig, OrchestratorConfig};
use paysentinel::domain::diagnosis::{AnomalyKind, Diagnosis};
use paysentinel::domain::ports::{Diagnoser, InvestigationContext};
use paysentinel::error::CollaboratorError;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fast, seeded configuration restricted to `issuers`.
pub fn fast_config(issuers: &[&str], max_transactions: Option<u64>) -> MonitorConfig {
    MonitorConfig {
        generator: GeneratorConfig {
            tps: 1000.0,
            issuers: issuers.iter().map(|s| s.to_string()).collect(),
            seed: Some(42),
        },
        orchestrator: OrchestratorConfig {
            max_transactions,
            ..OrchestratorConfig::default()
        },
        ..MonitorConfig::default()
    }
}

/// Diagnoser that always fails, counting how often it was consulted.
#[derive(Default, Clone)]
pub struct UnreachableDiagnoser {
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Diagnoser for UnreachableDiagnoser {
    async fn diagnose(
        &self,
        _kind: AnomalyKind,
        _issuer: &str,
        _context: &InvestigationContext,
    ) -> Result<Diagnosis, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CollaboratorError::Unavailable("connection refused".to_string()))
    }
}

/// Diagnoser returning the same answer for every alert.
pub struct ScriptedDiagnoser {
    pub diagnosis: Diagnosis,
}

#[async_trait]
impl Diagnoser for ScriptedDiagnoser {
    async fn diagnose(
        &self,
        _kind: AnomalyKind,
        _issuer: &str,
        _context: &InvestigationContext,
    ) -> Result<Diagnosis, CollaboratorError> {
        Ok(self.diagnosis.clone())
    }
}
