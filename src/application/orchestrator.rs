use super::broadcast::{AgentLog, Broadcaster, StreamUpdate};
use super::decision::DecisionEngine;
use super::detector::AnomalyDetector;
use super::generator::{StopHandle, TransactionGenerator};
use super::investigator::Investigator;
use crate::config::MonitorConfig;
use crate::domain::diagnosis::{Decision, RollbackOutcome};
use crate::domain::event::{EventEntry, EventLevel, EventLog};
use crate::domain::injection::FaultInjection;
use crate::domain::ports::{ChatAssistantRef, DiagnoserBox, ToolkitRef};
use crate::domain::transaction::Transaction;
use crate::error::{CollaboratorError, MonitorError, Result};
use futures::StreamExt;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info};

/// Requests applied by the control loop between transactions.
#[derive(Debug)]
pub enum ControlCommand {
    Inject(FaultInjection),
    StopInjection(String),
    Rollback(oneshot::Sender<RollbackOutcome>),
}

/// Counters reported when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: u64,
    pub alerts: u64,
    pub actions: u64,
    pub rollbacks: u64,
}

/// Single-task control loop binding generator, detector, investigator and
/// decision engine.
///
/// Detector windows, the decision history and event-log writes are owned by
/// the loop; outside callers go through a [`ControlHandle`]. Each transaction
/// is fully handled (detection, diagnosis, decision, broadcast) before the
/// next one is pulled from the stream.
pub struct Orchestrator {
    generator: TransactionGenerator,
    detector: AnomalyDetector,
    investigator: Investigator,
    engine: DecisionEngine,
    events: Arc<RwLock<EventLog>>,
    broadcaster: Broadcaster,
    commands_tx: mpsc::Sender<ControlCommand>,
    commands_rx: mpsc::Receiver<ControlCommand>,
    assistant: Option<ChatAssistantRef>,
    max_transactions: Option<u64>,
    summary: RunSummary,
}

impl Orchestrator {
    pub fn new(
        config: MonitorConfig,
        toolkit: ToolkitRef,
        diagnoser: Option<DiagnoserBox>,
    ) -> Result<Self> {
        config.validate()?;
        let MonitorConfig {
            generator,
            detector,
            policy,
            orchestrator,
        } = config;
        let (commands_tx, commands_rx) = mpsc::channel(orchestrator.control_capacity);

        Ok(Self {
            generator: TransactionGenerator::new(generator),
            detector: AnomalyDetector::new(detector),
            investigator: Investigator::new(
                Arc::clone(&toolkit),
                diagnoser,
                orchestrator.diagnosis_timeout(),
            ),
            engine: DecisionEngine::new(toolkit, policy),
            events: Arc::new(RwLock::new(EventLog::new(orchestrator.event_log_capacity))),
            broadcaster: Broadcaster::new(orchestrator.broadcast_capacity),
            commands_tx,
            commands_rx,
            assistant: None,
            max_transactions: orchestrator.max_transactions,
            summary: RunSummary::default(),
        })
    }

    pub fn with_chat_assistant(mut self, assistant: ChatAssistantRef) -> Self {
        self.assistant = Some(assistant);
        self
    }

    /// Creates a control surface for this loop. Handles stay valid until the
    /// loop ends; afterwards their commands fail with `LoopStopped`.
    pub fn handle(&self) -> ControlHandle {
        ControlHandle {
            commands: self.commands_tx.clone(),
            stop: self.generator.stop_handle(),
            events: Arc::clone(&self.events),
            broadcaster: self.broadcaster.clone(),
            assistant: self.assistant.clone(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamUpdate> {
        self.broadcaster.subscribe()
    }

    /// Stop flag alone, for callers that must not keep the broadcast channel open.
    pub fn stop_handle(&self) -> StopHandle {
        self.generator.stop_handle()
    }

    /// Drains the transaction stream until the generator is stopped or the
    /// transaction limit is reached.
    pub async fn run(mut self) -> RunSummary {
        info!(limit = ?self.max_transactions, "Starting monitoring loop");
        let stream = self.generator.stream();
        tokio::pin!(stream);

        loop {
            if let Some(max) = self.max_transactions
                && self.summary.processed >= max
            {
                self.generator.stop();
                break;
            }

            tokio::select! {
                biased;
                Some(command) = self.commands_rx.recv() => self.apply(command).await,
                next = stream.next() => match next {
                    Some(tx) => self.handle_transaction(tx).await,
                    None => break,
                },
            }
        }

        info!(
            processed = self.summary.processed,
            alerts = self.summary.alerts,
            actions = self.summary.actions,
            rollbacks = self.summary.rollbacks,
            "Monitoring loop stopped"
        );
        self.summary
    }

    async fn handle_transaction(&mut self, tx: Transaction) {
        self.summary.processed += 1;
        let alert = self.detector.observe(&tx);
        let mut agent_logs = Vec::new();

        if let Some(kind) = alert {
            self.summary.alerts += 1;
            self.log_event(
                "Watchdog",
                format!("ALERT: {kind} on {}", tx.issuer),
                EventLevel::Warning,
            );

            let diagnosis = self.investigator.investigate(kind, &tx.issuer).await;
            let diagnosed = format!(
                "Diagnosed: {} (Conf: {})",
                diagnosis.root_cause, diagnosis.confidence
            );
            agent_logs.push(AgentLog::new("Analyst", diagnosed.clone()));
            self.log_event("Analyst", diagnosed, EventLevel::Info);

            let decision = self.engine.decide_and_act(&diagnosis, &tx.issuer).await;
            if decision.decision != Decision::Monitor {
                self.summary.actions += 1;
                let action = format!("Action: {} - {}", decision.decision, decision.reason);
                agent_logs.push(AgentLog::new("Manager", action.clone()));
                self.log_event("Manager", action, EventLevel::Danger);
            }
        }

        self.broadcaster.publish(StreamUpdate::Transaction {
            data: tx,
            alert,
            agent_logs,
        });
    }

    async fn apply(&mut self, command: ControlCommand) {
        match command {
            ControlCommand::Inject(injection) => {
                let message = format!(
                    "Injection {} started for {} (error {}, rate {})",
                    injection.id,
                    injection.issuer.as_deref().unwrap_or("ALL"),
                    injection.error_code,
                    injection.failure_rate
                );
                self.generator.inject(injection);
                self.system_event(message, EventLevel::Danger);
            }
            ControlCommand::StopInjection(id) => {
                if self.generator.stop_injection(&id) {
                    self.system_event(format!("Injection {id} stopped"), EventLevel::Info);
                } else {
                    debug!(id = %id, "No such injection");
                }
            }
            ControlCommand::Rollback(reply) => {
                let outcome = self.engine.rollback_last_action().await;
                if outcome.is_success() {
                    self.summary.rollbacks += 1;
                }
                self.system_event(
                    format!("Rollback requested: {}", outcome.message),
                    EventLevel::Warning,
                );
                // The requester may have gone away; the rollback still stands.
                let _ = reply.send(outcome);
            }
        }
    }

    fn log_event(&self, agent: &str, message: String, level: EventLevel) -> EventEntry {
        let entry = EventEntry::now(agent, message, level);
        self.events.write().push(entry.clone());
        entry
    }

    fn system_event(&self, message: String, level: EventLevel) {
        let entry = self.log_event("System", message, level);
        self.broadcaster.publish(StreamUpdate::Event { data: entry });
    }
}

/// Control surface for a running [`Orchestrator`].
///
/// Injections and rollbacks are queued to the loop; chat and event reads go
/// straight to the shared event log.
#[derive(Clone)]
pub struct ControlHandle {
    commands: mpsc::Sender<ControlCommand>,
    stop: StopHandle,
    events: Arc<RwLock<EventLog>>,
    broadcaster: Broadcaster,
    assistant: Option<ChatAssistantRef>,
}

impl ControlHandle {
    pub async fn inject_failure(&self, injection: FaultInjection) -> Result<()> {
        self.send(ControlCommand::Inject(injection)).await
    }

    pub async fn stop_injection(&self, id: impl Into<String>) -> Result<()> {
        self.send(ControlCommand::StopInjection(id.into())).await
    }

    /// Rolls back the most recent mitigation and waits for the outcome.
    pub async fn rollback(&self) -> Result<RollbackOutcome> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(ControlCommand::Rollback(reply_tx)).await?;
        reply_rx.await.map_err(|_| MonitorError::LoopStopped)
    }

    /// Answers a free-text question using the recent event log as context.
    /// Failures come back as a readable message, never as an error.
    pub async fn chat(&self, query: &str) -> String {
        let context = self.events.read().render_context();
        let answer = match &self.assistant {
            Some(assistant) => assistant.answer(query, &context).await,
            None => Err(CollaboratorError::Unavailable(
                "no chat assistant configured".to_string(),
            )),
        };
        answer.unwrap_or_else(|e| format!("Error contacting assistant: {e}"))
    }

    pub fn recent_events(&self) -> Vec<EventEntry> {
        self.events.read().snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamUpdate> {
        self.broadcaster.subscribe()
    }

    /// Stops the generator; the loop ends at the next pacing boundary.
    pub fn stop(&self) {
        self.stop.stop();
    }

    async fn send(&self, command: ControlCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| MonitorError::LoopStopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GeneratorConfig, OrchestratorConfig};
    use crate::domain::ports::ChatAssistant;
    use crate::infrastructure::in_memory::InMemoryToolkit;
    use async_trait::async_trait;

    struct EchoAssistant;

    #[async_trait]
    impl ChatAssistant for EchoAssistant {
        async fn answer(
            &self,
            query: &str,
            context: &str,
        ) -> std::result::Result<String, CollaboratorError> {
            Ok(format!("{query}\n{context}"))
        }
    }

    fn config(issuers: &[&str], max_transactions: Option<u64>) -> MonitorConfig {
        MonitorConfig {
            generator: GeneratorConfig {
                tps: 1000.0,
                issuers: issuers.iter().map(|s| s.to_string()).collect(),
                seed: Some(11),
            },
            orchestrator: OrchestratorConfig {
                max_transactions,
                ..OrchestratorConfig::default()
            },
            ..MonitorConfig::default()
        }
    }

    fn chase_outage() -> FaultInjection {
        FaultInjection::new("outage", Some("CHASE".into()), "500", 1.0, 1500).unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = config(&["CHASE"], None);
        config.generator.tps = -1.0;
        let result = Orchestrator::new(config, Arc::new(InMemoryToolkit::new()), None);
        assert!(matches!(result, Err(MonitorError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_broadcasts_every_transaction_in_order() {
        let config = config(&["BOA", "WELLS"], Some(30));
        // Same seed, no injections: a second generator replays the sequence.
        let expected: Vec<_> = TransactionGenerator::new(config.generator.clone())
            .stream()
            .take(30)
            .map(|tx| (tx.issuer, tx.latency_ms, tx.amount))
            .collect()
            .await;

        let orchestrator =
            Orchestrator::new(config, Arc::new(InMemoryToolkit::new()), None).unwrap();
        let mut updates = orchestrator.subscribe();

        let summary = orchestrator.run().await;
        assert_eq!(summary.processed, 30);

        let mut broadcast = Vec::new();
        while let Ok(update) = updates.try_recv() {
            match update {
                StreamUpdate::Transaction { data, .. } => {
                    broadcast.push((data.issuer, data.latency_ms, data.amount))
                }
                StreamUpdate::Event { .. } => panic!("no control events expected"),
            }
        }
        assert_eq!(broadcast, expected);
    }

    #[tokio::test]
    async fn test_outage_triggers_mitigation() {
        let toolkit = InMemoryToolkit::new();
        let orchestrator =
            Orchestrator::new(config(&["CHASE"], Some(12)), Arc::new(toolkit.clone()), None).unwrap();
        let handle = orchestrator.handle();
        let mut updates = orchestrator.subscribe();
        handle.inject_failure(chase_outage()).await.unwrap();

        let summary = orchestrator.run().await;

        // Cold for nine samples, then every failing sample alerts.
        assert_eq!(summary.processed, 12);
        assert_eq!(summary.alerts, 3);
        assert_eq!(summary.actions, 3);

        let calls = toolkit.route_calls().await;
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|c| c.percentage == 50 && c.destination == "STRIPE"));

        let mut flagged = 0;
        while let Ok(update) = updates.try_recv() {
            if let StreamUpdate::Transaction { alert: Some(_), agent_logs, .. } = update {
                flagged += 1;
                let agents: Vec<&str> = agent_logs.iter().map(|l| l.agent.as_str()).collect();
                assert_eq!(agents, vec!["Analyst", "Manager"]);
            }
        }
        assert_eq!(flagged, 3);

        let events = handle.recent_events();
        assert!(events.iter().any(|e| e.message == "ALERT: SUCCESS_DROP on CHASE"
            || e.message == "ALERT: LATENCY_SPIKE on CHASE"));
        assert!(events
            .iter()
            .any(|e| e.agent == "Manager" && e.level == EventLevel::Danger));
    }

    #[tokio::test]
    async fn test_rollback_through_handle() {
        let toolkit = InMemoryToolkit::new();
        let orchestrator =
            Orchestrator::new(config(&["CHASE"], None), Arc::new(toolkit.clone()), None).unwrap();
        let handle = orchestrator.handle();
        let mut updates = orchestrator.subscribe();
        handle.inject_failure(chase_outage()).await.unwrap();
        let task = tokio::spawn(orchestrator.run());

        loop {
            if let StreamUpdate::Transaction { agent_logs, .. } = updates.recv().await.unwrap()
                && agent_logs.iter().any(|l| l.agent == "Manager")
            {
                break;
            }
        }
        handle.stop_injection("outage").await.unwrap();

        let outcome = handle.rollback().await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.message, "Rolled back routing for CHASE");

        handle.stop();
        let summary = task.await.unwrap();
        assert_eq!(summary.rollbacks, 1);
        assert!(toolkit.route_calls().await.iter().any(|c| c.percentage == 0));
        assert!(handle
            .recent_events()
            .iter()
            .any(|e| e.message == "Rollback requested: Rolled back routing for CHASE"));
    }

    #[tokio::test]
    async fn test_rollback_with_empty_history() {
        let toolkit = InMemoryToolkit::new();
        let orchestrator =
            Orchestrator::new(config(&["WELLS"], None), Arc::new(toolkit.clone()), None).unwrap();
        let handle = orchestrator.handle();
        let task = tokio::spawn(orchestrator.run());

        let outcome = handle.rollback().await.unwrap();
        assert!(!outcome.is_success());
        assert_eq!(outcome.message, "No actions to rollback");

        handle.stop();
        task.await.unwrap();
        assert!(toolkit.route_calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_commands_fail_after_loop_ends() {
        let orchestrator =
            Orchestrator::new(config(&["BOA"], Some(1)), Arc::new(InMemoryToolkit::new()), None)
                .unwrap();
        let handle = orchestrator.handle();
        orchestrator.run().await;

        assert!(matches!(
            handle.rollback().await,
            Err(MonitorError::LoopStopped)
        ));
        assert!(handle.stop_injection("none").await.is_err());
    }

    #[tokio::test]
    async fn test_event_log_stays_bounded() {
        let orchestrator =
            Orchestrator::new(config(&["CHASE"], Some(60)), Arc::new(InMemoryToolkit::new()), None)
                .unwrap();
        let handle = orchestrator.handle();
        handle.inject_failure(chase_outage()).await.unwrap();
        orchestrator.run().await;

        assert_eq!(handle.recent_events().len(), 50);
    }

    #[tokio::test]
    async fn test_chat_uses_event_context() {
        let orchestrator =
            Orchestrator::new(config(&["CHASE"], Some(10)), Arc::new(InMemoryToolkit::new()), None)
                .unwrap()
                .with_chat_assistant(Arc::new(EchoAssistant));
        let handle = orchestrator.handle();

        let quiet = handle.chat("status?").await;
        assert!(quiet.contains("No recent significant events."));

        handle.inject_failure(chase_outage()).await.unwrap();
        orchestrator.run().await;

        let answer = handle.chat("What alerts did you see recently?").await;
        assert!(answer.contains("CHASE"));
        assert!(answer.contains("Watchdog"));
    }

    #[tokio::test]
    async fn test_chat_without_assistant() {
        let orchestrator =
            Orchestrator::new(config(&["BOA"], Some(1)), Arc::new(InMemoryToolkit::new()), None)
                .unwrap();
        let handle = orchestrator.handle();
        let answer = handle.chat("anything?").await;
        assert!(answer.starts_with("Error contacting assistant"));
    }
}
