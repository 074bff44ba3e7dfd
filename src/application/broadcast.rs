use crate::domain::diagnosis::AnomalyKind;
use crate::domain::event::EventEntry;
use crate::domain::transaction::Transaction;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// Short agent message attached to a transaction update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentLog {
    pub agent: String,
    pub message: String,
}

impl AgentLog {
    pub fn new(agent: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            message: message.into(),
        }
    }
}

/// Structured update pushed to every observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamUpdate {
    Transaction {
        data: Transaction,
        alert: Option<AnomalyKind>,
        agent_logs: Vec<AgentLog>,
    },
    Event {
        data: EventEntry,
    },
}

/// Best-effort fan-out of updates.
///
/// Built on `tokio::sync::broadcast`: a slow observer lags and loses old
/// updates instead of blocking the sender, and publishing with no observers
/// is not an error.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    sender: broadcast::Sender<StreamUpdate>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamUpdate> {
        self.sender.subscribe()
    }

    /// Publishes to all current observers and returns how many received it.
    pub fn publish(&self, update: StreamUpdate) -> usize {
        match self.sender.send(update) {
            Ok(observers) => observers,
            Err(_) => {
                trace!("No observers connected, update dropped");
                0
            }
        }
    }
}
