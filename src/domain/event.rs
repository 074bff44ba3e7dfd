use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 50;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Info,
    Warning,
    Danger,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct EventEntry {
    /// Wall-clock time formatted as `HH:MM:SS`.
    pub timestamp: String,
    pub agent: String,
    pub message: String,
    pub level: EventLevel,
}

impl EventEntry {
    pub fn now(agent: impl Into<String>, message: impl Into<String>, level: EventLevel) -> Self {
        Self {
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            agent: agent.into(),
            message: message.into(),
            level,
        }
    }
}

/// Bounded log of recent events used as context for the chat assistant.
#[derive(Debug, Clone)]
pub struct EventLog {
    capacity: usize,
    entries: VecDeque<EventEntry>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_LOG_CAPACITY)
    }
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, entry: EventEntry) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn entries(&self) -> impl Iterator<Item = &EventEntry> {
        self.entries.iter()
    }

    pub fn snapshot(&self) -> Vec<EventEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the log as `[HH:MM:SS] agent: message` lines.
    pub fn render_context(&self) -> String {
        if self.entries.is_empty() {
            return "No recent significant events.".to_string();
        }
        self.entries
            .iter()
            .map(|e| format!("[{}] {}: {}", e.timestamp, e.agent, e.message))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_is_bounded_and_fifo() {
        let mut log = EventLog::new(50);
        for i in 0..60 {
            log.push(EventEntry::now("Watchdog", format!("event {i}"), EventLevel::Info));
        }
        assert_eq!(log.len(), 50);
        assert_eq!(log.entries().next().unwrap().message, "event 10");
        assert_eq!(log.entries().last().unwrap().message, "event 59");
    }

    #[test]
    fn test_render_context() {
        let mut log = EventLog::default();
        assert_eq!(log.render_context(), "No recent significant events.");

        log.push(EventEntry {
            timestamp: "10:00:00".into(),
            agent: "Watchdog".into(),
            message: "ALERT: LATENCY_SPIKE on CHASE".into(),
            level: EventLevel::Warning,
        });
        assert_eq!(
            log.render_context(),
            "[10:00:00] Watchdog: ALERT: LATENCY_SPIKE on CHASE"
        );
    }
}
