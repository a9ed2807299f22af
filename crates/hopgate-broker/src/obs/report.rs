use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::session::{Phase, SessionState};

/// Fire-and-forget report-update hint.
///
/// Cloneable handle around a `watch` channel carrying a hint counter. Raising
/// a hint never blocks and never fails, whether or not anyone listens.
#[derive(Debug, Clone)]
pub struct ReportUpdateTrigger {
    tx: Arc<watch::Sender<u64>>,
}

impl ReportUpdateTrigger {
    pub fn new() -> (Self, watch::Receiver<u64>) {
        let (tx, rx) = watch::channel(0);
        (Self { tx: Arc::new(tx) }, rx)
    }

    pub fn trigger_report_update(&self) {
        self.tx.send_modify(|n| *n = n.wrapping_add(1));
    }

    /// Hints raised so far.
    pub fn count(&self) -> u64 {
        *self.tx.borrow()
    }
}

/// Snapshot of the broker for the state report.
#[derive(Debug, Clone, Serialize)]
pub struct StateReport {
    pub policy_generation: u64,
    pub ram_avail: u64,
    pub services: Vec<String>,
    pub sessions: Vec<SessionReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub id: u64,
    pub service: String,
    pub child: String,
    pub client_label: String,
    pub label: String,
    pub phase: Phase,
    pub ram_quota: u64,
    /// Upgrade quota not yet acknowledged by the service.
    pub ram_upgrade: u64,
}

impl From<&SessionState> for SessionReport {
    fn from(s: &SessionState) -> Self {
        Self {
            id: s.id().value(),
            service: s.service().service.clone(),
            child: s.service().child.clone(),
            client_label: s.client_label().to_string(),
            label: s.label().to_string(),
            phase: s.phase,
            ram_quota: s.donated_ram_quota(),
            ram_upgrade: s.ram_upgrade(),
        }
    }
}

impl StateReport {
    pub fn to_json(&self) -> String {
        // Plain strings and integers only; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}
