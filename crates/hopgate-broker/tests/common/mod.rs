//! Shared fixtures for broker tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use serde_json::{json, Value};

use hopgate_broker::app_state::AppState;
use hopgate_broker::config::{self, BrokerConfig};
use hopgate_broker::obs::ReportUpdateTrigger;
use hopgate_broker::parent::{ParentEvent, ParentLog};
use hopgate_broker::session::SessionState;
use hopgate_core::protocol::request::RequestReport;
use hopgate_core::protocol::response::ResponseCode;
use hopgate_core::SessionId;

/// `Nic` routed unconditionally to `driver` (cost 1024, deferred answers).
pub const NIC_TO_DRIVER: &str = r#"
version: 1
services:
  - name: Nic
    default_policy:
      child: { name: driver }
children:
  - name: driver
    provides: [Nic]
    session_cost: 1024
"#;

pub struct Harness {
    pub state: AppState<ParentLog>,
    pub report: ReportUpdateTrigger,
}

impl Harness {
    pub fn new(yaml: &str) -> Self {
        let (report, _rx) = ReportUpdateTrigger::new();
        let state = AppState::new(cfg(yaml), ParentLog::new(), report.clone()).unwrap();
        Self { state, report }
    }

    pub fn submit(&mut self, ram_grant: u64, requests: Vec<Value>) {
        self.state.dispatcher_mut().submit_requests(RequestReport { ram_grant, requests });
    }

    pub fn poll(&mut self) -> usize {
        self.state.dispatcher_mut().poll_children()
    }

    pub fn reload(&mut self, yaml: &str) -> Vec<SessionId> {
        self.state.reload(cfg(yaml)).unwrap()
    }

    pub fn events(&self) -> &[ParentEvent] {
        self.state.dispatcher().parent().events()
    }

    pub fn events_for(&self, id: u64) -> Vec<ParentEvent> {
        self.state.dispatcher().parent().for_id(SessionId::new(id))
    }

    pub fn take_events(&mut self) -> Vec<ParentEvent> {
        self.state.dispatcher_mut().parent_mut().take()
    }

    pub fn session(&self, id: u64) -> Option<&SessionState> {
        self.state.dispatcher().sessions().get(SessionId::new(id))
    }

    pub fn broker_ram(&self) -> u64 {
        self.state.dispatcher().ram().avail()
    }

    pub fn child_ram(&self, service: &str, child: &str) -> u64 {
        let key = hopgate_broker::child::ServiceKey::new(service, child);
        self.state.dispatcher().children().get(&key).unwrap().ram().avail()
    }
}

pub fn cfg(yaml: &str) -> BrokerConfig {
    config::load_from_str(yaml).unwrap()
}

pub fn create(id: u64, service: &str, ram_quota: u64, label: &str) -> Value {
    json!({
        "type": "create",
        "id": id,
        "service": service,
        "args": format!("ram_quota={ram_quota}, label=\"{label}\""),
    })
}

pub fn upgrade(id: u64, ram_quota: u64) -> Value {
    json!({ "type": "upgrade", "id": id, "ram_quota": ram_quota })
}

pub fn close(id: u64) -> Value {
    json!({ "type": "close", "id": id })
}

pub fn response(id: u64, code: ResponseCode) -> ParentEvent {
    ParentEvent::Response { id: SessionId::new(id), response: code }
}

pub fn is_cap(event: &ParentEvent, id: u64) -> bool {
    matches!(event, ParentEvent::Cap { id: got, .. } if got.value() == id)
}
