//! Parent side of the broker: where session results are delivered.

use std::io::Write;

use serde::Serialize;

use hopgate_core::protocol::response::{ResponseCode, SessionCap};
use hopgate_core::SessionId;

/// Proxy of the parent that issued the session requests.
pub trait ParentProxy {
    fn session_response(&mut self, id: SessionId, code: ResponseCode);

    fn deliver_session_cap(&mut self, id: SessionId, cap: SessionCap);
}

/// One delivery to the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParentEvent {
    Response {
        id: SessionId,
        #[serde(serialize_with = "code_str")]
        response: ResponseCode,
    },
    Cap {
        id: SessionId,
        cap: SessionCap,
    },
}

impl ParentEvent {
    pub fn id(&self) -> SessionId {
        match self {
            ParentEvent::Response { id, .. } | ParentEvent::Cap { id, .. } => *id,
        }
    }
}

fn code_str<S: serde::Serializer>(code: &ResponseCode, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(code.as_str())
}

/// Parent proxy that records every delivery in order.
#[derive(Debug, Default)]
pub struct ParentLog {
    events: Vec<ParentEvent>,
}

impl ParentLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[ParentEvent] {
        &self.events
    }

    /// Deliveries for one session, oldest first.
    pub fn for_id(&self, id: SessionId) -> Vec<ParentEvent> {
        self.events.iter().filter(|e| e.id() == id).copied().collect()
    }

    pub fn take(&mut self) -> Vec<ParentEvent> {
        std::mem::take(&mut self.events)
    }
}

impl ParentProxy for ParentLog {
    fn session_response(&mut self, id: SessionId, code: ResponseCode) {
        self.events.push(ParentEvent::Response { id, response: code });
    }

    fn deliver_session_cap(&mut self, id: SessionId, cap: SessionCap) {
        self.events.push(ParentEvent::Cap { id, cap });
    }
}

/// Parent proxy that writes one JSON object per delivery, e.g.
/// `{"id":1,"cap":1}` or `{"id":2,"response":"QUOTA_EXCEEDED"}`.
pub struct JsonLinesParent<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesParent<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn emit(&mut self, event: ParentEvent) {
        let res = serde_json::to_writer(&mut self.out, &event)
            .map_err(std::io::Error::from)
            .and_then(|()| self.out.write_all(b"\n"))
            .and_then(|()| self.out.flush());
        if let Err(e) = res {
            tracing::warn!(id = %event.id(), error = %e, "failed to deliver response to parent");
        }
    }
}

impl<W: Write> ParentProxy for JsonLinesParent<W> {
    fn session_response(&mut self, id: SessionId, code: ResponseCode) {
        self.emit(ParentEvent::Response { id, response: code });
    }

    fn deliver_session_cap(&mut self, id: SessionId, cap: SessionCap) {
        self.emit(ParentEvent::Cap { id, cap });
    }
}
