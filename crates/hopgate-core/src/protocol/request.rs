//! Session request reports (JSON).
//!
//! The parent publishes pending session requests as a batch:
//!
//! ```json
//! { "ram_grant": 8192,
//!   "requests": [
//!     { "type": "create", "id": 1, "service": "Nic", "args": "ram_quota=4096" },
//!     { "type": "upgrade", "id": 1, "ram_quota": 1024 },
//!     { "type": "close", "id": 1 } ] }
//! ```
//!
//! Entries are decoded one by one. An entry that is not an object, has no
//! usable `id`, or carries an unknown `type` is skipped without failing the
//! batch, since the parent expects no response for it.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{HopgateError, Result};
use crate::id::SessionId;
use crate::protocol::args::SessionArgs;

/// One batch of requests as published by the parent.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestReport {
    /// Quota the parent transferred to the broker before issuing the batch.
    #[serde(default)]
    pub ram_grant: u64,
    /// Raw entries, decoded lazily by [`RequestReport::requests`].
    #[serde(default)]
    pub requests: Vec<Value>,
}

/// Entry as it appears on the wire. Every field is optional so that missing
/// attributes are detected here instead of failing deserialization.
#[derive(Debug, Deserialize)]
struct RawRequest {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    service: Option<String>,
    #[serde(default)]
    args: Option<String>,
    #[serde(default)]
    ram_quota: Option<u64>,
}

/// Decoded session request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRequest {
    Create {
        id: SessionId,
        service: String,
        /// `None` if the entry carried no argument block.
        args: Option<SessionArgs>,
    },
    Upgrade {
        id: SessionId,
        ram_quota: u64,
    },
    Close {
        id: SessionId,
    },
}

impl SessionRequest {
    pub fn id(&self) -> SessionId {
        match self {
            SessionRequest::Create { id, .. }
            | SessionRequest::Upgrade { id, .. }
            | SessionRequest::Close { id } => *id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SessionRequest::Create { .. } => "create",
            SessionRequest::Upgrade { .. } => "upgrade",
            SessionRequest::Close { .. } => "close",
        }
    }
}

impl RequestReport {
    /// Decode all well-formed entries, in report order.
    pub fn requests(&self) -> Vec<SessionRequest> {
        self.requests.iter().filter_map(decode_entry).collect()
    }
}

/// Parse a request report from JSON text.
pub fn decode_report(s: &str) -> Result<RequestReport> {
    serde_json::from_str(s)
        .map_err(|e| HopgateError::BadRequest(format!("invalid request report: {e}")))
}

fn decode_entry(entry: &Value) -> Option<SessionRequest> {
    let raw: RawRequest = match RawRequest::deserialize(entry) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::debug!(error = %e, "skipping malformed session request");
            return None;
        }
    };

    let Some(id) = raw.id.map(SessionId::new) else {
        tracing::debug!("skipping session request without id");
        return None;
    };

    match raw.kind.as_deref() {
        Some("create") => Some(SessionRequest::Create {
            id,
            service: raw.service.unwrap_or_default(),
            args: raw.args.as_deref().map(SessionArgs::parse),
        }),
        Some("upgrade") => Some(SessionRequest::Upgrade {
            id,
            ram_quota: raw.ram_quota.unwrap_or(0),
        }),
        Some("close") => Some(SessionRequest::Close { id }),
        other => {
            tracing::debug!(%id, kind = ?other, "skipping session request of unknown type");
            None
        }
    }
}
