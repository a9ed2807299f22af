//! Session identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of one forwarded session.
///
/// The parent assigns this id when it issues a request. The broker reuses it
/// verbatim as the id of the session it forwards to the backing service, so
/// there is exactly one id space: the parent-facing id and the broker-internal
/// id are bound 1:1 and never renumbered. Responses to the parent are keyed by
/// the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for SessionId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
