//! Parent-facing results.

use std::fmt;

use serde::Serialize;

pub use crate::error::ResponseCode;

/// Capability handed to the parent once a forwarded session is available.
///
/// Opaque to the broker: the backing service mints it, the parent receives it
/// keyed by the session id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionCap(u64);

impl SessionCap {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionCap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cap#{}", self.0)
    }
}
