//! Hierarchical session labels.
//!
//! A label names the origin of a session. Each hop that forwards a request
//! prepends its own element, separated by `" -> "`, e.g. `"init -> app -> nic"`.

use std::fmt;

use serde::Serialize;

use crate::protocol::args::SessionArgs;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionLabel(String);

impl SessionLabel {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for SessionLabel {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionLabel {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for SessionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract the `label` argument of a session args string (empty if absent).
pub fn label_from_args(args: &SessionArgs) -> SessionLabel {
    args.find("label")
        .map(SessionLabel::from)
        .unwrap_or_default()
}
