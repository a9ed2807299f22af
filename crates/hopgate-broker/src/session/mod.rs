//! Forwarded sessions: lifecycle state and the registry keyed by session id.

mod registry;
mod state;

pub use registry::SessionRegistry;
pub use state::{Phase, SessionState};
