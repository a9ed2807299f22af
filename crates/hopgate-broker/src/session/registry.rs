use std::collections::BTreeMap;

use hopgate_core::error::{HopgateError, Result};
use hopgate_core::SessionId;

use super::state::SessionState;

/// Session registry: `SessionId -> SessionState`.
///
/// Ordered by id so that revalidation and state reports walk sessions in a
/// stable order.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<SessionId, SessionState>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self { sessions: BTreeMap::new() }
    }

    /// Register a new session. Ids are never shared between sessions.
    pub fn insert(&mut self, session: SessionState) -> Result<()> {
        let id = session.id();
        if self.sessions.contains_key(&id) {
            return Err(HopgateError::ServiceDenied(format!("conflicting session id {id}")));
        }
        self.sessions.insert(id, session);
        Ok(())
    }

    pub fn remove(&mut self, id: SessionId) -> Option<SessionState> {
        self.sessions.remove(&id)
    }

    pub fn get(&self, id: SessionId) -> Option<&SessionState> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut SessionState> {
        self.sessions.get_mut(&id)
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SessionState> {
        self.sessions.values()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
