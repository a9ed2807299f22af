//! Backing services provided by children.
//!
//! A backing service is reached through the [`ChildService`] capability
//! interface and looked up in the [`ChildRegistry`] by `(service, child)`.
//! The broker never owns the service's sessions on the other side; it only
//! initiates requests, wakes the service up, and later collects its
//! [`ChildResponse`]s.

mod loopback;

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use hopgate_core::protocol::args::SessionArgs;
use hopgate_core::protocol::response::SessionCap;
use hopgate_core::{SessionId, SessionLabel};

use crate::quota::RamAccount;
use crate::session::SessionState;

pub use loopback::LoopbackChild;

/// Registry key of a backing service.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ServiceKey {
    pub service: String,
    pub child: String,
}

impl ServiceKey {
    pub fn new(service: impl Into<String>, child: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            child: child.into(),
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.service, self.child)
    }
}

/// Asynchronous outcome reported by a backing service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildResponse {
    /// Session created; the capability is ready for the parent.
    Delivered { id: SessionId, cap: SessionCap },
    /// Session creation refused.
    Denied { id: SessionId },
    /// Session creation failed for lack of quota.
    QuotaExceeded { id: SessionId },
    /// Quota upgrade accepted.
    Upgraded { id: SessionId },
    /// Session closed on the service side.
    Closed { id: SessionId },
}

impl ChildResponse {
    pub fn id(&self) -> SessionId {
        match self {
            ChildResponse::Delivered { id, .. }
            | ChildResponse::Denied { id }
            | ChildResponse::QuotaExceeded { id }
            | ChildResponse::Upgraded { id }
            | ChildResponse::Closed { id } => *id,
        }
    }
}

/// Capability interface of one service provided by one child.
pub trait ChildService {
    /// Service name.
    fn name(&self) -> &str;

    fn child_name(&self) -> &str;

    /// An abandoned service accepts no new sessions.
    fn abandoned(&self) -> bool;

    fn abandon(&mut self);

    /// Quota kept from every session for the service's own bookkeeping.
    fn session_cost(&self) -> u64;

    fn ram(&self) -> &RamAccount;

    fn ram_mut(&mut self) -> &mut RamAccount;

    /// Hand the session's current request (per its phase) to the service.
    ///
    /// A service that can answer right away updates `session.phase` (and
    /// `session.cap`) before returning; otherwise it leaves the phase alone
    /// and answers later through [`ChildService::take_responses`].
    fn initiate_request(&mut self, session: &mut SessionState);

    /// Ask the service to make progress on pending requests.
    fn wakeup(&mut self);

    /// Collect responses produced since the last call.
    fn take_responses(&mut self) -> Vec<ChildResponse>;

    fn key(&self) -> ServiceKey {
        ServiceKey::new(self.name(), self.child_name())
    }

    /// Session creation entry point: a fresh session bound to this service.
    fn create_session(
        &self,
        id: SessionId,
        client_label: SessionLabel,
        label: SessionLabel,
        args: SessionArgs,
        donated_ram_quota: u64,
    ) -> SessionState {
        SessionState::new(id, self.key(), client_label, label, args, donated_ram_quota)
    }
}

/// Backing services keyed by `(service, child)`.
#[derive(Default)]
pub struct ChildRegistry {
    services: BTreeMap<ServiceKey, Box<dyn ChildService>>,
}

impl ChildRegistry {
    pub fn new() -> Self {
        Self { services: BTreeMap::new() }
    }

    /// Register a service, returning the one it replaces.
    pub fn register(&mut self, svc: Box<dyn ChildService>) -> Option<Box<dyn ChildService>> {
        self.services.insert(svc.key(), svc)
    }

    pub fn remove(&mut self, key: &ServiceKey) -> Option<Box<dyn ChildService>> {
        self.services.remove(key)
    }

    pub fn get(&self, key: &ServiceKey) -> Option<&(dyn ChildService + 'static)> {
        self.services.get(key).map(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, key: &ServiceKey) -> Option<&mut (dyn ChildService + 'static)> {
        self.services.get_mut(key).map(|s| s.as_mut())
    }

    pub fn iter(&self) -> impl Iterator<Item = &(dyn ChildService + 'static)> {
        self.services.values().map(|s| s.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn ChildService>> {
        self.services.values_mut()
    }

    pub fn keys(&self) -> Vec<ServiceKey> {
        self.services.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
