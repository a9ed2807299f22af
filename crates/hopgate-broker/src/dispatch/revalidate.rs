//! Config apply: policy rebuild, listener provisioning, route revalidation.

use tracing::{debug, info};

use hopgate_core::SessionId;

use crate::config::ServiceConfig;
use crate::parent::ParentProxy;

use super::dispatcher::RequestListener;
use super::Dispatcher;

impl<P: ParentProxy> Dispatcher<P> {
    /// Apply the service declarations of a new config.
    ///
    /// Returns the ids of the sessions closed because their route changed.
    pub fn apply_config(&mut self, services: &[ServiceConfig]) -> Vec<SessionId> {
        let generation = self.policy.rebuild(services);
        debug!(generation, services = services.len(), "policy rebuilt");

        // Handle parent requests only once there is something to serve.
        if self.listener.is_none() && !self.policy.generation().is_empty() {
            info!(generation, "providing services, handling session requests");
            self.listener = Some(RequestListener {
                provisioned_at: generation,
                batches: 0,
            });
            while let Some(report) = self.backlog.pop_front() {
                self.handle_session_requests(&report);
            }
        }

        self.revalidate()
    }

    /// Close every open session whose route no longer matches the policy.
    pub fn revalidate(&mut self) -> Vec<SessionId> {
        let stale: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|s| s.is_open())
            .filter(|s| match self.resolve(&s.service().service, s.client_label()) {
                Ok(route) => route.service != *s.service() || route.label != *s.label(),
                Err(_) => true,
            })
            .map(|s| s.id())
            .collect();

        for id in &stale {
            info!(%id, "route of session changed, closing it");
            self.close_session(*id);
        }
        stale
    }
}
