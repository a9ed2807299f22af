use std::collections::VecDeque;

use tracing::{debug, warn};

use hopgate_core::error::{HopgateError, Result};
use hopgate_core::label::label_from_args;
use hopgate_core::protocol::args::SessionArgs;
use hopgate_core::protocol::request::{RequestReport, SessionRequest};
use hopgate_core::SessionId;

use crate::child::ChildRegistry;
use crate::obs::{ReportUpdateTrigger, SessionReport, StateReport};
use crate::parent::ParentProxy;
use crate::policy::PolicyStore;
use crate::quota::{split_session_quota, RamAccount};
use crate::route::{resolve, Route};
use crate::session::{Phase, SessionRegistry};

/// Handling of parent request batches. Set up the first time a config
/// declares a service, and kept from then on.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RequestListener {
    /// Policy generation that caused the setup.
    pub provisioned_at: u64,
    /// Batches handled since.
    pub batches: u64,
}

/// Session request dispatcher.
///
/// Owns the policy store, the session registry and the broker's RAM account,
/// and drives them from two stimuli: request batches from the parent
/// ([`Dispatcher::submit_requests`]) and responses of backing services
/// ([`Dispatcher::poll_children`]).
pub struct Dispatcher<P: ParentProxy> {
    pub(crate) policy: PolicyStore,
    pub(crate) children: ChildRegistry,
    pub(crate) sessions: SessionRegistry,
    pub(crate) ram: RamAccount,
    pub(crate) parent: P,
    pub(crate) report: ReportUpdateTrigger,
    pub(crate) listener: Option<RequestListener>,
    pub(crate) backlog: VecDeque<RequestReport>,
}

impl<P: ParentProxy> Dispatcher<P> {
    pub fn new(children: ChildRegistry, parent: P, report: ReportUpdateTrigger) -> Self {
        Self {
            policy: PolicyStore::new(),
            children,
            sessions: SessionRegistry::new(),
            ram: RamAccount::new("broker", 0),
            parent,
            report,
            listener: None,
            backlog: VecDeque::new(),
        }
    }

    pub fn parent(&self) -> &P {
        &self.parent
    }

    pub fn parent_mut(&mut self) -> &mut P {
        &mut self.parent
    }

    pub fn children(&self) -> &ChildRegistry {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut ChildRegistry {
        &mut self.children
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn ram(&self) -> &RamAccount {
        &self.ram
    }

    pub fn policy(&self) -> &PolicyStore {
        &self.policy
    }

    pub fn listener(&self) -> Option<RequestListener> {
        self.listener
    }

    /// Quota transferred to the broker by the parent.
    pub fn receive_quota(&mut self, amount: u64) {
        self.ram.credit(amount);
    }

    /// Resolve a route against the current policy and registry.
    pub fn resolve(&self, service_name: &str, label: &hopgate_core::SessionLabel) -> Result<Route> {
        resolve(self.policy.generation(), &self.children, service_name, label)
    }

    /// Accept a request batch. Batches arriving before any service has been
    /// declared wait until the listener is provisioned.
    pub fn submit_requests(&mut self, report: RequestReport) {
        if self.listener.is_none() {
            debug!(
                requests = report.requests.len(),
                "no service declared yet, deferring session requests"
            );
            self.backlog.push_back(report);
            return;
        }
        self.handle_session_requests(&report);
    }

    pub(crate) fn handle_session_requests(&mut self, report: &RequestReport) {
        // The parent hands over the quota before issuing the requests.
        self.receive_quota(report.ram_grant);

        for request in report.requests() {
            self.handle_session_request(request);
        }

        if let Some(listener) = self.listener.as_mut() {
            listener.batches += 1;
        }
        self.report.trigger_report_update();
    }

    fn handle_session_request(&mut self, request: SessionRequest) {
        match request {
            SessionRequest::Create { id, service, args } => {
                self.handle_create_session_request(id, &service, args)
            }
            SessionRequest::Upgrade { id, ram_quota } => {
                self.handle_upgrade_session_request(id, ram_quota)
            }
            SessionRequest::Close { id } => self.handle_close_session_request(id),
        }
    }

    fn handle_create_session_request(
        &mut self,
        id: SessionId,
        service: &str,
        args: Option<SessionArgs>,
    ) {
        let Some(args) = args else {
            debug!(%id, service, "ignoring create request without args");
            return;
        };

        if let Err(e) = self.create_session(id, service, args) {
            let code = e.response_code();
            debug!(%id, service, error = %e, response = code.as_str(), "session request denied");
            self.parent.session_response(id, code);
        }
    }

    fn create_session(&mut self, id: SessionId, name: &str, args: SessionArgs) -> Result<()> {
        let client_label = label_from_args(&args);
        let route = self.resolve(name, &client_label)?;

        if self.sessions.contains(id) {
            return Err(HopgateError::ServiceDenied(format!("conflicting session id {id}")));
        }

        // Reduce the session quota by the local session costs.
        let split = split_session_quota(args.ulong("ram_quota").unwrap_or(0), route.session_cost)?;
        let mut forward_args = args;
        forward_args.set_ulong("ram_quota", split.forwarded);

        let child = self
            .children
            .get_mut(&route.service)
            .ok_or_else(|| HopgateError::ServiceDenied(format!("no backing service {}", route.service)))?;

        let session =
            child.create_session(id, client_label, route.label, forward_args, split.forwarded);
        self.sessions.insert(session)?;

        // The parent must have granted the full session quota beforehand.
        if let Err(e) = self.ram.transfer(child.ram_mut(), split.requested) {
            warn!(%id, service = name, error = %e, "unable to transfer session quota of forwarded session");
            self.sessions.remove(id);
            return Err(HopgateError::ServiceDenied(format!(
                "session quota of {} bytes not available",
                split.requested
            )));
        }

        let Some(session) = self.sessions.get_mut(id) else {
            return Err(HopgateError::Internal(format!("session {id} vanished")));
        };

        child.initiate_request(session);

        // Not handled synchronously: kick off the asynchronous operation.
        if session.phase == Phase::CreateRequested {
            child.wakeup();
        }

        let phase = session.phase;
        match phase {
            Phase::InvalidArgs => Err(HopgateError::ServiceDenied(format!(
                "{} rejected the session arguments",
                route.service
            ))),
            Phase::QuotaExceeded => Err(HopgateError::QuotaExceeded(format!(
                "{} ran out of quota",
                route.service
            ))),
            Phase::Available => {
                self.session_ready(id);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn handle_upgrade_session_request(&mut self, id: SessionId, ram_quota: u64) {
        let Some(session) = self.sessions.get_mut(id) else {
            debug!(%id, "ignoring upgrade of unknown session");
            return;
        };
        if !session.is_open() {
            debug!(%id, phase = session.phase.as_str(), "ignoring upgrade of closed-out session");
            return;
        }
        let Some(child) = self.children.get_mut(session.service()) else {
            warn!(%id, service = %session.service(), "upgrade for session without backing service");
            return;
        };

        if let Err(e) = self.ram.transfer(child.ram_mut(), ram_quota) {
            warn!(%id, service = %session.service(), error = %e, "unable to upgrade session quota of forwarded session");
            return;
        }

        session.increase_donated_quota(ram_quota);
        session.phase = Phase::UpgradeRequested;
        child.initiate_request(session);
        child.wakeup();
    }

    fn handle_close_session_request(&mut self, id: SessionId) {
        if !self.sessions.contains(id) {
            debug!(%id, "ignoring close of unknown session");
            return;
        }
        self.close_session(id);
    }

    /// Snapshot for the state report.
    pub fn state_report(&self) -> StateReport {
        let generation = self.policy.generation();
        StateReport {
            policy_generation: generation.number(),
            ram_avail: self.ram.avail(),
            services: generation.services().iter().map(|s| s.name().to_string()).collect(),
            sessions: self.sessions.iter().map(SessionReport::from).collect(),
        }
    }
}
