//! Session lifecycle: completions reported by backing services.

use tracing::{debug, warn};

use hopgate_core::protocol::response::ResponseCode;
use hopgate_core::SessionId;

use crate::child::{ChildResponse, ServiceKey};
use crate::parent::ParentProxy;
use crate::session::Phase;

use super::Dispatcher;

impl<P: ParentProxy> Dispatcher<P> {
    /// Collect and apply the responses of all backing services.
    /// Returns the number of responses applied.
    pub fn poll_children(&mut self) -> usize {
        let mut responses = Vec::new();
        for child in self.children.iter_mut() {
            let key = child.key();
            responses.extend(child.take_responses().into_iter().map(|r| (key.clone(), r)));
        }

        let count = responses.len();
        for (from, response) in responses {
            self.handle_child_response(&from, response);
        }
        count
    }

    /// Apply one response of the backing service `from`.
    pub fn handle_child_response(&mut self, from: &ServiceKey, response: ChildResponse) {
        let id = response.id();
        let Some(session) = self.sessions.get_mut(id) else {
            debug!(%id, service = %from, "response for unknown session");
            return;
        };
        if session.service() != from {
            warn!(%id, service = %from, bound = %session.service(), "response from foreign service");
            return;
        }

        match response {
            ChildResponse::Delivered { cap, .. } => {
                let creating = matches!(session.phase, Phase::CreateRequested | Phase::UpgradeRequested);
                if !creating || session.cap.is_some() {
                    warn!(%id, phase = session.phase.as_str(), "unexpected session delivery");
                    return;
                }
                session.cap = Some(cap);
                if session.upgrade_pending() {
                    // Upgraded before delivery: hand out now, acknowledgments follow.
                    self.report.trigger_report_update();
                    self.parent.deliver_session_cap(id, cap);
                    return;
                }
                session.phase = Phase::Available;
                self.session_ready(id);
            }
            ChildResponse::Upgraded { .. } => {
                if session.phase.is_denied() || session.upgrade_done().is_none() {
                    warn!(%id, phase = session.phase.as_str(), "unexpected upgrade response");
                    return;
                }
                if session.phase == Phase::UpgradeRequested
                    && !session.upgrade_pending()
                    && session.cap.is_some()
                {
                    session.phase = Phase::CapHandedOut;
                }
                self.report.trigger_report_update();
                self.parent.session_response(id, ResponseCode::Ok);
            }
            ChildResponse::Denied { .. } => self.session_denied(id, Phase::InvalidArgs),
            ChildResponse::QuotaExceeded { .. } => self.session_denied(id, Phase::QuotaExceeded),
            ChildResponse::Closed { .. } => self.session_closed(id),
        }
    }

    /// The backing service made a session available.
    pub(crate) fn session_ready(&mut self, id: SessionId) {
        self.report.trigger_report_update();

        let Some(session) = self.sessions.get_mut(id) else {
            return;
        };
        if session.phase != Phase::Available {
            return;
        }
        match session.cap {
            Some(cap) => {
                self.parent.deliver_session_cap(id, cap);
                session.phase = Phase::CapHandedOut;
            }
            None => warn!(%id, "session available without capability"),
        }
    }

    /// Creation failed on the service side after the request was initiated.
    /// The session stays registered in its denial phase.
    fn session_denied(&mut self, id: SessionId, phase: Phase) {
        let Some(session) = self.sessions.get_mut(id) else {
            return;
        };
        let creating = matches!(session.phase, Phase::CreateRequested | Phase::UpgradeRequested);
        if !creating || session.cap.is_some() {
            warn!(%id, phase = session.phase.as_str(), "unexpected denial of established session");
            return;
        }
        session.phase = phase;
        self.report.trigger_report_update();

        let code = match phase {
            Phase::QuotaExceeded => ResponseCode::QuotaExceeded,
            _ => ResponseCode::InvalidArgs,
        };
        debug!(%id, response = code.as_str(), "forwarded session denied by backing service");
        self.parent.session_response(id, code);
    }

    /// The backing service closed the session: tell the parent, take back
    /// the donated quota, then drop the session.
    pub(crate) fn session_closed(&mut self, id: SessionId) {
        self.report.trigger_report_update();

        let Some(session) = self.sessions.get(id) else {
            return;
        };
        let service = session.service().clone();
        let donated = session.donated_ram_quota();

        self.parent.session_response(id, ResponseCode::Closed);

        match self.children.get_mut(&service) {
            Some(child) => {
                if let Err(e) = child.ram_mut().transfer(&mut self.ram, donated) {
                    warn!(%id, %service, error = %e, "unable to return quota of closed session");
                }
            }
            None => warn!(%id, %service, "closed session outlived its backing service"),
        }

        self.sessions.remove(id);
    }

    /// Close path shared by parent close requests and revalidation.
    pub(crate) fn close_session(&mut self, id: SessionId) {
        let Some(session) = self.sessions.get_mut(id) else {
            return;
        };
        if session.phase.is_denied() {
            debug!(%id, phase = session.phase.as_str(), "session already denied, nothing to close");
            return;
        }

        session.phase = Phase::CloseRequested;
        if let Some(child) = self.children.get_mut(session.service()) {
            child.initiate_request(session);
            child.wakeup();
            return;
        }

        warn!(%id, "backing service gone, closing locally");
        self.session_closed(id);
    }
}
