use std::collections::VecDeque;

use hopgate_core::protocol::response::SessionCap;

use crate::config::{ChildConfig, ResponseMode};
use crate::quota::RamAccount;
use crate::session::{Phase, SessionState};

use super::{ChildResponse, ChildService};

/// In-process backing service. Answers requests according to its
/// [`ResponseMode`]; deferred answers are produced only after a wakeup.
pub struct LoopbackChild {
    service: String,
    child: String,
    abandoned: bool,
    session_cost: u64,
    ram: RamAccount,
    mode: ResponseMode,
    awake: bool,
    pending: VecDeque<ChildResponse>,
    next_cap: u64,
}

impl LoopbackChild {
    pub fn new(
        service: impl Into<String>,
        child: impl Into<String>,
        session_cost: u64,
        ram_quota: u64,
        mode: ResponseMode,
    ) -> Self {
        let service = service.into();
        let child = child.into();
        Self {
            ram: RamAccount::new(format!("{child}/{service}"), ram_quota),
            service,
            child,
            abandoned: false,
            session_cost,
            mode,
            awake: false,
            pending: VecDeque::new(),
            next_cap: 1,
        }
    }

    /// One loopback service per entry of `cfg.provides`.
    pub fn from_config(cfg: &ChildConfig) -> Vec<Self> {
        cfg.provides
            .iter()
            .map(|svc| Self::new(svc, &cfg.name, cfg.session_cost, cfg.ram_quota, cfg.response))
            .collect()
    }

    fn mint_cap(&mut self) -> SessionCap {
        let cap = SessionCap::new(self.next_cap);
        self.next_cap += 1;
        cap
    }

    fn initiate_create(&mut self, session: &mut SessionState) {
        let id = session.id();
        match self.mode {
            ResponseMode::Immediate => {
                session.cap = Some(self.mint_cap());
                session.phase = Phase::Available;
            }
            ResponseMode::Deny => session.phase = Phase::InvalidArgs,
            ResponseMode::Exceed => session.phase = Phase::QuotaExceeded,
            ResponseMode::Deferred => {
                let cap = self.mint_cap();
                self.pending.push_back(ChildResponse::Delivered { id, cap });
            }
            ResponseMode::DeferredDeny => self.pending.push_back(ChildResponse::Denied { id }),
            ResponseMode::DeferredExceed => {
                self.pending.push_back(ChildResponse::QuotaExceeded { id })
            }
        }
    }
}

impl ChildService for LoopbackChild {
    fn name(&self) -> &str {
        &self.service
    }

    fn child_name(&self) -> &str {
        &self.child
    }

    fn abandoned(&self) -> bool {
        self.abandoned
    }

    fn abandon(&mut self) {
        self.abandoned = true;
    }

    fn session_cost(&self) -> u64 {
        self.session_cost
    }

    fn ram(&self) -> &RamAccount {
        &self.ram
    }

    fn ram_mut(&mut self) -> &mut RamAccount {
        &mut self.ram
    }

    fn initiate_request(&mut self, session: &mut SessionState) {
        let id = session.id();
        match session.phase {
            Phase::CreateRequested => self.initiate_create(session),
            Phase::UpgradeRequested => self.pending.push_back(ChildResponse::Upgraded { id }),
            Phase::CloseRequested => self.pending.push_back(ChildResponse::Closed { id }),
            // nothing to forward
            Phase::Available | Phase::CapHandedOut | Phase::InvalidArgs | Phase::QuotaExceeded => {}
        }
    }

    fn wakeup(&mut self) {
        self.awake = true;
    }

    fn take_responses(&mut self) -> Vec<ChildResponse> {
        if !self.awake {
            return Vec::new();
        }
        self.awake = false;
        self.pending.drain(..).collect()
    }
}
