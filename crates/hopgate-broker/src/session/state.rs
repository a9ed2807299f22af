use std::collections::VecDeque;

use serde::Serialize;

use hopgate_core::protocol::args::SessionArgs;
use hopgate_core::protocol::response::SessionCap;
use hopgate_core::{SessionId, SessionLabel};

use crate::child::ServiceKey;

/// Lifecycle phase of a forwarded session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Forwarded, waiting for the service.
    CreateRequested,
    /// The service produced a capability that the parent has not seen yet.
    Available,
    /// The parent holds the capability.
    CapHandedOut,
    /// Extra quota forwarded, waiting for the service.
    UpgradeRequested,
    /// Close forwarded, waiting for the service.
    CloseRequested,
    /// Terminal: the service refused the arguments.
    InvalidArgs,
    /// Terminal: the service ran out of quota.
    QuotaExceeded,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::CreateRequested => "CREATE_REQUESTED",
            Phase::Available => "AVAILABLE",
            Phase::CapHandedOut => "CAP_HANDED_OUT",
            Phase::UpgradeRequested => "UPGRADE_REQUESTED",
            Phase::CloseRequested => "CLOSE_REQUESTED",
            Phase::InvalidArgs => "INVALID_ARGS",
            Phase::QuotaExceeded => "QUOTA_EXCEEDED",
        }
    }

    /// Denial phases are never left once entered.
    pub fn is_denied(self) -> bool {
        matches!(self, Phase::InvalidArgs | Phase::QuotaExceeded)
    }
}

/// One forwarded session.
#[derive(Debug, Clone)]
pub struct SessionState {
    id: SessionId,
    service: ServiceKey,
    client_label: SessionLabel,
    label: SessionLabel,
    args: SessionArgs,
    donated_ram_quota: u64,
    upgrades: VecDeque<u64>,
    pub phase: Phase,
    pub cap: Option<SessionCap>,
}

impl SessionState {
    pub fn new(
        id: SessionId,
        service: ServiceKey,
        client_label: SessionLabel,
        label: SessionLabel,
        args: SessionArgs,
        donated_ram_quota: u64,
    ) -> Self {
        Self {
            id,
            service,
            client_label,
            label,
            args,
            donated_ram_quota,
            upgrades: VecDeque::new(),
            phase: Phase::CreateRequested,
            cap: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Backing service the session is bound to.
    pub fn service(&self) -> &ServiceKey {
        &self.service
    }

    /// Label as requested by the client, before policy rewriting.
    pub fn client_label(&self) -> &SessionLabel {
        &self.client_label
    }

    /// Label the session was forwarded with.
    pub fn label(&self) -> &SessionLabel {
        &self.label
    }

    /// Forwarded args (with `ram_quota` already reduced by the session cost).
    pub fn args(&self) -> &SessionArgs {
        &self.args
    }

    pub fn donated_ram_quota(&self) -> u64 {
        self.donated_ram_quota
    }

    /// Quota of the upgrades still waiting for the service.
    pub fn ram_upgrade(&self) -> u64 {
        self.upgrades.iter().sum()
    }

    pub fn upgrade_pending(&self) -> bool {
        !self.upgrades.is_empty()
    }

    /// Record an upgrade whose quota has already reached the service.
    pub fn increase_donated_quota(&mut self, amount: u64) {
        self.donated_ram_quota = self.donated_ram_quota.saturating_add(amount);
        self.upgrades.push_back(amount);
    }

    /// The service acknowledged the oldest pending upgrade.
    pub fn upgrade_done(&mut self) -> Option<u64> {
        self.upgrades.pop_front()
    }

    /// Open sessions take part in revalidation and accept close requests.
    pub fn is_open(&self) -> bool {
        !self.phase.is_denied() && self.phase != Phase::CloseRequested
    }
}
