//! RAM quota ledger.
//!
//! Quota moves between accounts only through [`RamAccount::transfer`], which
//! is all-or-nothing: either the full amount changes hands or neither side is
//! touched. Nothing is minted or dropped on the way.

use hopgate_core::error::{HopgateError, Result};

/// A RAM quota account: the broker's own pool, or a backing service's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RamAccount {
    name: String,
    avail: u64,
}

impl RamAccount {
    pub fn new(name: impl Into<String>, avail: u64) -> Self {
        Self { name: name.into(), avail }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn avail(&self) -> u64 {
        self.avail
    }

    /// Quota arriving from outside the ledger (a grant by the parent).
    pub fn credit(&mut self, amount: u64) {
        self.avail = self.avail.saturating_add(amount);
    }

    /// Move `amount` from this account into `to`.
    pub fn transfer(&mut self, to: &mut RamAccount, amount: u64) -> Result<()> {
        if amount > self.avail {
            return Err(HopgateError::TransferFailed {
                amount,
                available: self.avail,
            });
        }
        let Some(received) = to.avail.checked_add(amount) else {
            return Err(HopgateError::Internal(format!(
                "quota account {} would overflow",
                to.name
            )));
        };
        self.avail -= amount;
        to.avail = received;
        Ok(())
    }
}

/// Split of a create request's quota between the broker hop and the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaSplit {
    /// Quota donated by the client, moved in full to the service's account.
    pub requested: u64,
    /// Fixed per-session cost of the service, kept out of the forwarded args.
    pub cost: u64,
    /// Quota announced to the service in the forwarded args.
    pub forwarded: u64,
}

/// Reduce a session's quota by the service's fixed session cost.
pub fn split_session_quota(requested: u64, cost: u64) -> Result<QuotaSplit> {
    let Some(forwarded) = requested.checked_sub(cost) else {
        return Err(HopgateError::QuotaExceeded(format!(
            "session quota {requested} below session cost {cost}"
        )));
    };
    Ok(QuotaSplit { requested, cost, forwarded })
}
