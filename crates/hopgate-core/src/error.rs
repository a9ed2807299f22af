//! Shared error type across hopgate crates.

use thiserror::Error;

/// Parent-facing response codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    /// Session established or upgraded.
    Ok,
    /// Session closed, quota returned.
    Closed,
    /// Denied: no route, no policy, or the service refused the arguments.
    InvalidArgs,
    /// Denied: the donated quota does not cover the session.
    QuotaExceeded,
}

impl ResponseCode {
    /// String representation used in response reports.
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseCode::Ok => "OK",
            ResponseCode::Closed => "CLOSED",
            ResponseCode::InvalidArgs => "INVALID_ARGS",
            ResponseCode::QuotaExceeded => "QUOTA_EXCEEDED",
        }
    }

}

/// Shared result type.
pub type Result<T> = std::result::Result<T, HopgateError>;

/// Unified error type used by core and broker.
#[derive(Debug, Error)]
pub enum HopgateError {
    #[error("service denied: {0}")]
    ServiceDenied(String),
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("unable to transfer {amount} bytes of quota ({available} available)")]
    TransferFailed { amount: u64, available: u64 },
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl HopgateError {
    /// Map an error to the response the parent receives for it.
    ///
    /// This is the only place where denial kinds are decided.
    pub fn response_code(&self) -> ResponseCode {
        match self {
            HopgateError::QuotaExceeded(_) => ResponseCode::QuotaExceeded,
            HopgateError::ServiceDenied(_)
            | HopgateError::TransferFailed { .. }
            | HopgateError::BadRequest(_)
            | HopgateError::UnsupportedVersion
            | HopgateError::Internal(_) => ResponseCode::InvalidArgs,
        }
    }
}
