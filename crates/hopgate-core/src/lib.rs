//! hopgate core: transport-agnostic session-request primitives and error types.
//!
//! This crate defines the request/response contracts and error surface shared
//! by the broker and its tooling. It carries no runtime dependencies so it can
//! be reused wherever session requests are produced or consumed.
//!
//! # Failure surface
//! Panics, `unwrap`, and `expect` are compile-denied here. All fallible paths
//! surface as `HopgateError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod id;
pub mod label;
pub mod protocol;

pub use error::{HopgateError, ResponseCode, Result};
pub use id::SessionId;
pub use label::SessionLabel;
