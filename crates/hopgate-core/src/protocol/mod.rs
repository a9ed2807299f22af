//! Protocol modules (request reports, session args, responses).
//!
//! - `request`: the parent's batched session requests (JSON).
//! - `args`: `key=value` session argument strings carried by create requests.
//! - `response`: response codes and capabilities handed back to the parent.
//!
//! Decoding is panic-free and lenient where the parent expects leniency:
//! malformed entries are skipped, never turned into errors for the whole batch.

pub mod args;
pub mod request;
pub mod response;
