//! hopgate broker library entry.
//!
//! This crate wires the policy store, route resolver, quota ledger, session
//! registry and request dispatcher into the session broker. It is consumed by
//! the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod child;
pub mod config;
pub mod dispatch;
pub mod obs;
pub mod parent;
pub mod policy;
pub mod quota;
pub mod route;
pub mod session;
