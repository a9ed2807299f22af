//! hopgate facade.
//!
//! One dependency for embedders: the core session types under `core`, the
//! broker engine under `broker`, and the handful of types most callers
//! start from at the root.

pub mod core {
    pub use hopgate_core::*;
}

pub mod broker {
    pub use hopgate_broker::*;
}

pub use hopgate_broker::app_state::AppState;
pub use hopgate_broker::config::{load_from_file, load_from_str, BrokerConfig};
pub use hopgate_broker::dispatch::Dispatcher;
pub use hopgate_broker::parent::ParentProxy;
pub use hopgate_core::{HopgateError, ResponseCode, Result, SessionId, SessionLabel};
