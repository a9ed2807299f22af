//! Policy layer (service declarations, label policy selection).
//!
//! Service declarations from the config are kept as immutable generations;
//! every config apply builds a fresh generation and swaps it in whole.

pub mod matcher;
pub mod store;

pub use matcher::{select_policy, Selected};
pub use store::{PolicyGeneration, PolicyStore, ServicePolicy};
