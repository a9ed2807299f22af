//! Dispatcher module exports.
//!
//! The dispatcher is split by stimulus: parent request batches
//! (`dispatcher`), backing-service completions (`lifecycle`), and config
//! changes (`revalidate`).

pub mod dispatcher;
mod lifecycle;
mod revalidate;

pub use dispatcher::{Dispatcher, RequestListener};
