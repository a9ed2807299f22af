//! Reporting: report-update hints and the broker state report.
//!
//! The broker never renders or publishes reports itself. It raises a hint
//! through an injected [`ReportUpdateTrigger`] and whoever holds the receiving
//! end decides when to build a [`StateReport`].

pub mod report;

pub use report::{ReportUpdateTrigger, SessionReport, StateReport};
