// ABOUTME: Command implementations
// ABOUTME: Exports the reload command that drives a full run

pub mod reload;

pub use reload::{reload, ReloadSummary};
