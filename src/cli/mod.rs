//! CLI plumbing around the library scan run.
//!
//! - [`logging`]: tracing subscriber set-up
//! - [`scan`]: configuration loading and forge wiring
//! - [`output`]: run summary printed on stdout

pub mod logging;
pub mod output;
pub mod scan;
