//! Shared utilities for the streamex workspace
//!
//! # Modules
//!
//! - [`keys`] - Stream, consumer group and channel naming
//! - [`shutdown`] - Signal-driven graceful shutdown

pub mod keys;
pub mod shutdown;

pub use keys::{StreamKeys, DEFAULT_NAMESPACE};
pub use shutdown::{run_until_shutdown, ShutdownController};
