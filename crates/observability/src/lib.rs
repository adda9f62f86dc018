//! Observability infrastructure for the streamex engine
//!
//! This crate provides:
//! - Structured logging via tracing
//! - Prometheus metrics
//! - Per-market engine metric helpers
//!
//! # Quick Start
//!
//! ```ignore
//! use observability::{init_logging, LogFormat};
//!
//! init_logging("streamex", LogFormat::Pretty, "info")?;
//!
//! // Optional
//! observability::metrics::init_metrics(9090)?;
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat};
pub use self::metrics::{init_metrics, CommandOutcome, MarketMetrics};
