//! Prometheus metrics infrastructure
//!
//! This module installs the Prometheus exporter and defines the per-market
//! metric set recorded by the engine workers.

use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Initialize the Prometheus metrics exporter
///
/// This starts an HTTP listener on the specified port that exposes metrics
/// at the `/metrics` endpoint.
///
/// # Example
///
/// ```ignore
/// observability::metrics::init_metrics(9090)?;
/// // Metrics available at http://localhost:9090/metrics
/// ```
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    tracing::info!(%addr, "Metrics server listening");
    Ok(())
}

/// How one command record was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Applied by the book
    Accepted,
    /// Well-formed but rejected by the book
    Rejected,
    /// Could not be decoded and was dropped
    Malformed,
}

impl CommandOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandOutcome::Accepted => "accepted",
            CommandOutcome::Rejected => "rejected",
            CommandOutcome::Malformed => "malformed",
        }
    }
}

/// Metrics for one market worker
///
/// # Metrics
///
/// * `engine_commands_total{market, outcome}` - Command records by outcome
/// * `engine_trades_total{market}` - Trades produced
/// * `engine_events_appended_total{market}` - Events written to the event log
/// * `engine_batch_duration_seconds{market}` - Time to process one read batch
/// * `engine_last_seq{market}` - Last sequence applied by the book
#[derive(Clone)]
pub struct MarketMetrics {
    accepted: Counter,
    rejected: Counter,
    malformed: Counter,
    trades: Counter,
    events_appended: Counter,
    batch_duration: Histogram,
    last_seq: Gauge,
    market: String,
}

impl MarketMetrics {
    /// Register the metric set for a market
    pub fn new(market: &str) -> Self {
        let name = market.to_string();
        let outcome = |o: CommandOutcome| {
            counter!("engine_commands_total", "market" => name.clone(), "outcome" => o.as_str())
        };

        Self {
            accepted: outcome(CommandOutcome::Accepted),
            rejected: outcome(CommandOutcome::Rejected),
            malformed: outcome(CommandOutcome::Malformed),
            trades: counter!("engine_trades_total", "market" => name.clone()),
            events_appended: counter!("engine_events_appended_total", "market" => name.clone()),
            batch_duration: histogram!("engine_batch_duration_seconds", "market" => name.clone()),
            last_seq: gauge!("engine_last_seq", "market" => name.clone()),
            market: name,
        }
    }

    /// Count one handled command record
    pub fn record_command(&self, outcome: CommandOutcome) {
        match outcome {
            CommandOutcome::Accepted => self.accepted.increment(1),
            CommandOutcome::Rejected => self.rejected.increment(1),
            CommandOutcome::Malformed => self.malformed.increment(1),
        }
    }

    pub fn record_trades(&self, count: u64) {
        self.trades.increment(count);
    }

    pub fn record_events_appended(&self, count: u64) {
        self.events_appended.increment(count);
    }

    pub fn record_batch(&self, duration: Duration) {
        self.batch_duration.record(duration.as_secs_f64());
    }

    /// Gauges are f64, so very large sequences lose precision here only
    pub fn set_last_seq(&self, seq: u128) {
        self.last_seq.set(seq as f64);
    }

    /// Get the market name
    pub fn market(&self) -> &str {
        &self.market
    }
}
