//! Engine runtime: one worker per market over the log store

mod handling;
mod worker;

pub use handling::{apply_command, Applied};
pub use worker::{MarketWorker, WorkerSettings, WorkerState, WorkerStats};

use std::sync::Arc;

use common::StreamKeys;
use config::StreamexConfig;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::RuntimeError;
use crate::store::{create_log_store, InMemoryLogStore, LogStore, StoreType};

/// Build one worker per configured market
///
/// Redis workers each get their own connection because a blocking read
/// holds it. The in-memory store is shared so all markets live in one log.
pub async fn build_workers(config: &StreamexConfig) -> Result<Vec<MarketWorker>, RuntimeError> {
    let store_type = StoreType::parse(&config.store.store_type).ok_or_else(|| {
        RuntimeError::Config(format!("unknown store type {:?}", config.store.store_type))
    })?;
    let settings = WorkerSettings::from(&config.engine);

    let shared: Option<Arc<dyn LogStore>> = match store_type {
        StoreType::InMemory => Some(Arc::new(InMemoryLogStore::new())),
        StoreType::Redis => None,
    };

    let mut workers = Vec::with_capacity(config.engine.markets.len());
    for market in &config.engine.markets {
        let store = match &shared {
            Some(store) => Arc::clone(store),
            None => create_log_store(store_type, &config.store.redis).await?,
        };
        let keys = StreamKeys::new(&config.engine.namespace, market);
        workers.push(MarketWorker::new(keys, settings.clone(), store));
    }

    Ok(workers)
}

/// Run all workers until `shutdown` is cancelled
///
/// The first worker failure cancels the others; that error is returned
/// once every worker has stopped.
pub async fn run_markets(
    workers: Vec<MarketWorker>,
    shutdown: CancellationToken,
) -> Result<(), RuntimeError> {
    let group = shutdown.child_token();
    let mut tasks = JoinSet::new();

    for worker in workers {
        let market = worker.market().to_string();
        let token = group.child_token();
        info!(market = %market, "Starting market worker");
        tasks.spawn(async move { (market, worker.run(token).await) });
    }

    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        let failure = match joined {
            Ok((_, Ok(_))) => None,
            Ok((market, Err(e))) => {
                error!(market = %market, error = %e, "Market worker failed, stopping all workers");
                Some(e)
            }
            Err(join_error) => {
                error!(error = %join_error, "Market worker task aborted, stopping all workers");
                Some(RuntimeError::Worker {
                    market: "unknown".to_string(),
                    message: join_error.to_string(),
                })
            }
        };

        if let Some(e) = failure {
            group.cancel();
            if first_error.is_none() {
                first_error = Some(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
