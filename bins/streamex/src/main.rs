//! streamex binary
//!
//! Entry point for running the matching engine, validating and creating
//! configuration files, and tailing a market's event log.

use anyhow::{Context, Result};
use cli::{Cli, Commands, TailFrom};
use common::{run_until_shutdown, ShutdownController, StreamKeys};
use config::{
    generate_default_config, load_config, save_config, validate_config, StreamexConfig,
};
use futures::StreamExt;
use matching_engine::store::{create_log_store, StoreType};
use matching_engine::{build_workers, run_markets, MarketFeed};
use observability::{init_logging, init_metrics, LogFormat};
use std::io::Write;
use std::path::Path;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Start { config, market } => start_command(config, market).await,
        Commands::Validate { config } => {
            init_logging("streamex", LogFormat::Pretty, "warn")?;
            validate_command(config).await
        }
        Commands::Init { output } => {
            init_logging("streamex", LogFormat::Pretty, "warn")?;
            init_command(output).await
        }
        Commands::Tail {
            config,
            market,
            from,
            limit,
        } => tail_command(config, market, from, limit).await,
    }
}

/// Load a config file, install logging from it and fail on any validation error
fn load_valid_config(config_path: &Path) -> Result<StreamexConfig> {
    let config = load_config(config_path)?;
    init_logging_from(&config)?;
    let report = validate_config(&config);

    for warning in &report.warnings {
        warn!(field = %warning.field, message = %warning.message, "Configuration warning");
    }

    if !report.is_valid() {
        for err in &report.errors {
            error!("{}", err);
        }
        anyhow::bail!(
            "configuration has {} error(s), run 'streamex validate' for details",
            report.errors.len()
        );
    }

    Ok(config)
}

fn init_logging_from(config: &StreamexConfig) -> Result<()> {
    let logging = config.logging();
    let format = LogFormat::parse(&logging.format).unwrap_or_default();
    init_logging("streamex", format, &logging.level)
}

async fn start_command<P: AsRef<Path>>(config_path: P, only_markets: Vec<String>) -> Result<()> {
    let config_path = config_path.as_ref();
    let mut config = load_valid_config(config_path)?;

    if !only_markets.is_empty() {
        if let Some(unknown) = only_markets
            .iter()
            .find(|m| !config.engine.markets.contains(m))
        {
            anyhow::bail!("market {unknown:?} is not configured in {config_path:?}");
        }
        config.engine.markets.retain(|m| only_markets.contains(m));
    }

    let metrics = config.metrics();
    if metrics.enabled {
        init_metrics(metrics.port).context("Failed to start metrics exporter")?;
    }

    info!(
        namespace = %config.engine.namespace,
        consumer = %config.engine.consumer_name,
        store = %config.store.store_type,
        markets = ?config.engine.markets,
        "Starting streamex engine"
    );

    let shutdown = ShutdownController::with_signals();
    let workers = build_workers(&config)
        .await
        .context("Failed to connect market workers")?;

    run_markets(workers, shutdown.token()).await?;

    info!("streamex engine stopped");
    Ok(())
}

async fn validate_command<P: AsRef<Path>>(config_path: P) -> Result<()> {
    info!(path = ?config_path.as_ref(), "Validating configuration");

    let config = match load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(%e, "Failed to load configuration");
            anyhow::bail!(e);
        }
    };

    let report = validate_config(&config);

    println!("\n=== Configuration Validation Report ===\n");

    if !report.defaults_applied.is_empty() {
        println!("Defaults Applied ({}):", report.defaults_applied.len());
        for default in &report.defaults_applied {
            println!("  [info] {} = {}", default.field, default.value);
        }
        println!();
    }

    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  [warn] [{}] {}", warning.field, warning.message);
        }
        println!();
    }

    if !report.errors.is_empty() {
        println!("Errors ({}):", report.errors.len());
        for err in &report.errors {
            println!("  [error] {}", err);
        }
        println!();
        anyhow::bail!("Configuration validation failed");
    }

    println!("[ok] Configuration is valid!");
    println!();
    println!("Namespace: {}", config.engine.namespace);
    println!("Consumer: {}", config.engine.consumer_name);
    println!("Store: {}", config.store.store_type);
    println!("Markets ({}):", config.engine.markets.len());
    for market in &config.engine.markets {
        let keys = StreamKeys::new(&config.engine.namespace, market);
        println!(
            "  - {} (commands: {}, events: {})",
            market, keys.command_stream, keys.event_stream
        );
    }

    Ok(())
}

async fn init_command<P: AsRef<Path>>(output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!(?output_path, "Initializing new configuration file");

    let config = generate_default_config();

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    save_config(&config, output_path)?;

    println!("[ok] Configuration file created successfully!");
    println!();
    println!("Location: {:?}", output_path);
    println!();
    println!("Next steps:");
    println!("  1. Set REDIS_HOST and REDIS_PASSWORD, or edit the store section");
    println!("  2. List the markets this engine should own under engine.markets");
    println!(
        "  3. Run 'streamex validate --config {:?}' to check configuration",
        output_path
    );
    println!(
        "  4. Run 'streamex start --config {:?}' to start the engine",
        output_path
    );

    Ok(())
}

async fn tail_command<P: AsRef<Path>>(
    config_path: P,
    market: String,
    from: TailFrom,
    limit: Option<usize>,
) -> Result<()> {
    let config = load_valid_config(config_path.as_ref())?;

    let store_type = StoreType::parse(&config.store.store_type)
        .with_context(|| format!("unknown store type {:?}", config.store.store_type))?;
    if store_type == StoreType::InMemory {
        warn!("In-memory store is private to each process, tail will only see its own writes");
    }
    let store = create_log_store(store_type, &config.store.redis).await?;

    let keys = StreamKeys::new(&config.engine.namespace, &market);
    info!(market = %market, stream = %keys.event_stream, from = ?from, "Tailing events");

    let feed = MarketFeed::new(&keys, store, from.as_cursor())
        .with_block_ms(config.engine.block_ms);
    let events = feed.into_stream();
    let events = match limit {
        Some(n) => events.take(n).left_stream(),
        None => events.right_stream(),
    };

    let shutdown = ShutdownController::with_signals();
    let printed = run_until_shutdown(shutdown.token(), print_events(events)).await;

    match printed {
        Some(result) => {
            let count = result?;
            debug!(count, "Tail finished");
        }
        None => debug!("Tail interrupted"),
    }
    Ok(())
}

async fn print_events<S>(events: S) -> Result<usize>
where
    S: futures::Stream<Item = matching_engine::store::StoreResult<matching_engine::EventEnvelope>>,
{
    futures::pin_mut!(events);
    let stdout = std::io::stdout();
    let mut count = 0;

    while let Some(event) = events.next().await {
        let event = event.context("Failed to read event stream")?;
        let line = serde_json::to_string(&event)?;
        let mut out = stdout.lock();
        writeln!(out, "{line}")?;
        out.flush()?;
        count += 1;
    }

    Ok(count)
}
