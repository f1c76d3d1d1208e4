//! Catalog Outbox worker.
//!
//! Runs the event dispatcher and the temp object collector against one
//! connection pool until Ctrl-C.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use catalog_outbox::adapters::postgres::{
    PostgresAdvisoryLocks, PostgresOutboxStore, PostgresTempObjectIndex, PostgresTransactionProvider,
};
use catalog_outbox::adapters::{EventDispatcher, LocalObjectStore, RedisMessageSink, TempObjectCollector};
use catalog_outbox::application::TransactionCoordinator;
use catalog_outbox::config::{AppConfig, RuntimeConfig};

fn init_tracing(runtime: &RuntimeConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&runtime.log_level));

    if runtime.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.runtime);

    tracing::info!(environment = ?config.runtime.environment, "Starting catalog outbox worker");

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let locks = Arc::new(PostgresAdvisoryLocks::new(pool.clone()));
    let coordinator = TransactionCoordinator::new(Arc::new(PostgresTransactionProvider::new(pool.clone())));

    let outbox = Arc::new(PostgresOutboxStore::new(
        pool.clone(),
        config.dispatcher.reservation_policy(),
    ));
    let sink = Arc::new(
        RedisMessageSink::connect(&config.redis.url, config.redis.channel_prefix.clone()).await?,
    );
    let dispatcher = EventDispatcher::with_config(
        locks.clone(),
        outbox,
        sink,
        config.dispatcher.loop_config(),
    );

    let collector = TempObjectCollector::new(
        locks,
        coordinator,
        Arc::new(PostgresTempObjectIndex::new()),
        Arc::new(LocalObjectStore::new(config.object_store.root.clone())),
        config.collector.loop_config(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let dispatcher_rx = shutdown_rx.clone();
    let dispatcher_task = tokio::spawn(async move { dispatcher.run(dispatcher_rx).await });
    let collector_task = tokio::spawn(async move { collector.run(shutdown_rx).await });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    shutdown_tx.send(true)?;

    let (dispatcher_result, collector_result) = tokio::join!(dispatcher_task, collector_task);
    if let Err(e) = dispatcher_result {
        tracing::error!(error = %e, "Event dispatcher task failed");
    }
    if let Err(e) = collector_result {
        tracing::error!(error = %e, "Temp object collector task failed");
    }

    pool.close().await;
    tracing::info!("Catalog outbox worker stopped");
    Ok(())
}
