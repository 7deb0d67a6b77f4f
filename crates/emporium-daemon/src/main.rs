//! Emporium projection worker entry point.
//!
//! Connects to the event store, catches the product-catalog projection up
//! to the head of the feed, then polls for new events until interrupted.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use emporium_catalog::codec::EventCodec;
use emporium_core::store::EventStore;
use emporium_event_store::PgEventStore;
use emporium_projection::{
    CatchUpScheduler, InMemoryPositionStore, InMemoryReadModelStore, MissingRecordPolicy,
    ProjectionEngine, ReadModelStore,
};
use emporium_query::ProductQueryService;

const PROJECTION_NAME: &str = "product_catalog";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Emporium projection worker");

    // Read configuration from environment.
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| "DATABASE_URL environment variable must be set")?;
    let batch_size: usize = std::env::var("PROJECTION_BATCH_SIZE")
        .unwrap_or_else(|_| "256".to_string())
        .parse()
        .map_err(|e| format!("PROJECTION_BATCH_SIZE must be a valid usize: {e}"))?;
    let poll_interval_ms: u64 = std::env::var("PROJECTION_POLL_INTERVAL_MS")
        .unwrap_or_else(|_| "500".to_string())
        .parse()
        .map_err(|e| format!("PROJECTION_POLL_INTERVAL_MS must be a valid u64: {e}"))?;
    let rebuild = std::env::var("PROJECTION_REBUILD").is_ok_and(|v| v == "1" || v == "true");

    // Create database connection pool and make sure the schema exists.
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await?;
    let event_store = PgEventStore::new(pool);
    event_store.ensure_schema().await?;
    let event_store: Arc<dyn EventStore> = Arc::new(event_store);

    // Wire the projection pipeline. The read model and position store are
    // process-local; they catch up from the durable feed on every start.
    let read_models = Arc::new(InMemoryReadModelStore::new());
    let engine = Arc::new(ProjectionEngine::new(
        PROJECTION_NAME,
        EventCodec::new(),
        Arc::clone(&read_models) as Arc<dyn ReadModelStore>,
        Arc::new(InMemoryPositionStore::new()),
        MissingRecordPolicy::SkipAndWarn,
    ));
    let (scheduler, shutdown) = CatchUpScheduler::new(
        Arc::clone(&engine),
        event_store,
        batch_size,
        Duration::from_millis(poll_interval_ms),
    );

    if rebuild {
        let replayed = scheduler.rebuild().await?;
        tracing::info!(replayed, "projection rebuilt from the beginning");
    } else {
        let caught_up = scheduler.run_to_end().await?;
        tracing::info!(caught_up, "projection caught up to head");
    }

    let queries = ProductQueryService::new(engine.read_models());
    let catalog_size = queries
        .list_products(
            None,
            emporium_projection::SortField::Name,
            emporium_query::PageRequest::default(),
        )
        .await?
        .total_items;
    tracing::info!(catalog_size, "read model ready");

    // Poll until interrupted.
    let worker = tokio::spawn(scheduler.run());
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    shutdown.send(true)?;
    worker.await?;

    Ok(())
}
