//! Herald - activity feed aggregator for dashboard notifications

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use herald::{
    config::Args,
    feed::{FeedConfig, FeedScope, FeedService},
    poll::{feed_slot, spawn_refresh_task},
    store::{DocumentStore, MemoryStore, MongoStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("herald={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Herald - Activity Feed Aggregator");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB: {}", args.mongodb_uri);
    info!("Principal: {}", args.principal_id);
    if let Some(ref dep) = args.dependent_id {
        info!("Dependent: {}", dep);
    }
    info!("Poll interval: {}s", args.poll_interval_seconds);
    info!("Cache TTL: {}s", args.cache_ttl_seconds);
    info!("======================================");

    // Connect to MongoDB (falls back to in-memory store in dev mode)
    let store: Arc<dyn DocumentStore> =
        match MongoStore::new(&args.mongodb_uri, &args.mongodb_db).await {
            Ok(client) => {
                info!("MongoDB connected successfully");
                Arc::new(client)
            }
            Err(e) => {
                if args.dev_mode {
                    warn!("MongoDB connection failed (dev mode, using in-memory store): {}", e);
                    Arc::new(MemoryStore::new())
                } else {
                    error!("MongoDB connection failed: {}", e);
                    std::process::exit(1);
                }
            }
        };

    let config = FeedConfig {
        page_size: args.page_size,
        cache_ttl: Duration::from_secs(args.cache_ttl_seconds),
        resync_delay: Duration::from_millis(args.resync_delay_ms),
    };
    let service = Arc::new(FeedService::new(store, config));

    let scope = match &args.dependent_id {
        Some(dep) => FeedScope::with_dependent(&args.principal_id, dep),
        None => FeedScope::principal(&args.principal_id),
    };

    // Run the polling refresh until interrupted
    let slot = feed_slot();
    let handle = spawn_refresh_task(
        Arc::clone(&service),
        scope,
        Duration::from_secs(args.poll_interval_seconds),
        slot.clone(),
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    handle.abort();

    if let Some(feed) = slot.read().await.as_ref() {
        info!(
            items = feed.items.len(),
            unread = feed.unread_count,
            "Final feed state"
        );
    }

    Ok(())
}
