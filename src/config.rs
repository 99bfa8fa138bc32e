//! Configuration for Herald
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use uuid::Uuid;

/// Herald - activity feed aggregator for dashboard notifications
#[derive(Parser, Debug, Clone)]
#[command(name = "herald")]
#[command(about = "Aggregates notifications, messages and grades into one unread-aware feed")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "herald")]
    pub mongodb_db: String,

    /// Principal (parent or teacher) whose feed this instance serves
    #[arg(long, env = "PRINCIPAL_ID")]
    pub principal_id: String,

    /// Dependent (student) whose activity the principal also sees
    #[arg(long, env = "DEPENDENT_ID")]
    pub dependent_id: Option<String>,

    /// Feed refresh interval in seconds
    #[arg(long, env = "POLL_INTERVAL_SECONDS", default_value = "60")]
    pub poll_interval_seconds: u64,

    /// Feed cache TTL in seconds
    #[arg(long, env = "CACHE_TTL_SECONDS", default_value = "60")]
    pub cache_ttl_seconds: u64,

    /// Items per feed page
    #[arg(long, env = "PAGE_SIZE", default_value = "20")]
    pub page_size: usize,

    /// Delay in milliseconds before the authoritative re-fetch after
    /// mark-all-read
    #[arg(long, env = "RESYNC_DELAY_MS", default_value = "500")]
    pub resync_delay_ms: u64,

    /// Enable development mode (falls back to an in-memory store when
    /// MongoDB is unreachable)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.principal_id.is_empty() {
            return Err("PRINCIPAL_ID must not be empty".to_string());
        }
        if self.page_size == 0 {
            return Err("PAGE_SIZE must be at least 1".to_string());
        }
        if self.poll_interval_seconds == 0 {
            return Err("POLL_INTERVAL_SECONDS must be at least 1".to_string());
        }
        if self.cache_ttl_seconds == 0 {
            return Err("CACHE_TTL_SECONDS must be at least 1".to_string());
        }
        Ok(())
    }
}
