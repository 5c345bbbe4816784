// Configuration structure for:
// - Blockchair endpoint, API key and request pacing
// - Database connection string
// - Server listening address/port
// - Sync behaviour (page size, throttle cooldown, gap policy, polling)
// - Cache settings (size, TTL)
// - Transfer matching window and tolerance

use crate::blockchain::client::DEFAULT_BLOCKCHAIR_URL;
use crate::sync::GapPolicy;
use dotenv::dotenv;
use std::env;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub blockchair_url: String,
    pub blockchair_api_key: Option<String>,
    pub rpc_timeout_secs: u64,
    /// Requests per minute allowed towards the provider. `None` disables pacing.
    pub rpc_rate_limit: Option<u32>,
    pub snapshot_txn_limit: usize,
    pub throttle_cooldown: Duration,
    pub gap_policy: GapPolicy,
    pub cache_ttl: Duration,
    pub cache_max_capacity: u64,
    /// `None` when background polling is disabled.
    pub poll_interval: Option<Duration>,
    pub transfer_window_secs: u64,
    pub transfer_amount_tolerance: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:wallets.db".to_string(),
            server_host: "127.0.0.1".to_string(),
            server_port: 8080,
            blockchair_url: DEFAULT_BLOCKCHAIR_URL.to_string(),
            blockchair_api_key: None,
            rpc_timeout_secs: 10,
            // Blockchair's free tier allows 30 requests a minute
            rpc_rate_limit: Some(30),
            snapshot_txn_limit: 100,
            throttle_cooldown: Duration::from_secs(60),
            gap_policy: GapPolicy::Fail,
            cache_ttl: Duration::from_secs(60),
            cache_max_capacity: 1000,
            poll_interval: None,
            transfer_window_secs: 300,
            transfer_amount_tolerance: 0.01,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();
        let defaults = Self::default();

        let database_url = env::var("DATABASE_URL").unwrap_or(defaults.database_url);
        let server_host = env::var("SERVER_HOST").unwrap_or(defaults.server_host);
        let server_port = env::var("SERVER_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.server_port);
        let blockchair_url = env::var("BLOCKCHAIR_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.blockchair_url);
        let blockchair_api_key = env::var("BLOCKCHAIR_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        let rpc_timeout_secs = env::var("RPC_TIMEOUT_SECS")
            .map(|v| v.parse().unwrap_or(defaults.rpc_timeout_secs))
            .unwrap_or(defaults.rpc_timeout_secs);
        // 0 switches pacing off entirely
        let rpc_rate_limit = match env::var("RPC_RATE_LIMIT") {
            Ok(v) => v.parse::<u32>().ok().filter(|limit| *limit > 0),
            Err(_) => defaults.rpc_rate_limit,
        };
        let snapshot_txn_limit = env::var("SNAPSHOT_TXN_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|limit: &usize| *limit > 0)
            .unwrap_or(defaults.snapshot_txn_limit);
        let throttle_cooldown = env::var("THROTTLE_COOLDOWN_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.throttle_cooldown);
        let gap_policy = env::var("GAP_POLICY")
            .map(|v| parse_gap_policy(&v, defaults.gap_policy))
            .unwrap_or(defaults.gap_policy);
        let cache_ttl = env::var("CACHE_TTL")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.cache_ttl);
        let cache_max_capacity = env::var("CACHE_MAX_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.cache_max_capacity);
        let poll_interval = env::var("POLL_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        let transfer_window_secs = env::var("TRANSFER_WINDOW_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.transfer_window_secs);
        let transfer_amount_tolerance = env::var("TRANSFER_AMOUNT_TOLERANCE")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|tolerance| tolerance.is_finite() && *tolerance >= 0.0)
            .unwrap_or(defaults.transfer_amount_tolerance);

        Self {
            database_url,
            server_host,
            server_port,
            blockchair_url,
            blockchair_api_key,
            rpc_timeout_secs,
            rpc_rate_limit,
            snapshot_txn_limit,
            throttle_cooldown,
            gap_policy,
            cache_ttl,
            cache_max_capacity,
            poll_interval,
            transfer_window_secs,
            transfer_amount_tolerance,
        }
    }
}

/// An unrecognised policy is reported and replaced by `default`.
fn parse_gap_policy(raw: &str, default: GapPolicy) -> GapPolicy {
    raw.parse().unwrap_or_else(|e| {
        warn!("GAP_POLICY: {}, falling back to {:?}", e, default);
        default
    })
}
