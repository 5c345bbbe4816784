pub mod transaction;

pub use transaction::TransactionCacheManager;

use crate::config::Config;

pub fn init_cache(config: &Config) -> TransactionCacheManager {
    TransactionCacheManager::new(config.cache_max_capacity, config.cache_ttl)
}
