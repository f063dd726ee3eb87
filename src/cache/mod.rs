use crate::redis_client::RedisClient;

pub mod shows;

pub use shows::CachedListing;

/// Redis-backed read cache. Every entry can be rebuilt from the store, so
/// cache failures are logged and never fail an engine call.
#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    ttl_secs: u64,
}

impl CacheService {
    pub fn new(redis: RedisClient, ttl_secs: u64) -> Self {
        Self { redis, ttl_secs }
    }
}
