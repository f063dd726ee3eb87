use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::CacheService;
use crate::models::ShowAvailability;

// INCR on this key invalidates every listing written under older versions
const VERSION_KEY: &str = "shows:upcoming:version";

fn listing_key(version: u64) -> String {
    format!("shows:upcoming:v{}", version)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedListing {
    pub built_at: DateTime<Utc>,
    pub shows: Vec<ShowAvailability>,
}

impl CachedListing {
    /// The listing as of `now`. Snapshots built after `now` cannot answer.
    pub fn view_at(&self, now: DateTime<Utc>) -> Option<Vec<ShowAvailability>> {
        if now < self.built_at {
            return None;
        }
        Some(
            self.shows
                .iter()
                .filter(|entry| entry.show.start_time > now)
                .cloned()
                .collect(),
        )
    }
}

impl CacheService {
    pub async fn listing_version(&self) -> Result<u64, redis::RedisError> {
        let mut conn = self.redis.connection();
        let version: Option<u64> = conn.get(VERSION_KEY).await?;
        Ok(version.unwrap_or(0))
    }

    pub async fn get_upcoming(&self, version: u64) -> Result<Option<CachedListing>, redis::RedisError> {
        let mut conn = self.redis.connection();
        let data: Option<String> = conn.get(listing_key(version)).await?;
        match data {
            Some(data) => {
                let listing = serde_json::from_str(&data).map_err(|_| {
                    redis::RedisError::from((redis::ErrorKind::TypeError, "Parse error"))
                })?;
                Ok(Some(listing))
            }
            None => Ok(None),
        }
    }

    pub async fn store_upcoming(&self, version: u64, listing: &CachedListing) -> Result<(), redis::RedisError> {
        let data = serde_json::to_string(listing).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Serialize error"))
        })?;
        let mut conn = self.redis.connection();
        conn.set_ex(listing_key(version), data, self.ttl_secs).await
    }

    /// Must run before the caller of a committing operation gets its result.
    pub async fn invalidate_upcoming(&self) {
        let mut conn = self.redis.connection();
        let bumped: Result<u64, redis::RedisError> = conn.incr(VERSION_KEY, 1).await;
        match bumped {
            Ok(version) => debug!(version, "upcoming shows cache invalidated"),
            Err(e) => warn!("failed to invalidate upcoming shows cache: {:?}", e),
        }
    }
}
