pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod redis_client;
pub mod services;
pub mod store;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task;
use tracing::{info, warn};

pub use error::{Error, Result};
pub use services::Cinema;

use models::{Booking, Customer, ScheduleShowRequest, ScheduledShow, ShowAvailability};
use store::PgStore;

// Shared state for the whole service: durable engine plus its read cache
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub redis: redis_client::RedisClient,
    pub cache: cache::CacheService,
    pub config: config::Config,
    pub cinema: Cinema<PgStore>,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::new(&config.database).await?;
        info!("Database connected");

        db.run_migrations().await?;

        let redis = redis_client::RedisClient::connect(&config.redis).await?;
        info!("Redis connected");

        let cache = cache::CacheService::new(redis.clone(), config.redis.cache_ttl_secs);
        let cinema = Cinema::new(Arc::new(PgStore::new(db.pool.clone())), &config.booking);
        let state = Arc::new(Self {
            db,
            redis,
            cache,
            config,
            cinema,
        });

        let state_for_bg = state.clone();
        task::spawn(async move {
            // Warm the listing cache in the background
            state_for_bg.refresh_upcoming().await;
        });

        Ok(state)
    }

    /// Schedules a show and drops the cached listing before returning.
    pub async fn schedule_show(&self, request: ScheduleShowRequest) -> Result<ScheduledShow> {
        let scheduled = self.cinema.scheduler.schedule_show(request).await?;
        self.cache.invalidate_upcoming().await;
        Ok(scheduled)
    }

    /// Books seats and drops the cached listing before returning.
    pub async fn book_seats(
        &self,
        show_id: i64,
        seat_ids: impl IntoIterator<Item = i64>,
        customer: Customer,
    ) -> Result<Booking> {
        let booking = self.cinema.booking.book_seats(show_id, seat_ids, customer).await?;
        self.cache.invalidate_upcoming().await;
        Ok(booking)
    }

    /// Upcoming shows with free seats, served from Redis when a current
    /// snapshot exists.
    pub async fn upcoming_available_shows(&self, now: DateTime<Utc>) -> Result<Vec<ShowAvailability>> {
        let version = match self.cache.listing_version().await {
            Ok(version) => Some(version),
            Err(e) => {
                warn!("Listing cache unavailable: {:?}", e);
                None
            }
        };

        if let Some(version) = version {
            match self.cache.get_upcoming(version).await {
                Ok(Some(cached)) => {
                    if let Some(view) = cached.view_at(now) {
                        return Ok(view);
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Failed to read cached listing: {:?}", e),
            }
        }

        let shows = self.cinema.booking.upcoming_available_shows(now).await?;
        if let Some(version) = version {
            let listing = cache::CachedListing { built_at: now, shows: shows.clone() };
            if let Err(e) = self.cache.store_upcoming(version, &listing).await {
                warn!("Failed to cache listing: {:?}", e);
            }
        }
        Ok(shows)
    }

    /// Rebuilds the cached listing from the database.
    pub async fn refresh_upcoming(&self) {
        let version = match self.cache.listing_version().await {
            Ok(version) => version,
            Err(e) => {
                warn!("Listing cache unavailable: {:?}", e);
                return;
            }
        };
        let now = Utc::now();
        match self.cinema.booking.upcoming_available_shows(now).await {
            Ok(shows) => {
                let count = shows.len();
                let listing = cache::CachedListing { built_at: now, shows };
                match self.cache.store_upcoming(version, &listing).await {
                    Ok(()) => info!("Listing cache refreshed with {} shows", count),
                    Err(e) => warn!("Failed to cache listing: {:?}", e),
                }
            }
            Err(e) => warn!("Failed to load upcoming shows: {}", e),
        }
    }
}
