use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

use crate::{
    error::Result,
    models::{
        Booking, BookingDraft, Movie, NewMovie, NewShowroom, Pricing, ScheduledShow, Seat, Show,
        ShowAvailability, ShowDraft, Showroom,
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Persistence behind the engine. Implementations must make `create_show` and
/// `commit_booking` all-or-nothing.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn insert_movie(&self, movie: NewMovie) -> Result<Movie>;

    /// Replaces a movie's attributes. Fails with `Conflict` once any show
    /// references the movie.
    async fn update_movie(&self, id: i64, movie: NewMovie) -> Result<Movie>;

    async fn movie(&self, id: i64) -> Result<Option<Movie>>;

    async fn movies(&self) -> Result<Vec<Movie>>;

    async fn insert_showroom(&self, showroom: NewShowroom) -> Result<Showroom>;

    async fn showroom(&self, id: i64) -> Result<Option<Showroom>>;

    async fn showrooms(&self) -> Result<Vec<Showroom>>;

    /// Atomically checks the room for overlapping shows, then persists the
    /// show, its generated seats and its pricing. Nothing is written on error.
    async fn create_show(&self, draft: ShowDraft, showroom: &Showroom) -> Result<ScheduledShow>;

    async fn show(&self, id: i64) -> Result<Option<Show>>;

    /// Shows of one room ordered by start time.
    async fn shows_in_showroom(&self, showroom_id: i64) -> Result<Vec<Show>>;

    async fn pricing(&self, show_id: i64) -> Result<Option<Pricing>>;

    /// Full seat map of a show ordered by row and column.
    async fn seats(&self, show_id: i64) -> Result<Vec<Seat>>;

    /// Seats of `show_id` among `seat_ids`; ids of other shows are skipped.
    async fn seats_by_ids(&self, show_id: i64, seat_ids: &[i64]) -> Result<Vec<Seat>>;

    /// Available seats of a show from a single consistent snapshot.
    fn available_seats(&self, show_id: i64) -> BoxStream<'_, Result<Seat>>;

    /// Flips every seat of the draft from available to booked and records the
    /// booking, or changes nothing. Waits at most `lock_wait` for row locks.
    async fn commit_booking(&self, draft: BookingDraft, lock_wait: Duration) -> Result<Booking>;

    async fn booking(&self, id: i64) -> Result<Option<Booking>>;

    async fn booking_by_reference(&self, reference: uuid::Uuid) -> Result<Option<Booking>>;

    /// Shows starting after `now` with at least one available seat.
    async fn upcoming_available_shows(&self, now: DateTime<Utc>) -> Result<Vec<ShowAvailability>>;
}
