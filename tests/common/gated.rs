use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use tokio::sync::Notify;
use uuid::Uuid;

use cinema_booking::{
    models::{
        Booking, BookingDraft, Movie, NewMovie, NewShowroom, Pricing, ScheduledShow, Seat, Show,
        ShowAvailability, ShowDraft, Showroom,
    },
    store::{MemoryStore, Store},
    Result,
};

/// `MemoryStore` that can stall showroom lookups and booking commits, and
/// signals when a stalled call has been entered.
#[derive(Default)]
pub struct GatedStore {
    inner: MemoryStore,
    showroom_delay: Duration,
    commit_delay: Duration,
    showroom_entered: Arc<Notify>,
    commit_entered: Arc<Notify>,
}

impl GatedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stall_showroom_lookups(mut self, delay: Duration) -> Self {
        self.showroom_delay = delay;
        self
    }

    pub fn stall_commits(mut self, delay: Duration) -> Self {
        self.commit_delay = delay;
        self
    }

    pub fn showroom_entered(&self) -> Arc<Notify> {
        self.showroom_entered.clone()
    }

    pub fn commit_entered(&self) -> Arc<Notify> {
        self.commit_entered.clone()
    }
}

#[async_trait]
impl Store for GatedStore {
    async fn insert_movie(&self, movie: NewMovie) -> Result<Movie> {
        self.inner.insert_movie(movie).await
    }

    async fn update_movie(&self, id: i64, movie: NewMovie) -> Result<Movie> {
        self.inner.update_movie(id, movie).await
    }

    async fn movie(&self, id: i64) -> Result<Option<Movie>> {
        self.inner.movie(id).await
    }

    async fn movies(&self) -> Result<Vec<Movie>> {
        self.inner.movies().await
    }

    async fn insert_showroom(&self, showroom: NewShowroom) -> Result<Showroom> {
        self.inner.insert_showroom(showroom).await
    }

    async fn showroom(&self, id: i64) -> Result<Option<Showroom>> {
        if !self.showroom_delay.is_zero() {
            self.showroom_entered.notify_one();
            tokio::time::sleep(self.showroom_delay).await;
        }
        self.inner.showroom(id).await
    }

    async fn showrooms(&self) -> Result<Vec<Showroom>> {
        self.inner.showrooms().await
    }

    async fn create_show(&self, draft: ShowDraft, showroom: &Showroom) -> Result<ScheduledShow> {
        self.inner.create_show(draft, showroom).await
    }

    async fn show(&self, id: i64) -> Result<Option<Show>> {
        self.inner.show(id).await
    }

    async fn shows_in_showroom(&self, showroom_id: i64) -> Result<Vec<Show>> {
        self.inner.shows_in_showroom(showroom_id).await
    }

    async fn pricing(&self, show_id: i64) -> Result<Option<Pricing>> {
        self.inner.pricing(show_id).await
    }

    async fn seats(&self, show_id: i64) -> Result<Vec<Seat>> {
        self.inner.seats(show_id).await
    }

    async fn seats_by_ids(&self, show_id: i64, seat_ids: &[i64]) -> Result<Vec<Seat>> {
        self.inner.seats_by_ids(show_id, seat_ids).await
    }

    fn available_seats(&self, show_id: i64) -> BoxStream<'_, Result<Seat>> {
        self.inner.available_seats(show_id)
    }

    async fn commit_booking(&self, draft: BookingDraft, lock_wait: Duration) -> Result<Booking> {
        if !self.commit_delay.is_zero() {
            self.commit_entered.notify_one();
            tokio::time::sleep(self.commit_delay).await;
        }
        self.inner.commit_booking(draft, lock_wait).await
    }

    async fn booking(&self, id: i64) -> Result<Option<Booking>> {
        self.inner.booking(id).await
    }

    async fn booking_by_reference(&self, reference: Uuid) -> Result<Option<Booking>> {
        self.inner.booking_by_reference(reference).await
    }

    async fn upcoming_available_shows(&self, now: DateTime<Utc>) -> Result<Vec<ShowAvailability>> {
        self.inner.upcoming_available_shows(now).await
    }
}
