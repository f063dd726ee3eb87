use std::{collections::BTreeSet, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use rust_decimal::Decimal;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{Error, Result},
    models::{Booking, BookingDraft, BookingLine, Customer, Seat, ShowAvailability},
    services::{
        locks::SeatLocks,
        pricing::{self, PricingEngine},
    },
    store::Store,
};

/// Floor for the database lock wait once in-process locks are held.
const MIN_COMMIT_WAIT: Duration = Duration::from_millis(50);

#[derive(Clone)]
pub struct BookingEngine<S> {
    store: Arc<S>,
    pricing: PricingEngine<S>,
    locks: SeatLocks,
    lock_timeout: Duration,
}

impl<S: Store> BookingEngine<S> {
    pub fn new(store: Arc<S>, lock_timeout: Duration) -> Self {
        Self {
            pricing: PricingEngine::new(store.clone()),
            store,
            locks: SeatLocks::new(),
            lock_timeout,
        }
    }

    /// Books `seat_ids` of `show_id` for `customer`.
    ///
    /// Fails with `SeatUnavailable` listing every seat that is no longer
    /// available, or `LockTimeout` when exclusive access could not be obtained
    /// in time. Identical repeated requests are not deduplicated.
    pub async fn book_seats(
        &self,
        show_id: i64,
        seat_ids: impl IntoIterator<Item = i64>,
        customer: Customer,
    ) -> Result<Booking> {
        let requested: Vec<i64> = seat_ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        if requested.is_empty() {
            return Err(Error::Validation("at least one seat must be requested".to_string()));
        }
        customer.validate()?;

        if self.store.show(show_id).await?.is_none() {
            return Err(Error::not_found("show", show_id));
        }
        let pricing = self.pricing.pricing(show_id).await?;

        let mut seats = self.store.seats_by_ids(show_id, &requested).await?;
        if seats.len() != requested.len() {
            let foreign = requested
                .iter()
                .copied()
                .filter(|id| !seats.iter().any(|seat| seat.id == *id))
                .collect();
            return Err(Error::InvalidSeat { show_id, seat_ids: foreign });
        }
        seats.sort_by_key(|seat| seat.id);

        let lines = seats
            .into_iter()
            .map(|seat| {
                Ok(BookingLine {
                    price: pricing::quote(&pricing, seat.seat_type)?,
                    seat_id: seat.id,
                    label: seat.label,
                    seat_type: seat.seat_type,
                })
            })
            .collect::<Result<Vec<BookingLine>>>()?;
        let total_price = lines
            .iter()
            .try_fold(Decimal::ZERO, |total, line| total.checked_add(line.price))
            .ok_or_else(|| Error::Validation("booking total is out of range".to_string()))?;
        let draft = BookingDraft {
            reference: Uuid::new_v4(),
            show_id,
            customer,
            lines,
            total_price,
        };

        let started = Instant::now();
        let guard = match self.locks.acquire(requested.iter().copied(), self.lock_timeout).await {
            Ok(guard) => guard,
            Err(e) => {
                warn!(show_id, seats = ?requested, "gave up waiting for seat locks");
                return Err(e);
            }
        };
        let remaining = self.lock_timeout.saturating_sub(started.elapsed()).max(MIN_COMMIT_WAIT);
        let committed = self.store.commit_booking(draft, remaining).await;
        drop(guard);

        match &committed {
            Ok(booking) => info!(
                show_id,
                booking_id = booking.id,
                reference = %booking.reference,
                seats = booking.lines.len(),
                total = %booking.total_price,
                "seats booked"
            ),
            Err(Error::SeatUnavailable { seat_ids }) => {
                info!(show_id, taken = ?seat_ids, "booking rejected, seats already taken")
            }
            Err(Error::LockTimeout) => warn!(show_id, seats = ?requested, "seat rows stayed locked past the deadline"),
            Err(e) => warn!(show_id, "booking failed: {}", e),
        }
        committed
    }

    /// Lazily yields the show's available seats from one consistent snapshot.
    pub async fn available_seats(&self, show_id: i64) -> Result<BoxStream<'_, Result<Seat>>> {
        if self.store.show(show_id).await?.is_none() {
            return Err(Error::not_found("show", show_id));
        }
        Ok(self.store.available_seats(show_id))
    }

    /// Whole seat map with current states, for rendering.
    pub async fn seat_map(&self, show_id: i64) -> Result<Vec<Seat>> {
        if self.store.show(show_id).await?.is_none() {
            return Err(Error::not_found("show", show_id));
        }
        self.store.seats(show_id).await
    }

    /// Shows starting after `now` that are not sold out.
    pub async fn upcoming_available_shows(&self, now: DateTime<Utc>) -> Result<Vec<ShowAvailability>> {
        self.store.upcoming_available_shows(now).await
    }

    pub async fn booking(&self, id: i64) -> Result<Booking> {
        self.store.booking(id).await?.ok_or_else(|| Error::not_found("booking", id))
    }

    /// Ticket lookup by the reference handed to the customer.
    pub async fn ticket(&self, reference: Uuid) -> Result<Booking> {
        self.store
            .booking_by_reference(reference)
            .await?
            .ok_or_else(|| Error::not_found("booking", reference))
    }
}
