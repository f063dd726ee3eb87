use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{
    stream::{self, BoxStream},
    StreamExt,
};
use uuid::Uuid;

use super::Store;
use crate::{
    error::{Error, Result},
    models::{
        Booking, BookingDraft, Movie, NewMovie, NewShowroom, Pricing, ScheduledShow, Seat,
        SeatState, Show, ShowAvailability, ShowDraft, Showroom,
    },
    services::seatmap,
};

type ShowSeats = Arc<RwLock<BTreeMap<i64, Seat>>>;

#[derive(Default)]
struct CatalogTables {
    movies: BTreeMap<i64, Movie>,
    showrooms: BTreeMap<i64, Showroom>,
}

#[derive(Default)]
struct ScheduleTables {
    shows: BTreeMap<i64, Show>,
    pricings: HashMap<i64, Pricing>,
}

#[derive(Default)]
struct SalesTables {
    bookings: BTreeMap<i64, Booking>,
    references: HashMap<Uuid, i64>,
}

/// In-process store. Locks are always taken in the order catalog, schedule,
/// seats, sales.
#[derive(Default)]
pub struct MemoryStore {
    next_id: AtomicI64,
    catalog: RwLock<CatalogTables>,
    schedule: RwLock<ScheduleTables>,
    seats: RwLock<HashMap<i64, ShowSeats>>,
    sales: RwLock<SalesTables>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn by_position(seats: &mut [Seat]) {
    seats.sort_by_key(|seat| (seat.row, seat.column));
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn show_seats(&self, show_id: i64) -> Option<ShowSeats> {
        read(&self.seats).get(&show_id).cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_movie(&self, movie: NewMovie) -> Result<Movie> {
        let movie = movie.into_movie(self.next_id());
        write(&self.catalog).movies.insert(movie.id, movie.clone());
        Ok(movie)
    }

    async fn update_movie(&self, id: i64, movie: NewMovie) -> Result<Movie> {
        let mut catalog = write(&self.catalog);
        if !catalog.movies.contains_key(&id) {
            return Err(Error::not_found("movie", id));
        }
        if read(&self.schedule).shows.values().any(|show| show.movie_id == id) {
            return Err(Error::Conflict(format!("movie {} is referenced by scheduled shows", id)));
        }
        let movie = movie.into_movie(id);
        catalog.movies.insert(id, movie.clone());
        Ok(movie)
    }

    async fn movie(&self, id: i64) -> Result<Option<Movie>> {
        Ok(read(&self.catalog).movies.get(&id).cloned())
    }

    async fn movies(&self) -> Result<Vec<Movie>> {
        Ok(read(&self.catalog).movies.values().cloned().collect())
    }

    async fn insert_showroom(&self, showroom: NewShowroom) -> Result<Showroom> {
        let mut catalog = write(&self.catalog);
        if catalog.showrooms.values().any(|room| room.name == showroom.name) {
            return Err(Error::Conflict(format!("showroom {:?} already exists", showroom.name)));
        }
        let showroom = showroom.into_showroom(self.next_id());
        catalog.showrooms.insert(showroom.id, showroom.clone());
        Ok(showroom)
    }

    async fn showroom(&self, id: i64) -> Result<Option<Showroom>> {
        Ok(read(&self.catalog).showrooms.get(&id).cloned())
    }

    async fn showrooms(&self) -> Result<Vec<Showroom>> {
        Ok(read(&self.catalog).showrooms.values().cloned().collect())
    }

    async fn create_show(&self, draft: ShowDraft, showroom: &Showroom) -> Result<ScheduledShow> {
        // Held until the show is in place so update_movie cannot slip in between.
        let catalog = read(&self.catalog);
        let movie = catalog
            .movies
            .get(&draft.movie_id)
            .ok_or_else(|| Error::not_found("movie", draft.movie_id))?;
        let end_time = draft.end_time(movie);

        let mut schedule = write(&self.schedule);
        if let Some(existing) = schedule
            .shows
            .values()
            .find(|show| show.showroom_id == draft.showroom_id && show.overlaps(draft.start_time, end_time))
        {
            return Err(Error::Conflict(format!(
                "showroom {} is busy with show {} from {} to {}",
                draft.showroom_id, existing.id, existing.start_time, existing.end_time
            )));
        }

        let show = draft.to_show(self.next_id(), movie);
        let mut seats: Vec<Seat> = seatmap::generate_seats(&show, showroom)?
            .into_iter()
            .map(|seat| seat.into_seat(self.next_id()))
            .collect();
        by_position(&mut seats);
        let pricing = Pricing {
            id: self.next_id(),
            show_id: show.id,
            base_price: draft.base_price,
            premiums: draft.premiums,
        };

        let table = seats.iter().map(|seat| (seat.id, seat.clone())).collect();
        write(&self.seats).insert(show.id, Arc::new(RwLock::new(table)));
        schedule.pricings.insert(show.id, pricing.clone());
        schedule.shows.insert(show.id, show.clone());

        Ok(ScheduledShow { show, pricing, seats })
    }

    async fn show(&self, id: i64) -> Result<Option<Show>> {
        Ok(read(&self.schedule).shows.get(&id).cloned())
    }

    async fn shows_in_showroom(&self, showroom_id: i64) -> Result<Vec<Show>> {
        let mut shows: Vec<Show> = read(&self.schedule)
            .shows
            .values()
            .filter(|show| show.showroom_id == showroom_id)
            .cloned()
            .collect();
        shows.sort_by_key(|show| (show.start_time, show.id));
        Ok(shows)
    }

    async fn pricing(&self, show_id: i64) -> Result<Option<Pricing>> {
        Ok(read(&self.schedule).pricings.get(&show_id).cloned())
    }

    async fn seats(&self, show_id: i64) -> Result<Vec<Seat>> {
        let Some(table) = self.show_seats(show_id) else {
            return Ok(Vec::new());
        };
        let mut seats: Vec<Seat> = read(&table).values().cloned().collect();
        by_position(&mut seats);
        Ok(seats)
    }

    async fn seats_by_ids(&self, show_id: i64, seat_ids: &[i64]) -> Result<Vec<Seat>> {
        let Some(table) = self.show_seats(show_id) else {
            return Ok(Vec::new());
        };
        let seats = read(&table);
        Ok(seat_ids.iter().filter_map(|id| seats.get(id).cloned()).collect())
    }

    fn available_seats(&self, show_id: i64) -> BoxStream<'_, Result<Seat>> {
        let Some(table) = self.show_seats(show_id) else {
            return stream::once(async move { Err(Error::not_found("show", show_id)) }).boxed();
        };
        let mut snapshot: Vec<Seat> = read(&table).values().filter(|seat| seat.is_available()).cloned().collect();
        by_position(&mut snapshot);
        stream::iter(snapshot.into_iter().map(Ok)).boxed()
    }

    async fn commit_booking(&self, draft: BookingDraft, _lock_wait: Duration) -> Result<Booking> {
        let table = self
            .show_seats(draft.show_id)
            .ok_or_else(|| Error::not_found("show", draft.show_id))?;
        let seat_ids = draft.seat_ids();

        let mut seats = write(&table);
        let foreign: Vec<i64> = seat_ids.iter().copied().filter(|id| !seats.contains_key(id)).collect();
        if !foreign.is_empty() {
            return Err(Error::InvalidSeat { show_id: draft.show_id, seat_ids: foreign });
        }
        let taken: Vec<i64> = seat_ids
            .iter()
            .copied()
            .filter(|id| seats.get(id).is_some_and(|seat| !seat.is_available()))
            .collect();
        if !taken.is_empty() {
            return Err(Error::SeatUnavailable { seat_ids: taken });
        }

        let mut sales = write(&self.sales);
        for id in &seat_ids {
            if let Some(seat) = seats.get_mut(id) {
                seat.state = SeatState::Booked;
            }
        }
        let booking = draft.into_booking(self.next_id(), Utc::now());
        sales.references.insert(booking.reference, booking.id);
        sales.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn booking(&self, id: i64) -> Result<Option<Booking>> {
        Ok(read(&self.sales).bookings.get(&id).cloned())
    }

    async fn booking_by_reference(&self, reference: Uuid) -> Result<Option<Booking>> {
        let sales = read(&self.sales);
        Ok(sales
            .references
            .get(&reference)
            .and_then(|id| sales.bookings.get(id))
            .cloned())
    }

    async fn upcoming_available_shows(&self, now: DateTime<Utc>) -> Result<Vec<ShowAvailability>> {
        let (titles, rooms): (HashMap<i64, String>, HashMap<i64, String>) = {
            let catalog = read(&self.catalog);
            (
                catalog.movies.values().map(|m| (m.id, m.title.clone())).collect(),
                catalog.showrooms.values().map(|r| (r.id, r.name.clone())).collect(),
            )
        };
        let mut upcoming: Vec<Show> = read(&self.schedule)
            .shows
            .values()
            .filter(|show| show.start_time > now)
            .cloned()
            .collect();
        upcoming.sort_by_key(|show| (show.start_time, show.id));

        let mut listing = Vec::new();
        for show in upcoming {
            let available = self
                .show_seats(show.id)
                .map(|table| read(&table).values().filter(|seat| seat.is_available()).count())
                .unwrap_or(0);
            if available == 0 {
                continue;
            }
            listing.push(ShowAvailability {
                movie_title: titles.get(&show.movie_id).cloned().unwrap_or_default(),
                showroom_name: rooms.get(&show.showroom_id).cloned().unwrap_or_default(),
                available_seats: available as i64,
                show,
            });
        }
        Ok(listing)
    }
}
