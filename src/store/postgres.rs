use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{stream::BoxStream, StreamExt, TryStreamExt};
use rust_decimal::Decimal;
use sqlx::{types::Json, FromRow, PgPool};
use tracing::{debug, warn};
use uuid::Uuid;

use super::Store;
use crate::{
    error::{Error, Result},
    models::{
        Booking, BookingDraft, BookingLine, Customer, Movie, NewMovie, NewShowroom, Pricing,
        ScheduledShow, Seat, SeatState, SeatZone, Show, ShowAvailability, ShowDraft, Showroom,
    },
    services::seatmap,
};

const MOVIE_COLUMNS: &str = "id, title, description, poster, duration_minutes";
const SHOW_COLUMNS: &str = "id, movie_id, showroom_id, start_time, end_time";
const SEAT_COLUMNS: &str = "id, show_id, row_number, column_number, label, seat_type, state";
const PRICING_COLUMNS: &str = "id, show_id, base_price, premium_table";
const BOOKING_COLUMNS: &str =
    "id, reference, show_id, customer_name, customer_email, customer_phone, total_price, created_at";

#[derive(FromRow)]
struct ShowroomRow {
    id: i64,
    name: String,
    capacity: i32,
    location: String,
}

#[derive(FromRow)]
struct ZoneRow {
    showroom_id: i64,
    #[sqlx(flatten)]
    zone: SeatZone,
}

#[derive(FromRow)]
struct BookingRow {
    id: i64,
    reference: Uuid,
    show_id: i64,
    customer_name: String,
    customer_email: String,
    customer_phone: String,
    total_price: Decimal,
    created_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self, lines: Vec<BookingLine>) -> Booking {
        Booking {
            id: self.id,
            reference: self.reference,
            show_id: self.show_id,
            customer: Customer {
                name: self.customer_name,
                email: self.customer_email,
                phone: self.customer_phone,
            },
            lines,
            total_price: self.total_price,
            created_at: self.created_at,
        }
    }
}

/// Durable store. Seat rows are the unit of locking: bookings lock them with
/// `FOR UPDATE` in id order, bounded by `lock_timeout`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn zones(&self, showroom_ids: &[i64]) -> Result<HashMap<i64, Vec<SeatZone>>> {
        let rows = sqlx::query_as::<_, ZoneRow>(
            "SELECT showroom_id, row_start, row_end, column_start, column_end, seat_type
             FROM showroom_zones
             WHERE showroom_id = ANY($1)
             ORDER BY showroom_id, position",
        )
        .bind(showroom_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut zones: HashMap<i64, Vec<SeatZone>> = HashMap::new();
        for row in rows {
            zones.entry(row.showroom_id).or_default().push(row.zone);
        }
        Ok(zones)
    }

    async fn booking_lines(&self, booking_id: i64) -> Result<Vec<BookingLine>> {
        let lines = sqlx::query_as::<_, BookingLine>(
            "SELECT s.id AS seat_id, s.label, s.seat_type, bs.price
             FROM booking_seats bs
             JOIN seats s ON s.id = bs.seat_id
             WHERE bs.booking_id = $1
             ORDER BY s.id",
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lines)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_movie(&self, movie: NewMovie) -> Result<Movie> {
        let movie = sqlx::query_as::<_, Movie>(&format!(
            "INSERT INTO movies (title, description, poster, duration_minutes)
             VALUES ($1, $2, $3, $4)
             RETURNING {MOVIE_COLUMNS}"
        ))
        .bind(&movie.title)
        .bind(&movie.description)
        .bind(&movie.poster)
        .bind(movie.duration_minutes)
        .fetch_one(&self.pool)
        .await?;
        Ok(movie)
    }

    async fn update_movie(&self, id: i64, movie: NewMovie) -> Result<Movie> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM movies WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            let _ = tx.rollback().await;
            return Err(Error::not_found("movie", id));
        }

        let referenced = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM shows WHERE movie_id = $1)")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if referenced {
            let _ = tx.rollback().await;
            return Err(Error::Conflict(format!("movie {} is referenced by scheduled shows", id)));
        }

        let movie = sqlx::query_as::<_, Movie>(&format!(
            "UPDATE movies
             SET title = $2, description = $3, poster = $4, duration_minutes = $5
             WHERE id = $1
             RETURNING {MOVIE_COLUMNS}"
        ))
        .bind(id)
        .bind(&movie.title)
        .bind(&movie.description)
        .bind(&movie.poster)
        .bind(movie.duration_minutes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(movie)
    }

    async fn movie(&self, id: i64) -> Result<Option<Movie>> {
        let movie = sqlx::query_as::<_, Movie>(&format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(movie)
    }

    async fn movies(&self) -> Result<Vec<Movie>> {
        let movies = sqlx::query_as::<_, Movie>(&format!("SELECT {MOVIE_COLUMNS} FROM movies ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(movies)
    }

    async fn insert_showroom(&self, showroom: NewShowroom) -> Result<Showroom> {
        let mut tx = self.pool.begin().await?;

        let taken = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM showrooms WHERE name = $1)")
            .bind(&showroom.name)
            .fetch_one(&mut *tx)
            .await?;
        if taken {
            let _ = tx.rollback().await;
            return Err(Error::Conflict(format!("showroom {:?} already exists", showroom.name)));
        }

        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO showrooms (name, capacity, location) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&showroom.name)
        .bind(showroom.capacity)
        .bind(&showroom.location)
        .fetch_one(&mut *tx)
        .await?;

        for (position, zone) in showroom.zones.iter().enumerate() {
            sqlx::query(
                "INSERT INTO showroom_zones
                     (showroom_id, position, row_start, row_end, column_start, column_end, seat_type)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(id)
            .bind(position as i32)
            .bind(zone.row_start)
            .bind(zone.row_end)
            .bind(zone.column_start)
            .bind(zone.column_end)
            .bind(zone.seat_type)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(showroom.into_showroom(id))
    }

    async fn showroom(&self, id: i64) -> Result<Option<Showroom>> {
        let row = sqlx::query_as::<_, ShowroomRow>(
            "SELECT id, name, capacity, location FROM showrooms WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut zones = self.zones(&[row.id]).await?;
        Ok(Some(Showroom {
            zones: zones.remove(&row.id).unwrap_or_default(),
            id: row.id,
            name: row.name,
            capacity: row.capacity,
            location: row.location,
        }))
    }

    async fn showrooms(&self) -> Result<Vec<Showroom>> {
        let rows = sqlx::query_as::<_, ShowroomRow>(
            "SELECT id, name, capacity, location FROM showrooms ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let mut zones = self.zones(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| Showroom {
                zones: zones.remove(&row.id).unwrap_or_default(),
                id: row.id,
                name: row.name,
                capacity: row.capacity,
                location: row.location,
            })
            .collect())
    }

    async fn create_show(&self, draft: ShowDraft, showroom: &Showroom) -> Result<ScheduledShow> {
        let mut tx = self.pool.begin().await?;

        // Serialises scheduling per room so the overlap check and insert are atomic.
        let room = sqlx::query_scalar::<_, i64>("SELECT id FROM showrooms WHERE id = $1 FOR UPDATE")
            .bind(draft.showroom_id)
            .fetch_optional(&mut *tx)
            .await?;
        if room.is_none() {
            let _ = tx.rollback().await;
            return Err(Error::not_found("showroom", draft.showroom_id));
        }
        // Blocks movie updates until the show is committed; the end time comes
        // from this locked row.
        let movie = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1 FOR SHARE"
        ))
        .bind(draft.movie_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(movie) = movie else {
            let _ = tx.rollback().await;
            return Err(Error::not_found("movie", draft.movie_id));
        };
        let end_time = draft.end_time(&movie);

        let clash = sqlx::query_as::<_, Show>(&format!(
            "SELECT {SHOW_COLUMNS} FROM shows
             WHERE showroom_id = $1 AND start_time < $3 AND $2 < end_time
             ORDER BY start_time
             LIMIT 1"
        ))
        .bind(draft.showroom_id)
        .bind(draft.start_time)
        .bind(end_time)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(existing) = clash {
            let _ = tx.rollback().await;
            return Err(Error::Conflict(format!(
                "showroom {} is busy with show {} from {} to {}",
                draft.showroom_id, existing.id, existing.start_time, existing.end_time
            )));
        }

        let show = sqlx::query_as::<_, Show>(&format!(
            "INSERT INTO shows (movie_id, showroom_id, start_time, end_time)
             VALUES ($1, $2, $3, $4)
             RETURNING {SHOW_COLUMNS}"
        ))
        .bind(draft.movie_id)
        .bind(draft.showroom_id)
        .bind(draft.start_time)
        .bind(end_time)
        .fetch_one(&mut *tx)
        .await?;

        let cells = match seatmap::generate_seats(&show, showroom) {
            Ok(cells) => cells,
            Err(e) => {
                let _ = tx.rollback().await;
                return Err(e);
            }
        };
        let rows: Vec<i32> = cells.iter().map(|c| c.row).collect();
        let columns: Vec<i32> = cells.iter().map(|c| c.column).collect();
        let labels: Vec<String> = cells.iter().map(|c| c.label.clone()).collect();
        let types: Vec<&str> = cells.iter().map(|c| c.seat_type.as_str()).collect();

        let mut seats = sqlx::query_as::<_, Seat>(&format!(
            "INSERT INTO seats (show_id, row_number, column_number, label, seat_type)
             SELECT $1, cell.r, cell.c, cell.l, cell.t::seat_type
             FROM UNNEST($2::int4[], $3::int4[], $4::text[], $5::text[]) AS cell(r, c, l, t)
             RETURNING {SEAT_COLUMNS}"
        ))
        .bind(show.id)
        .bind(&rows)
        .bind(&columns)
        .bind(&labels)
        .bind(&types)
        .fetch_all(&mut *tx)
        .await?;
        seats.sort_by_key(|seat| (seat.row, seat.column));

        let pricing = sqlx::query_as::<_, Pricing>(&format!(
            "INSERT INTO pricings (show_id, base_price, premium_table)
             VALUES ($1, $2, $3)
             RETURNING {PRICING_COLUMNS}"
        ))
        .bind(show.id)
        .bind(draft.base_price)
        .bind(Json(&draft.premiums))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ScheduledShow { show, pricing, seats })
    }

    async fn show(&self, id: i64) -> Result<Option<Show>> {
        let show = sqlx::query_as::<_, Show>(&format!("SELECT {SHOW_COLUMNS} FROM shows WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(show)
    }

    async fn shows_in_showroom(&self, showroom_id: i64) -> Result<Vec<Show>> {
        let shows = sqlx::query_as::<_, Show>(&format!(
            "SELECT {SHOW_COLUMNS} FROM shows WHERE showroom_id = $1 ORDER BY start_time, id"
        ))
        .bind(showroom_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(shows)
    }

    async fn pricing(&self, show_id: i64) -> Result<Option<Pricing>> {
        let pricing = sqlx::query_as::<_, Pricing>(&format!(
            "SELECT {PRICING_COLUMNS} FROM pricings WHERE show_id = $1"
        ))
        .bind(show_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(pricing)
    }

    async fn seats(&self, show_id: i64) -> Result<Vec<Seat>> {
        let seats = sqlx::query_as::<_, Seat>(&format!(
            "SELECT {SEAT_COLUMNS} FROM seats WHERE show_id = $1 ORDER BY row_number, column_number"
        ))
        .bind(show_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(seats)
    }

    async fn seats_by_ids(&self, show_id: i64, seat_ids: &[i64]) -> Result<Vec<Seat>> {
        let seats = sqlx::query_as::<_, Seat>(&format!(
            "SELECT {SEAT_COLUMNS} FROM seats WHERE show_id = $1 AND id = ANY($2) ORDER BY id"
        ))
        .bind(show_id)
        .bind(seat_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(seats)
    }

    fn available_seats(&self, show_id: i64) -> BoxStream<'_, Result<Seat>> {
        // One statement, one snapshot: rows of an in-flight booking are seen
        // either all available or all booked.
        sqlx::query_as::<_, Seat>(
            "SELECT id, show_id, row_number, column_number, label, seat_type, state
             FROM seats
             WHERE show_id = $1 AND state = 'available'
             ORDER BY row_number, column_number",
        )
        .bind(show_id)
        .fetch(&self.pool)
        .map_err(Error::from)
        .boxed()
    }

    async fn commit_booking(&self, draft: BookingDraft, lock_wait: Duration) -> Result<Booking> {
        let seat_ids = draft.seat_ids();
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", lock_wait.as_millis().max(1)))
            .execute(&mut *tx)
            .await?;

        let locked = sqlx::query_as::<_, (i64, SeatState)>(
            "SELECT id, state FROM seats
             WHERE show_id = $1 AND id = ANY($2)
             ORDER BY id
             FOR UPDATE",
        )
        .bind(draft.show_id)
        .bind(&seat_ids)
        .fetch_all(&mut *tx)
        .await?;

        let foreign: Vec<i64> = seat_ids
            .iter()
            .copied()
            .filter(|id| !locked.iter().any(|(locked_id, _)| locked_id == id))
            .collect();
        if !foreign.is_empty() {
            let _ = tx.rollback().await;
            return Err(Error::InvalidSeat { show_id: draft.show_id, seat_ids: foreign });
        }
        let taken: Vec<i64> = locked
            .iter()
            .filter(|(_, state)| *state != SeatState::Available)
            .map(|(id, _)| *id)
            .collect();
        if !taken.is_empty() {
            let _ = tx.rollback().await;
            return Err(Error::SeatUnavailable { seat_ids: taken });
        }

        let flipped = sqlx::query(
            "UPDATE seats SET state = 'booked'
             WHERE show_id = $1 AND id = ANY($2) AND state = 'available'",
        )
        .bind(draft.show_id)
        .bind(&seat_ids)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if flipped != seat_ids.len() as u64 {
            warn!(show_id = draft.show_id, flipped, requested = seat_ids.len(), "seat state changed under row lock");
            let _ = tx.rollback().await;
            return Err(Error::SeatUnavailable { seat_ids });
        }

        let (id, created_at) = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
            "INSERT INTO bookings
                 (reference, show_id, customer_name, customer_email, customer_phone, total_price)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, created_at",
        )
        .bind(draft.reference)
        .bind(draft.show_id)
        .bind(&draft.customer.name)
        .bind(&draft.customer.email)
        .bind(&draft.customer.phone)
        .bind(draft.total_price)
        .fetch_one(&mut *tx)
        .await?;

        for line in &draft.lines {
            sqlx::query(
                "INSERT INTO booking_seats (booking_id, show_id, seat_id, price) VALUES ($1, $2, $3, $4)",
            )
            .bind(id)
            .bind(draft.show_id)
            .bind(line.seat_id)
            .bind(line.price)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(booking_id = id, seats = seat_ids.len(), "booking committed");
        Ok(draft.into_booking(id, created_at))
    }

    async fn booking(&self, id: i64) -> Result<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let lines = self.booking_lines(row.id).await?;
                Ok(Some(row.into_booking(lines)))
            }
            None => Ok(None),
        }
    }

    async fn booking_by_reference(&self, reference: Uuid) -> Result<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE reference = $1"
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => {
                let lines = self.booking_lines(row.id).await?;
                Ok(Some(row.into_booking(lines)))
            }
            None => Ok(None),
        }
    }

    async fn upcoming_available_shows(&self, now: DateTime<Utc>) -> Result<Vec<ShowAvailability>> {
        let listing = sqlx::query_as::<_, ShowAvailability>(
            "SELECT sh.id, sh.movie_id, sh.showroom_id, sh.start_time, sh.end_time,
                    m.title AS movie_title,
                    r.name AS showroom_name,
                    COUNT(s.id) AS available_seats
             FROM shows sh
             JOIN movies m ON m.id = sh.movie_id
             JOIN showrooms r ON r.id = sh.showroom_id
             JOIN seats s ON s.show_id = sh.id AND s.state = 'available'
             WHERE sh.start_time > $1
             GROUP BY sh.id, m.title, r.name
             ORDER BY sh.start_time, sh.id",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(listing)
    }
}
