// Runs against a real database: `DATABASE_URL=postgres://... cargo test -- --ignored`.

mod common;

use std::{sync::Arc, time::Duration};

use futures::{future::join_all, TryStreamExt};
use sqlx::PgPool;
use uuid::Uuid;

use cinema_booking::{
    config::BookingConfig,
    models::{
        BookingDraft, BookingLine, NewMovie, NewShowroom, ScheduleShowRequest, ScheduledShow, Seat,
        SeatState, SeatType, SeatZone, ShowDraft,
    },
    store::{PgStore, Store},
    Cinema, Error,
};
use common::{jane, money, premiums, random_customer, tomorrow_at};

fn pg_cinema(pool: PgPool) -> (Arc<PgStore>, Arc<Cinema<PgStore>>) {
    let store = Arc::new(PgStore::new(pool));
    let cinema = Arc::new(Cinema::new(store.clone(), &BookingConfig::default()));
    (store, cinema)
}

async fn seed(cinema: &Cinema<PgStore>) -> ScheduledShow {
    let movie = cinema
        .catalog
        .add_movie(NewMovie {
            title: "Seven Samurai".to_string(),
            description: "Kurosawa".to_string(),
            poster: None,
            duration_minutes: 207,
        })
        .await
        .unwrap();
    let room = cinema
        .catalog
        .add_showroom(NewShowroom {
            name: "Studio".to_string(),
            capacity: 10,
            location: "first floor".to_string(),
            zones: vec![
                SeatZone::new(1..=2, 1..=4, SeatType::Standard),
                SeatZone::new(1..=2, 5..=5, SeatType::Vip),
            ],
        })
        .await
        .unwrap();
    cinema
        .scheduler
        .schedule_show(ScheduleShowRequest {
            movie_id: movie.id,
            showroom_id: room.id,
            start_time: tomorrow_at(18),
            base_price: money(800),
            premiums: premiums(&[(SeatType::Vip, 25)]),
        })
        .await
        .unwrap()
}

#[ignore = "needs DATABASE_URL"]
#[sqlx::test(migrations = "./migrations")]
async fn books_and_reads_back_a_ticket(pool: PgPool) {
    let (_, cinema) = pg_cinema(pool);
    let show = seed(&cinema).await;
    assert_eq!(show.seats.len(), 10);
    assert_eq!(show.pricing.premium_for(SeatType::Vip), money(2500));

    let standard = show.seats.iter().find(|s| s.seat_type == SeatType::Standard).unwrap();
    let vip = show.seats.iter().find(|s| s.seat_type == SeatType::Vip).unwrap();
    let booking = cinema
        .booking
        .book_seats(show.show.id, [standard.id, vip.id], jane())
        .await
        .unwrap();
    assert_eq!(booking.total_price, money(1800));

    let ticket = cinema.booking.ticket(booking.reference).await.unwrap();
    assert_eq!(ticket.seat_ids(), booking.seat_ids());
    assert_eq!(ticket.customer, jane());

    let free: Vec<Seat> = cinema.booking.available_seats(show.show.id).await.unwrap().try_collect().await.unwrap();
    assert_eq!(free.len(), 8);

    let err = cinema.booking.book_seats(show.show.id, [vip.id], jane()).await.unwrap_err();
    assert!(matches!(err, Error::SeatUnavailable { seat_ids } if seat_ids == vec![vip.id]));
}

#[ignore = "needs DATABASE_URL"]
#[sqlx::test(migrations = "./migrations")]
async fn overlapping_show_is_a_conflict(pool: PgPool) {
    let (store, cinema) = pg_cinema(pool);
    let first = seed(&cinema).await;
    let room = cinema.catalog.showroom(first.show.showroom_id).await.unwrap();

    let clash = ShowDraft {
        movie_id: first.show.movie_id,
        showroom_id: room.id,
        start_time: first.show.start_time + chrono::TimeDelta::minutes(30),
        base_price: money(800),
        premiums: Default::default(),
    };
    assert!(matches!(store.create_show(clash, &room).await, Err(Error::Conflict(_))));

    let movie = cinema.catalog.movie(first.show.movie_id).await.unwrap();
    let edit = NewMovie {
        title: movie.title.clone(),
        description: movie.description.clone(),
        poster: None,
        duration_minutes: 60,
    };
    assert!(matches!(cinema.catalog.update_movie(movie.id, edit).await, Err(Error::Conflict(_))));
}

#[ignore = "needs DATABASE_URL"]
#[sqlx::test(migrations = "./migrations")]
async fn row_locks_serialise_competing_commits(pool: PgPool) {
    let (store, cinema) = pg_cinema(pool);
    let show = seed(&cinema).await;
    let seat = &show.seats[0];

    // bypass the in-process lock map so only the row locks arbitrate
    let drafts = (0..8).map(|_| BookingDraft {
        reference: Uuid::new_v4(),
        show_id: show.show.id,
        customer: random_customer(),
        lines: vec![BookingLine {
            seat_id: seat.id,
            label: seat.label.clone(),
            seat_type: seat.seat_type,
            price: money(800),
        }],
        total_price: money(800),
    });
    let results = join_all(drafts.map(|draft| {
        let store = store.clone();
        async move { store.commit_booking(draft, Duration::from_secs(5)).await }
    }))
    .await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, Error::SeatUnavailable { .. })));

    let map = cinema.booking.seat_map(show.show.id).await.unwrap();
    assert_eq!(map.iter().filter(|s| s.state == SeatState::Booked).count(), 1);
}

#[ignore = "needs DATABASE_URL"]
#[sqlx::test(migrations = "./migrations")]
async fn held_row_lock_times_out(pool: PgPool) {
    let (store, cinema) = pg_cinema(pool.clone());
    let show = seed(&cinema).await;
    let seat = &show.seats[0];

    let mut blocker = pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM seats WHERE id = $1 FOR UPDATE")
        .bind(seat.id)
        .execute(&mut *blocker)
        .await
        .unwrap();

    let draft = BookingDraft {
        reference: Uuid::new_v4(),
        show_id: show.show.id,
        customer: jane(),
        lines: vec![BookingLine {
            seat_id: seat.id,
            label: seat.label.clone(),
            seat_type: seat.seat_type,
            price: money(800),
        }],
        total_price: money(800),
    };
    let err = store.commit_booking(draft, Duration::from_millis(100)).await.unwrap_err();
    assert!(matches!(err, Error::LockTimeout));
    assert!(err.is_retryable());

    blocker.rollback().await.unwrap();
    assert!(cinema.booking.seat_map(show.show.id).await.unwrap().iter().all(|s| s.is_available()));
}

#[ignore = "needs DATABASE_URL"]
#[sqlx::test(migrations = "./migrations")]
async fn listing_skips_sold_out_shows(pool: PgPool) {
    let (_, cinema) = pg_cinema(pool);
    let show = seed(&cinema).await;

    let listing = cinema.booking.upcoming_available_shows(chrono::Utc::now()).await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].available_seats, 10);
    assert_eq!(listing[0].movie_title, "Seven Samurai");

    let all: Vec<i64> = show.seats.iter().map(|s| s.id).collect();
    cinema.booking.book_seats(show.show.id, all, random_customer()).await.unwrap();
    assert!(cinema.booking.upcoming_available_shows(chrono::Utc::now()).await.unwrap().is_empty());
}
