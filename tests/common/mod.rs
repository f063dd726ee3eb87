#![allow(dead_code)]

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, TimeDelta, Utc};
use fake::{
    faker::{internet::en::SafeEmail, name::en::Name},
    Fake,
};
use rust_decimal::Decimal;

use cinema_booking::{
    config::BookingConfig,
    models::{
        Customer, Movie, NewMovie, NewShowroom, ScheduleShowRequest, ScheduledShow, SeatType,
        SeatZone, Showroom,
    },
    store::{MemoryStore, Store},
    Cinema,
};

mod gated;

pub use gated::GatedStore;

pub type TestCinema = Arc<Cinema<MemoryStore>>;

pub fn cinema() -> TestCinema {
    Arc::new(Cinema::new(Arc::new(MemoryStore::new()), &BookingConfig::default()))
}

/// Engine over any store with a given seat-lock budget.
pub fn cinema_over<S: Store>(store: S, lock_timeout_ms: u64) -> Arc<Cinema<S>> {
    Arc::new(Cinema::new(Arc::new(store), &BookingConfig { lock_timeout_ms }))
}

pub fn jane() -> Customer {
    Customer {
        name: "Jane Doe".to_string(),
        email: "jane@example.com".to_string(),
        phone: "+15550100".to_string(),
    }
}

pub fn random_customer() -> Customer {
    Customer {
        name: Name().fake(),
        email: SafeEmail().fake(),
        phone: format!("+1555{:04}", (0..10_000u32).fake::<u32>()),
    }
}

pub fn tomorrow_at(hour: u32) -> DateTime<Utc> {
    let day = (Utc::now() + TimeDelta::days(1)).date_naive();
    day.and_hms_opt(hour, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or_else(|| Utc::now() + TimeDelta::days(1))
}

pub fn money(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

pub fn premiums(entries: &[(SeatType, i64)]) -> BTreeMap<SeatType, Decimal> {
    entries
        .iter()
        .map(|(seat_type, pct)| (*seat_type, Decimal::from(*pct)))
        .collect()
}

pub async fn add_movie<S: Store>(cinema: &Cinema<S>, title: &str, minutes: i32) -> Movie {
    cinema
        .catalog
        .add_movie(NewMovie {
            title: title.to_string(),
            description: format!("{} (director's cut)", title),
            poster: Some(format!("posters/{}.jpg", title.to_lowercase().replace(' ', "-"))),
            duration_minutes: minutes,
        })
        .await
        .unwrap()
}

/// Ten seats in two rows; column 5 of each row is vip.
pub async fn add_small_room<S: Store>(cinema: &Cinema<S>, name: &str) -> Showroom {
    cinema
        .catalog
        .add_showroom(NewShowroom {
            name: name.to_string(),
            capacity: 10,
            location: "first floor".to_string(),
            zones: vec![
                SeatZone::new(1..=2, 1..=4, SeatType::Standard),
                SeatZone::new(1..=2, 5..=5, SeatType::Vip),
            ],
        })
        .await
        .unwrap()
}

/// A hundred seats: rows 1-8 standard, rows 9-10 vip.
pub async fn add_large_room<S: Store>(cinema: &Cinema<S>, name: &str) -> Showroom {
    cinema
        .catalog
        .add_showroom(NewShowroom {
            name: name.to_string(),
            capacity: 100,
            location: "ground floor".to_string(),
            zones: vec![
                SeatZone::new(1..=8, 1..=10, SeatType::Standard),
                SeatZone::new(9..=10, 1..=10, SeatType::Vip),
            ],
        })
        .await
        .unwrap()
}

pub async fn schedule<S: Store>(
    cinema: &Cinema<S>,
    movie: &Movie,
    room: &Showroom,
    start: DateTime<Utc>,
) -> ScheduledShow {
    cinema
        .scheduler
        .schedule_show(ScheduleShowRequest {
            movie_id: movie.id,
            showroom_id: room.id,
            start_time: start,
            base_price: money(1000),
            premiums: premiums(&[(SeatType::Vip, 50)]),
        })
        .await
        .unwrap()
}
