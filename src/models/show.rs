use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{Movie, Pricing, Seat, SeatType};

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Show {
    pub id: i64,
    pub movie_id: i64,
    pub showroom_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl Show {
    /// Half-open interval test: `[start, end)` against this show's interval.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end_time && self.start_time < end
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleShowRequest {
    pub movie_id: i64,
    pub showroom_id: i64,
    pub start_time: DateTime<Utc>,
    pub base_price: Decimal,
    /// Percentage surcharge per seat type. Missing types cost the base price.
    #[serde(default)]
    pub premiums: BTreeMap<SeatType, Decimal>,
}

/// Validated show ready to be persisted together with its seats and pricing.
/// The end time is taken from the movie row the store locks for the insert.
#[derive(Debug, Clone)]
pub struct ShowDraft {
    pub movie_id: i64,
    pub showroom_id: i64,
    pub start_time: DateTime<Utc>,
    pub base_price: Decimal,
    pub premiums: BTreeMap<SeatType, Decimal>,
}

impl ShowDraft {
    pub fn end_time(&self, movie: &Movie) -> DateTime<Utc> {
        self.start_time + movie.duration()
    }

    pub fn to_show(&self, id: i64, movie: &Movie) -> Show {
        Show {
            id,
            movie_id: self.movie_id,
            showroom_id: self.showroom_id,
            start_time: self.start_time,
            end_time: self.end_time(movie),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduledShow {
    pub show: Show,
    pub pricing: Pricing,
    pub seats: Vec<Seat>,
}

/// Row of the "what can I watch" listing.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ShowAvailability {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub show: Show,
    pub movie_title: String,
    pub showroom_name: String,
    pub available_seats: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn show_at(start: DateTime<Utc>, minutes: i64) -> Show {
        Show {
            id: 1,
            movie_id: 1,
            showroom_id: 1,
            start_time: start,
            end_time: start + TimeDelta::minutes(minutes),
        }
    }

    #[test]
    fn back_to_back_shows_do_not_overlap() {
        let start = Utc::now();
        let show = show_at(start, 120);
        let next = show.end_time;
        assert!(!show.overlaps(next, next + TimeDelta::minutes(90)));
        assert!(!show.overlaps(start - TimeDelta::minutes(60), start));
    }

    #[test]
    fn intersecting_intervals_overlap() {
        let start = Utc::now();
        let show = show_at(start, 120);
        assert!(show.overlaps(start + TimeDelta::minutes(119), start + TimeDelta::minutes(200)));
        assert!(show.overlaps(start - TimeDelta::minutes(10), start + TimeDelta::minutes(1)));
        assert!(show.overlaps(start + TimeDelta::minutes(30), start + TimeDelta::minutes(40)));
    }
}
