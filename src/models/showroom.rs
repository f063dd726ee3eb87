use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::SeatType;

/// Upper bound on seats per showroom; matches the `capacity` validator.
pub const MAX_CAPACITY: i32 = 10_000;

/// Rectangular block of seats sharing one seat type. Rows and columns are
/// 1-based and inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct SeatZone {
    pub row_start: i32,
    pub row_end: i32,
    pub column_start: i32,
    pub column_end: i32,
    pub seat_type: SeatType,
}

impl SeatZone {
    pub fn new(rows: RangeInclusive<i32>, columns: RangeInclusive<i32>, seat_type: SeatType) -> Self {
        Self {
            row_start: *rows.start(),
            row_end: *rows.end(),
            column_start: *columns.start(),
            column_end: *columns.end(),
            seat_type,
        }
    }

    pub fn rows(&self) -> RangeInclusive<i32> {
        self.row_start..=self.row_end
    }

    pub fn columns(&self) -> RangeInclusive<i32> {
        self.column_start..=self.column_end
    }

    pub fn is_well_formed(&self) -> bool {
        self.row_start >= 1
            && self.column_start >= 1
            && self.row_end >= self.row_start
            && self.column_end >= self.column_start
    }

    /// Number of cells; zero for malformed ranges.
    pub fn cell_count(&self) -> i64 {
        if !self.is_well_formed() {
            return 0;
        }
        let rows = i64::from(self.row_end - self.row_start) + 1;
        let columns = i64::from(self.column_end - self.column_start) + 1;
        rows * columns
    }

    pub fn overlaps(&self, other: &SeatZone) -> bool {
        self.row_start <= other.row_end
            && other.row_start <= self.row_end
            && self.column_start <= other.column_end
            && other.column_start <= self.column_end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Showroom {
    pub id: i64,
    pub name: String,
    pub capacity: i32,
    pub location: String,
    /// Seat-map template, in generation order.
    pub zones: Vec<SeatZone>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewShowroom {
    #[validate(length(min = 1, max = 255, message = "name must not be empty"))]
    pub name: String,
    #[validate(range(min = 1, max = 10000, message = "capacity must be between 1 and 10000"))]
    pub capacity: i32,
    pub location: String,
    pub zones: Vec<SeatZone>,
}

impl NewShowroom {
    /// Room whose every seat is of one type, laid out as `rows` x `columns`.
    pub fn uniform(name: impl Into<String>, location: impl Into<String>, rows: i32, columns: i32) -> Self {
        Self {
            name: name.into(),
            // overflow is left for validation to reject
            capacity: rows.checked_mul(columns).unwrap_or(i32::MAX),
            location: location.into(),
            zones: vec![SeatZone::new(1..=rows, 1..=columns, SeatType::Standard)],
        }
    }

    pub fn into_showroom(self, id: i64) -> Showroom {
        Showroom {
            id,
            name: self.name,
            capacity: self.capacity,
            location: self.location,
            zones: self.zones,
        }
    }
}
