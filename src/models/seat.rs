use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Closed set of seat categories. Premiums are looked up per variant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "seat_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SeatType {
    Standard,
    Vip,
    Couple,
    SuperVip,
}

impl SeatType {
    pub const ALL: [SeatType; 4] = [SeatType::Standard, SeatType::Vip, SeatType::Couple, SeatType::SuperVip];

    pub fn as_str(&self) -> &'static str {
        match self {
            SeatType::Standard => "standard",
            SeatType::Vip => "vip",
            SeatType::Couple => "couple",
            SeatType::SuperVip => "super_vip",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "seat_state", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SeatState {
    Available,
    Held,
    Booked,
}

/// A seat instance owned by exactly one show.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Seat {
    pub id: i64,
    pub show_id: i64,
    #[sqlx(rename = "row_number")]
    pub row: i32,
    #[sqlx(rename = "column_number")]
    pub column: i32,
    pub label: String,
    pub seat_type: SeatType,
    pub state: SeatState,
}

impl Seat {
    pub fn is_available(&self) -> bool {
        self.state == SeatState::Available
    }
}

/// Seat produced by the seat-map generator, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewSeat {
    pub show_id: i64,
    pub row: i32,
    pub column: i32,
    pub label: String,
    pub seat_type: SeatType,
}

impl NewSeat {
    pub fn into_seat(self, id: i64) -> Seat {
        Seat {
            id,
            show_id: self.show_id,
            row: self.row,
            column: self.column,
            label: self.label,
            seat_type: self.seat_type,
            state: SeatState::Available,
        }
    }
}
