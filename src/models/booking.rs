use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::SeatType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Customer {
    #[validate(length(min = 1, max = 255, message = "customer name must not be empty"))]
    pub name: String,
    #[validate(email(message = "customer email is not a valid address"))]
    pub email: String,
    #[validate(length(min = 3, max = 32, message = "customer phone must be 3 to 32 characters"))]
    pub phone: String,
}

/// One booked seat with the price charged for it.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct BookingLine {
    pub seat_id: i64,
    pub label: String,
    pub seat_type: SeatType,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    /// Ticket reference handed to the customer.
    pub reference: Uuid,
    pub show_id: i64,
    pub customer: Customer,
    pub lines: Vec<BookingLine>,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn seat_ids(&self) -> Vec<i64> {
        self.lines.iter().map(|line| line.seat_id).collect()
    }
}

/// Priced booking handed to the store for the atomic commit. `lines` are
/// sorted by seat id.
#[derive(Debug, Clone)]
pub struct BookingDraft {
    pub reference: Uuid,
    pub show_id: i64,
    pub customer: Customer,
    pub lines: Vec<BookingLine>,
    pub total_price: Decimal,
}

impl BookingDraft {
    pub fn seat_ids(&self) -> Vec<i64> {
        self.lines.iter().map(|line| line.seat_id).collect()
    }

    pub fn into_booking(self, id: i64, created_at: DateTime<Utc>) -> Booking {
        Booking {
            id,
            reference: self.reference,
            show_id: self.show_id,
            customer: self.customer,
            lines: self.lines,
            total_price: self.total_price,
            created_at,
        }
    }
}
