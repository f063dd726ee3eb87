use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::SeatType;

/// Per-show price sheet: base price plus a percentage premium per seat type.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Pricing {
    pub id: i64,
    pub show_id: i64,
    pub base_price: Decimal,
    #[sqlx(rename = "premium_table", json)]
    pub premiums: BTreeMap<SeatType, Decimal>,
}

impl Pricing {
    /// Premium percentage for a seat type; standard and unlisted types are zero.
    pub fn premium_for(&self, seat_type: SeatType) -> Decimal {
        match seat_type {
            SeatType::Standard => Decimal::ZERO,
            other => self.premiums.get(&other).copied().unwrap_or(Decimal::ZERO),
        }
    }
}
