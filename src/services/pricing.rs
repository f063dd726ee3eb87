use std::{collections::BTreeMap, sync::Arc};

use rust_decimal::{Decimal, RoundingStrategy};

use crate::{
    error::{Error, Result},
    models::{Pricing, Seat, SeatType, Show},
    store::Store,
};

/// Currency precision for every amount the engine produces.
pub const DECIMAL_PLACES: u32 = 2;

/// Largest base price a pricing sheet may carry, `NUMERIC(10, 2)`.
pub const MAX_BASE_PRICE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);
/// Largest premium percentage accepted for a seat type.
pub const MAX_PREMIUM: Decimal = Decimal::from_parts(1_000, 0, 0, false, 0);

/// `base * (1 + premium / 100)`, rounded half-up to currency precision.
pub fn quote(pricing: &Pricing, seat_type: SeatType) -> Result<Decimal> {
    let premium = pricing.premium_for(seat_type);
    let factor = premium
        .checked_div(Decimal::ONE_HUNDRED)
        .and_then(|share| share.checked_add(Decimal::ONE))
        .and_then(|factor| pricing.base_price.checked_mul(factor))
        .ok_or_else(|| {
            Error::Validation(format!(
                "price of a {} seat on show {} is out of range",
                seat_type.as_str(),
                pricing.show_id
            ))
        })?;
    Ok(factor.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero))
}

/// Base price must be positive, at most [`MAX_BASE_PRICE`] and in whole cents.
/// Premiums range over `0..=MAX_PREMIUM`.
pub fn validate_price_sheet(base_price: Decimal, premiums: &BTreeMap<SeatType, Decimal>) -> Result<()> {
    if base_price <= Decimal::ZERO || base_price > MAX_BASE_PRICE {
        return Err(Error::Validation(format!(
            "base price must be between 0.01 and {}, got {}",
            MAX_BASE_PRICE, base_price
        )));
    }
    if base_price.normalize().scale() > DECIMAL_PLACES {
        return Err(Error::Validation(format!(
            "base price must be in whole cents, got {}",
            base_price
        )));
    }
    if let Some((seat_type, premium)) = premiums
        .iter()
        .find(|(_, premium)| **premium < Decimal::ZERO || **premium > MAX_PREMIUM)
    {
        return Err(Error::Validation(format!(
            "premium for {} seats must be between 0 and {}, got {}",
            seat_type.as_str(),
            MAX_PREMIUM,
            premium
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct PricingEngine<S> {
    store: Arc<S>,
}

impl<S: Store> PricingEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Pricing sheet of a show. A show without one is a data-integrity fault.
    pub async fn pricing(&self, show_id: i64) -> Result<Pricing> {
        self.store
            .pricing(show_id)
            .await?
            .ok_or_else(|| Error::not_found("pricing for show", show_id))
    }

    pub async fn price_for(&self, show: &Show, seat: &Seat) -> Result<Decimal> {
        let pricing = self.pricing(show.id).await?;
        quote(&pricing, seat.seat_type)
    }
}
