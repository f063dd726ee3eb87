pub mod booking;
pub mod catalog;
pub mod locks;
pub mod pricing;
pub mod scheduler;
pub mod seatmap;

use std::sync::Arc;

use crate::{config::BookingConfig, store::Store};

pub use booking::BookingEngine;
pub use catalog::Catalog;
pub use pricing::PricingEngine;
pub use scheduler::Scheduler;

/// The engine's services wired over one store.
#[derive(Clone)]
pub struct Cinema<S> {
    pub catalog: Catalog<S>,
    pub scheduler: Scheduler<S>,
    pub pricing: PricingEngine<S>,
    pub booking: BookingEngine<S>,
}

impl<S: Store> Cinema<S> {
    pub fn new(store: Arc<S>, booking: &BookingConfig) -> Self {
        Self {
            catalog: Catalog::new(store.clone()),
            scheduler: Scheduler::new(store.clone()),
            pricing: PricingEngine::new(store.clone()),
            booking: BookingEngine::new(store, booking.lock_timeout()),
        }
    }
}
