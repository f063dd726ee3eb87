pub mod booking;
pub mod movie;
pub mod pricing;
pub mod seat;
pub mod show;
pub mod showroom;

pub use booking::{Booking, BookingDraft, BookingLine, Customer};
pub use movie::{Movie, NewMovie};
pub use pricing::Pricing;
pub use seat::{NewSeat, Seat, SeatState, SeatType};
pub use show::{ScheduleShowRequest, ScheduledShow, Show, ShowAvailability, ShowDraft};
pub use showroom::{NewShowroom, SeatZone, Showroom};
