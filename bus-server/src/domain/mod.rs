//! Domain types for the bus timetable.
//!
//! This module contains the validated model that the rest of the crate
//! works with. Raw store documents are converted into these types once, by
//! the pipeline's normalization step, so downstream code can trust them.

mod bus;
mod fare;
mod status;
mod time;

#[cfg(test)]
pub(crate) use bus::fixtures;
pub use bus::{Bus, Route, SeatAvailability};
pub use fare::Rupees;
pub use status::{BusStatus, ReportedStatus};
pub use time::{ClockTime, MINUTES_PER_DAY, TimeError, TripDuration, is_overnight, within_journey};
