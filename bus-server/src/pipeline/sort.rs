//! Timetable ordering.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use crate::domain::Bus;

/// What the timetable is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    DepartureTime,
    Price,
    /// Whole hours only; "5h 10m" and "5h 50m" tie.
    Duration,
    Rating,
    AvailableSeats,
    #[default]
    BusNumber,
}

impl SortKey {
    /// Parse a query value. Unknown keys fall back to bus number.
    ///
    /// ```
    /// use bus_server::pipeline::SortKey;
    ///
    /// assert_eq!(SortKey::parse("price"), SortKey::Price);
    /// assert_eq!(SortKey::parse("departureTime"), SortKey::DepartureTime);
    /// assert_eq!(SortKey::parse("colour"), SortKey::BusNumber);
    /// ```
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "departuretime" | "departure" | "departure_time" => SortKey::DepartureTime,
            "price" => SortKey::Price,
            "duration" => SortKey::Duration,
            "rating" => SortKey::Rating,
            "availableseats" | "seats" | "available_seats" => SortKey::AvailableSeats,
            _ => SortKey::BusNumber,
        }
    }

    /// Query-string form of this key.
    pub fn as_param(&self) -> &'static str {
        match self {
            SortKey::DepartureTime => "departureTime",
            SortKey::Price => "price",
            SortKey::Duration => "duration",
            SortKey::Rating => "rating",
            SortKey::AvailableSeats => "availableSeats",
            SortKey::BusNumber => "busNumber",
        }
    }

    /// Compare two buses on this key alone.
    pub fn compare(&self, a: &Bus, b: &Bus) -> Ordering {
        match self {
            // None sorts first, like an empty "HH:MM" string would.
            SortKey::DepartureTime => a.departure.cmp(&b.departure),
            SortKey::Price => a.price.cmp(&b.price),
            SortKey::Duration => duration_hours(a).cmp(&duration_hours(b)),
            SortKey::Rating => a.rating.total_cmp(&b.rating),
            SortKey::AvailableSeats => a.available_seats.cmp(&b.available_seats),
            SortKey::BusNumber => a.bus_number.cmp(&b.bus_number),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

fn duration_hours(bus: &Bus) -> u32 {
    bus.duration.map(|d| d.hours()).unwrap_or(0)
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    /// Parse a query value: "desc"/"descending" or anything else for ascending.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "desc" | "descending" => SortDirection::Descending,
            _ => SortDirection::Ascending,
        }
    }

    pub fn as_param(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

/// Sort buses in place, keeping equal elements in their original order.
///
/// `slice::sort_by` is a stable sort. Descending order flips the
/// comparator rather than reversing the result, so ties keep their input
/// order in both directions.
pub fn sort_buses<T, F>(items: &mut [T], key: SortKey, direction: SortDirection, bus: F)
where
    F: Fn(&T) -> &Bus,
{
    items.sort_by(|a, b| {
        let ord = key.compare(bus(a), bus(b));
        match direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
}
