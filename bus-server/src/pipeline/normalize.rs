//! Conversion from store documents to domain types.
//!
//! This is the only place that deals with missing or malformed fields.
//! Inactive services are dropped; everything else becomes a [`Bus`] with
//! safe defaults filled in.

use std::collections::BTreeSet;

use crate::domain::{Bus, ClockTime, ReportedStatus, Route, Rupees, SeatAvailability, TripDuration};
use crate::store::{BusDocument, RouteDocument};

/// Normalize a snapshot of documents, preserving their order.
///
/// Only documents with `isActive` exactly `true` survive.
pub fn normalize(documents: &[BusDocument]) -> Vec<Bus> {
    let buses: Vec<Bus> = documents
        .iter()
        .filter(|doc| doc.is_active == Some(true))
        .map(normalize_document)
        .collect();

    tracing::debug!(
        documents = documents.len(),
        active = buses.len(),
        "normalized bus snapshot"
    );
    buses
}

/// Normalize a single active document.
pub fn normalize_document(doc: &BusDocument) -> Bus {
    let route = doc.route.as_ref().map(normalize_route);
    let route_label = route.as_ref().map(Route::label).unwrap_or_default();

    let departure = parse_time(doc.departure_time.as_deref(), doc, "departureTime");
    let arrival = parse_time(doc.arrival_time.as_deref(), doc, "arrivalTime");

    // A stated duration wins; otherwise derive one from the timetable.
    let duration = doc
        .duration
        .as_deref()
        .and_then(|d| TripDuration::parse(d).ok())
        .or_else(|| Some(TripDuration::between(departure?, arrival?)));

    let total_seats = count(doc.total_seats);
    let seats = SeatAvailability::compute(
        total_seats,
        doc.booked_seats.map(|n| count(Some(n))),
        doc.available_seats.map(|n| count(Some(n))),
    );

    Bus {
        id: doc.id.clone().unwrap_or_default(),
        bus_number: doc.bus_number.clone().unwrap_or_default(),
        operator: doc.operator.clone().unwrap_or_default(),
        bus_type: doc.bus_type.clone().unwrap_or_default(),
        rating: doc
            .rating
            .filter(|r| r.is_finite() && *r >= 0.0)
            .unwrap_or(0.0),
        review_count: count(doc.review_count),
        route,
        route_label,
        departure,
        arrival,
        duration,
        total_seats: seats.total,
        available_seats: seats.available,
        occupancy_percentage: seats.occupancy_percentage,
        price: doc.price.map(Rupees::from_raw).unwrap_or_default(),
        discount_percent: doc
            .discount_percent
            .filter(|p| p.is_finite())
            .map(|p| p.round().clamp(0.0, 100.0) as u8),
        features: normalize_features(&doc.features),
        is_prime: doc.is_prime.unwrap_or(false),
        women_only: doc.women_only.unwrap_or(false),
        reported: reported_status(doc),
    }
}

fn normalize_route(route: &RouteDocument) -> Route {
    Route {
        from: route.from.clone().unwrap_or_default(),
        to: route.to.clone().unwrap_or_default(),
        distance_km: route
            .distance_km
            .filter(|d| d.is_finite() && *d >= 0.0)
            .unwrap_or(0.0),
    }
}

fn parse_time(raw: Option<&str>, doc: &BusDocument, field: &'static str) -> Option<ClockTime> {
    let raw = raw?;
    match ClockTime::parse_hhmm(raw) {
        Ok(time) => Some(time),
        Err(e) => {
            tracing::warn!(
                id = doc.id.as_deref().unwrap_or(""),
                field,
                value = raw,
                error = %e,
                "ignoring unparseable time"
            );
            None
        }
    }
}

/// A non-negative whole count; anything else becomes 0.
fn count(raw: Option<f64>) -> u32 {
    match raw {
        Some(n) if n.is_finite() && n > 0.0 => n.round().min(u32::MAX as f64) as u32,
        _ => 0,
    }
}

fn normalize_features(raw: &[String]) -> BTreeSet<String> {
    raw.iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

/// Operator-reported status. Cancellation beats delay.
fn reported_status(doc: &BusDocument) -> ReportedStatus {
    let status = doc
        .status
        .as_deref()
        .map(|s| s.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if doc.is_cancelled == Some(true) || status == "cancelled" || status == "canceled" {
        return ReportedStatus::Cancelled;
    }

    let delay = doc.delay_minutes.map(|m| count(Some(m))).filter(|m| *m > 0);
    if delay.is_some() || status == "delayed" {
        return ReportedStatus::Delayed { minutes: delay };
    }

    ReportedStatus::None
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn any_document() -> impl Strategy<Value = BusDocument> {
        (
            prop::option::of(any::<bool>()),
            prop::option::of(-10.0f64..200.0),
            prop::option::of(-10.0f64..300.0),
            prop::option::of(-10.0f64..300.0),
            prop::option::of(-500.0f64..5000.0),
        )
            .prop_map(|(is_active, total, booked, available, price)| BusDocument {
                is_active,
                total_seats: total,
                booked_seats: booked,
                available_seats: available,
                price,
                ..Default::default()
            })
    }

    proptest! {
        /// Only active documents survive normalization
        #[test]
        fn only_active_survive(docs in prop::collection::vec(any_document(), 0..20)) {
            let expected = docs.iter().filter(|d| d.is_active == Some(true)).count();
            let buses = normalize(&docs);
            prop_assert_eq!(buses.len(), expected);
        }

        /// Seat counts and occupancy are always in range
        #[test]
        fn seats_in_bounds(docs in prop::collection::vec(any_document(), 0..20)) {
            for bus in normalize(&docs) {
                prop_assert!(bus.available_seats <= bus.total_seats);
                prop_assert!(bus.occupancy_percentage >= 0.0);
                prop_assert!(bus.occupancy_percentage <= 100.0);
            }
        }
    }
}
