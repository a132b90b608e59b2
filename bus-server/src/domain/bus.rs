//! The normalized bus service record.

use std::collections::BTreeSet;

use serde::Serialize;

use super::fare::Rupees;
use super::status::ReportedStatus;
use super::time::{ClockTime, TripDuration};

/// Origin and destination of a service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub from: String,
    pub to: String,
    pub distance_km: f64,
}

impl Route {
    /// Display label used for grouping and filtering, e.g. "Delhi - Jaipur".
    pub fn label(&self) -> String {
        format!("{} - {}", self.from, self.to)
    }
}

/// A scheduled bus service after normalization.
///
/// Every field is present; defaults have already been applied, so code
/// that receives a `Bus` never needs to check for missing data. Only active
/// services are ever turned into a `Bus`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bus {
    /// Document id assigned by the store.
    pub id: String,
    pub bus_number: String,
    pub operator: String,
    /// Service class, e.g. "AC Sleeper", "Volvo Multi-Axle Semi-Sleeper".
    pub bus_type: String,
    /// 0 when the document carries no rating.
    pub rating: f64,
    pub review_count: u32,
    pub route: Option<Route>,
    /// "{from} - {to}", or empty when the route is unknown.
    pub route_label: String,
    pub departure: Option<ClockTime>,
    pub arrival: Option<ClockTime>,
    pub duration: Option<TripDuration>,
    pub total_seats: u32,
    /// Always within `[0, total_seats]`.
    pub available_seats: u32,
    /// Always within `[0, 100]`.
    pub occupancy_percentage: f64,
    pub price: Rupees,
    pub discount_percent: Option<u8>,
    pub features: BTreeSet<String>,
    pub is_prime: bool,
    pub women_only: bool,
    pub reported: ReportedStatus,
}

impl Bus {
    /// Seats already taken.
    pub fn booked_seats(&self) -> u32 {
        self.total_seats - self.available_seats
    }

    /// Price after any discount.
    pub fn final_price(&self) -> Rupees {
        match self.discount_percent {
            Some(pct) => self.price.discounted(pct),
            None => self.price,
        }
    }

    pub fn is_sold_out(&self) -> bool {
        self.available_seats == 0
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f.eq_ignore_ascii_case(feature))
    }
}

/// Seat availability derived from a document's seat counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeatAvailability {
    pub total: u32,
    pub available: u32,
    pub occupancy_percentage: f64,
}

impl SeatAvailability {
    /// Compute availability from whichever counts a document supplies.
    ///
    /// An explicit `available` wins over `booked`; both are clamped into
    /// `[0, total]`. With neither supplied there is no way to know what is
    /// free, so nothing is offered.
    ///
    /// ```
    /// use bus_server::domain::SeatAvailability;
    ///
    /// let seats = SeatAvailability::compute(40, Some(30), None);
    /// assert_eq!(seats.available, 10);
    /// assert_eq!(seats.occupancy_percentage, 75.0);
    ///
    /// let empty = SeatAvailability::compute(0, Some(3), None);
    /// assert_eq!(empty.available, 0);
    /// assert_eq!(empty.occupancy_percentage, 0.0);
    /// ```
    pub fn compute(total: u32, booked: Option<u32>, available: Option<u32>) -> Self {
        let available = match (available, booked) {
            (Some(available), _) => available.min(total),
            (None, Some(booked)) => total.saturating_sub(booked),
            (None, None) => 0,
        };

        let occupancy_percentage = if total == 0 {
            0.0
        } else {
            (total - available) as f64 / total as f64 * 100.0
        };

        Self {
            total,
            available,
            occupancy_percentage,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_label() {
        let route = Route {
            from: "Mumbai".into(),
            to: "Pune".into(),
            distance_km: 150.0,
        };
        assert_eq!(route.label(), "Mumbai - Pune");
    }

    #[test]
    fn seats_prefer_explicit_available() {
        let seats = SeatAvailability::compute(40, Some(10), Some(5));
        assert_eq!(seats.available, 5);
        assert_eq!(seats.occupancy_percentage, 87.5);
    }

    #[test]
    fn seats_clamp_into_range() {
        assert_eq!(SeatAvailability::compute(40, None, Some(99)).available, 40);
        assert_eq!(SeatAvailability::compute(40, Some(99), None).available, 0);
        assert_eq!(
            SeatAvailability::compute(40, Some(99), None).occupancy_percentage,
            100.0
        );
    }

    #[test]
    fn seats_unknown_offer_nothing() {
        let seats = SeatAvailability::compute(40, None, None);
        assert_eq!(seats.available, 0);
        assert_eq!(seats.occupancy_percentage, 100.0);
    }

    #[test]
    fn final_price_applies_discount() {
        let mut bus = fixtures::bus("1");
        assert_eq!(bus.final_price(), Rupees::new(800));

        bus.discount_percent = Some(25);
        assert_eq!(bus.final_price(), Rupees::new(600));
    }

    #[test]
    fn feature_lookup_ignores_case() {
        let mut bus = fixtures::bus("1");
        bus.features.insert("WiFi".into());
        assert!(bus.has_feature("wifi"));
        assert!(!bus.has_feature("charging"));
    }

    #[test]
    fn booked_seats() {
        let bus = fixtures::bus("1");
        assert_eq!(bus.booked_seats(), 20);
        assert!(!bus.is_sold_out());
    }
}
