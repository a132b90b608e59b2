//! Filter criteria for the timetable view.

use std::fmt;

use serde::Serialize;

use crate::domain::{Bus, Rupees};

use super::sort::{SortDirection, SortKey};

/// A dropdown-style selection: everything, or one exact value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

impl Selection {
    /// Parse a query value. Missing, empty and "all" select everything.
    ///
    /// ```
    /// use bus_server::pipeline::Selection;
    ///
    /// assert_eq!(Selection::parse(None), Selection::All);
    /// assert_eq!(Selection::parse(Some("ALL")), Selection::All);
    /// assert_eq!(Selection::parse(Some("Sleeper")), Selection::Only("Sleeper".into()));
    /// ```
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Selection::All,
            Some(s) if s.eq_ignore_ascii_case("all") => Selection::All,
            Some(s) => Selection::Only(s.to_string()),
        }
    }

    /// Whether `value` passes this selection.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(wanted) => wanted == value,
        }
    }

    /// The selected value, if a specific one is selected.
    pub fn value(&self) -> Option<&str> {
        match self {
            Selection::All => None,
            Selection::Only(v) => Some(v),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => f.write_str("all"),
            Selection::Only(v) => f.write_str(v),
        }
    }
}

/// Inclusive price bounds on the base fare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PriceRange {
    pub min: Rupees,
    pub max: Rupees,
}

impl PriceRange {
    /// A range that excludes nothing.
    pub const ANY: PriceRange = PriceRange {
        min: Rupees::ZERO,
        max: Rupees::MAX,
    };

    /// Build a range, returning `None` when `min > max`.
    pub fn new(min: Rupees, max: Rupees) -> Option<Self> {
        (min <= max).then_some(Self { min, max })
    }

    pub fn contains(&self, price: Rupees) -> bool {
        self.min <= price && price <= self.max
    }
}

impl Default for PriceRange {
    fn default() -> Self {
        Self::ANY
    }
}

/// Everything the user can filter and sort the timetable by.
///
/// An immutable value: the web layer builds one per request from the query
/// string, and `FilterCriteria::default()` is the "reset filters" state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    /// Matches the route label exactly.
    pub route: Selection,
    /// Case-insensitive substring; empty matches everything.
    pub search: String,
    pub bus_type: Selection,
    pub operator: Selection,
    pub price: PriceRange,
    pub women_only: bool,
    pub prime_only: bool,
    pub sort: SortKey,
    pub direction: SortDirection,
}

impl FilterCriteria {
    /// Whether a bus passes every active filter clause.
    pub fn matches(&self, bus: &Bus) -> bool {
        self.route.matches(&bus.route_label)
            && self.matches_search(bus)
            && self.bus_type.matches(&bus.bus_type)
            && self.operator.matches(&bus.operator)
            && self.price.contains(bus.price)
            && (!self.women_only || bus.women_only)
            && (!self.prime_only || bus.is_prime)
    }

    fn matches_search(&self, bus: &Bus) -> bool {
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        [
            bus.bus_number.as_str(),
            bus.route_label.as_str(),
            bus.operator.as_str(),
            bus.bus_type.as_str(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }

    /// Whether any filter clause is active (sorting aside).
    pub fn is_filtering(&self) -> bool {
        self.route != Selection::All
            || !self.search.trim().is_empty()
            || self.bus_type != Selection::All
            || self.operator != Selection::All
            || self.price != PriceRange::ANY
            || self.women_only
            || self.prime_only
    }
}
