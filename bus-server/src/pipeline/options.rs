//! Choices offered by the filter form.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::{Bus, Rupees};

/// Distinct values present in a snapshot, for populating dropdowns.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub routes: Vec<String>,
    pub operators: Vec<String>,
    pub bus_types: Vec<String>,
    /// Cheapest and dearest base fare, `None` for an empty snapshot.
    pub price_bounds: Option<(Rupees, Rupees)>,
}

impl FilterOptions {
    /// Collect options from a snapshot. Values come back sorted and
    /// de-duplicated; empty strings are left out.
    pub fn from_buses(buses: &[Bus]) -> Self {
        let mut routes = BTreeSet::new();
        let mut operators = BTreeSet::new();
        let mut bus_types = BTreeSet::new();
        let mut price_bounds: Option<(Rupees, Rupees)> = None;

        for bus in buses {
            insert_non_empty(&mut routes, &bus.route_label);
            insert_non_empty(&mut operators, &bus.operator);
            insert_non_empty(&mut bus_types, &bus.bus_type);

            price_bounds = Some(match price_bounds {
                None => (bus.price, bus.price),
                Some((lo, hi)) => (lo.min(bus.price), hi.max(bus.price)),
            });
        }

        Self {
            routes: routes.into_iter().collect(),
            operators: operators.into_iter().collect(),
            bus_types: bus_types.into_iter().collect(),
            price_bounds,
        }
    }
}

fn insert_non_empty(set: &mut BTreeSet<String>, value: &str) {
    if !value.is_empty() && !set.contains(value) {
        set.insert(value.to_string());
    }
}
