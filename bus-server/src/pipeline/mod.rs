//! The bus availability pipeline.
//!
//! Turns a snapshot of store documents into the timetable a user sees:
//!
//! 1. [`normalize`] drops inactive services and fills in safe defaults;
//! 2. [`derive_status`] works out each bus's live status from the clock;
//! 3. [`FilterCriteria`] selects and orders the buses;
//! 4. [`Summary`] counts what is left.
//!
//! Normalization runs once per snapshot. [`run`] covers the remaining
//! steps and is cheap enough to repeat on every request and clock tick.
//! Every step is a pure function of its inputs.

mod config;
mod filter;
mod normalize;
mod options;
mod sort;
mod status;
mod summary;

pub use config::PipelineConfig;
pub use filter::{FilterCriteria, PriceRange, Selection};
pub use normalize::{normalize, normalize_document};
pub use options::FilterOptions;
pub use sort::{SortDirection, SortKey, sort_buses};
pub use status::{derive_status, status_of};
pub use summary::{Summary, summarize};

use serde::Serialize;

use crate::domain::{Bus, BusStatus, ClockTime};

/// A bus together with its status at evaluation time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimetableEntry {
    #[serde(flatten)]
    pub bus: Bus,
    pub status: BusStatus,
}

/// The filtered, sorted timetable and its summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableView {
    pub buses: Vec<TimetableEntry>,
    pub summary: Summary,
    /// The clock minute statuses were derived at.
    pub evaluated_at: ClockTime,
}

impl TimetableView {
    pub fn is_empty(&self) -> bool {
        self.buses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buses.len()
    }
}

/// Derive the timetable view of `buses` at `now`.
///
/// Annotates each bus with its status, keeps those matching `criteria`,
/// sorts them stably and summarizes the result. The input is not modified,
/// and the same inputs always produce the same view.
///
/// ```
/// use bus_server::domain::ClockTime;
/// use bus_server::pipeline::{FilterCriteria, PipelineConfig, run};
///
/// let now = ClockTime::parse_hhmm("12:00").unwrap();
/// let view = run(&[], &FilterCriteria::default(), now, &PipelineConfig::default());
/// assert!(view.is_empty());
/// assert_eq!(view.summary.total, 0);
/// ```
pub fn run(
    buses: &[Bus],
    criteria: &FilterCriteria,
    now: ClockTime,
    config: &PipelineConfig,
) -> TimetableView {
    let mut entries: Vec<TimetableEntry> = buses
        .iter()
        .filter(|bus| criteria.matches(bus))
        .map(|bus| TimetableEntry {
            status: status_of(bus, now, config.boarding_window_mins),
            bus: bus.clone(),
        })
        .collect();

    sort_buses(&mut entries, criteria.sort, criteria.direction, |e| &e.bus);

    let summary = summarize(entries.iter().map(|e| (&e.bus, e.status)));

    tracing::trace!(
        input = buses.len(),
        output = entries.len(),
        now = %now,
        "timetable view derived"
    );

    TimetableView {
        buses: entries,
        summary,
        evaluated_at: now,
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::domain::fixtures::bus;
    use crate::domain::Rupees;
    use proptest::prelude::*;

    fn any_fleet() -> impl Strategy<Value = Vec<Bus>> {
        prop::collection::vec((0u16..1440, 0u16..1440, 0u32..4000, any::<bool>()), 0..25).prop_map(
            |rows| {
                rows.into_iter()
                    .enumerate()
                    .map(|(i, (dep, arr, price, prime))| {
                        let mut b = bus(&i.to_string());
                        b.departure = ClockTime::from_minutes(dep);
                        b.arrival = ClockTime::from_minutes(arr);
                        b.price = Rupees::new(price);
                        b.is_prime = prime;
                        b
                    })
                    .collect()
            },
        )
    }

    proptest! {
        /// Same inputs, same view
        #[test]
        fn run_is_idempotent(
            buses in any_fleet(),
            now in 0u16..1440,
            prime_only in any::<bool>(),
        ) {
            let now = ClockTime::from_minutes(now).unwrap();
            let criteria = FilterCriteria {
                prime_only,
                sort: SortKey::Price,
                ..Default::default()
            };
            let config = PipelineConfig::default();
            let first = run(&buses, &criteria, now, &config);
            prop_assert_eq!(first, run(&buses, &criteria, now, &config));
        }

        /// Summary total matches the number of buses shown
        #[test]
        fn summary_matches_view(buses in any_fleet(), now in 0u16..1440) {
            let now = ClockTime::from_minutes(now).unwrap();
            let view = run(&buses, &FilterCriteria::default(), now, &PipelineConfig::default());
            prop_assert_eq!(view.summary.total, view.len());
            let by_status: usize = BusStatus::ALL.iter().map(|s| view.summary.count(*s)).sum();
            prop_assert_eq!(by_status, view.len());
        }
    }
}
