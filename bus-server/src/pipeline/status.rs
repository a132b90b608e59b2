//! Live status derivation.
//!
//! Status is recomputed from scratch on every pipeline run; nothing is
//! remembered between runs, so a bus can go from `Running` back to
//! `OnTime` the next day.

use crate::domain::{Bus, BusStatus, ClockTime, ReportedStatus, within_journey};

/// Derive the status of one service at `now`.
///
/// An operator report of cancellation or delay always wins. Otherwise a
/// bus inside its journey window is `Running`, one departing within the
/// next `boarding_window_mins` minutes (same day) is `Boarding`, and
/// anything else is `OnTime`.
///
/// ```
/// use bus_server::domain::{BusStatus, ClockTime, ReportedStatus};
/// use bus_server::pipeline::derive_status;
///
/// let t = |s| ClockTime::parse_hhmm(s).ok();
/// let now = ClockTime::parse_hhmm("13:45").unwrap();
/// let status = derive_status(t("14:00"), t("18:00"), ReportedStatus::None, now, 30);
/// assert_eq!(status, BusStatus::Boarding);
/// ```
pub fn derive_status(
    departure: Option<ClockTime>,
    arrival: Option<ClockTime>,
    reported: ReportedStatus,
    now: ClockTime,
    boarding_window_mins: u16,
) -> BusStatus {
    if let Some(forced) = reported.forced_status() {
        return forced;
    }

    let Some(departure) = departure else {
        return BusStatus::OnTime;
    };

    if let Some(arrival) = arrival
        && within_journey(departure, arrival, now)
    {
        return BusStatus::Running;
    }

    let until_departure = departure.minutes_since(now);
    if until_departure > 0 && until_departure <= boarding_window_mins as i32 {
        return BusStatus::Boarding;
    }

    BusStatus::OnTime
}

/// Derive the status of a normalized bus at `now`.
pub fn status_of(bus: &Bus, now: ClockTime, boarding_window_mins: u16) -> BusStatus {
    derive_status(
        bus.departure,
        bus.arrival,
        bus.reported,
        now,
        boarding_window_mins,
    )
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn clock() -> impl Strategy<Value = ClockTime> {
        (0u16..1440).prop_map(|m| ClockTime::from_minutes(m).unwrap())
    }

    proptest! {
        /// Same inputs always give the same status
        #[test]
        fn deterministic(dep in clock(), arr in clock(), now in clock()) {
            let a = derive_status(Some(dep), Some(arr), ReportedStatus::None, now, 30);
            let b = derive_status(Some(dep), Some(arr), ReportedStatus::None, now, 30);
            prop_assert_eq!(a, b);
        }

        /// Derived status is never Delayed or Cancelled without a report
        #[test]
        fn never_invents_delay(dep in clock(), arr in clock(), now in clock()) {
            let s = derive_status(Some(dep), Some(arr), ReportedStatus::None, now, 30);
            prop_assert!(matches!(s, BusStatus::OnTime | BusStatus::Boarding | BusStatus::Running));
        }

        /// Running exactly when now is within the journey window
        #[test]
        fn running_iff_within(dep in clock(), arr in clock(), now in clock()) {
            let s = derive_status(Some(dep), Some(arr), ReportedStatus::None, now, 30);
            prop_assert_eq!(s == BusStatus::Running, within_journey(dep, arr, now));
        }
    }
}
