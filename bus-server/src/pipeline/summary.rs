//! Summary counts over a timetable view.

use serde::Serialize;

use crate::domain::{Bus, BusStatus};

/// Counts shown above the timetable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: usize,
    pub on_time: usize,
    pub running: usize,
    pub delayed: usize,
    pub boarding: usize,
    pub cancelled: usize,
    pub prime: usize,
    pub women_only: usize,
}

impl Summary {
    /// Count one bus with its derived status.
    pub fn add(&mut self, bus: &Bus, status: BusStatus) {
        self.total += 1;
        match status {
            BusStatus::OnTime => self.on_time += 1,
            BusStatus::Running => self.running += 1,
            BusStatus::Delayed => self.delayed += 1,
            BusStatus::Boarding => self.boarding += 1,
            BusStatus::Cancelled => self.cancelled += 1,
        }
        if bus.is_prime {
            self.prime += 1;
        }
        if bus.women_only {
            self.women_only += 1;
        }
    }

    /// Count for one status.
    pub fn count(&self, status: BusStatus) -> usize {
        match status {
            BusStatus::OnTime => self.on_time,
            BusStatus::Running => self.running,
            BusStatus::Delayed => self.delayed,
            BusStatus::Boarding => self.boarding,
            BusStatus::Cancelled => self.cancelled,
        }
    }
}

/// Summarize `(bus, status)` pairs in a single pass.
pub fn summarize<'a>(entries: impl IntoIterator<Item = (&'a Bus, BusStatus)>) -> Summary {
    entries
        .into_iter()
        .fold(Summary::default(), |mut summary, (bus, status)| {
            summary.add(bus, status);
            summary
        })
}
