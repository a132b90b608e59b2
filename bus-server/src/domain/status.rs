//! Operational status of a bus service.

use std::fmt;

use serde::Serialize;

/// Live status shown on the timetable.
///
/// `Cancelled` and `Delayed` only ever come from the operator (see
/// [`ReportedStatus`]); the other three are derived from the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BusStatus {
    OnTime,
    Boarding,
    Running,
    Delayed,
    Cancelled,
}

impl BusStatus {
    /// All statuses, in display order.
    pub const ALL: [BusStatus; 5] = [
        BusStatus::OnTime,
        BusStatus::Boarding,
        BusStatus::Running,
        BusStatus::Delayed,
        BusStatus::Cancelled,
    ];

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            BusStatus::OnTime => "On Time",
            BusStatus::Boarding => "Boarding",
            BusStatus::Running => "Running",
            BusStatus::Delayed => "Delayed",
            BusStatus::Cancelled => "Cancelled",
        }
    }

    /// Stable lowercase identifier, used as a CSS class in templates.
    pub fn css_class(&self) -> &'static str {
        match self {
            BusStatus::OnTime => "on-time",
            BusStatus::Boarding => "boarding",
            BusStatus::Running => "running",
            BusStatus::Delayed => "delayed",
            BusStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BusStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Status reported by the operator on the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ReportedStatus {
    /// Nothing reported; status is derived from the clock.
    #[default]
    None,
    /// Running late. `minutes` is absent when only a textual flag was given.
    Delayed { minutes: Option<u32> },
    /// Service will not run.
    Cancelled,
}

impl ReportedStatus {
    /// The status this report forces, if any.
    pub fn forced_status(&self) -> Option<BusStatus> {
        match self {
            ReportedStatus::None => None,
            ReportedStatus::Delayed { .. } => Some(BusStatus::Delayed),
            ReportedStatus::Cancelled => Some(BusStatus::Cancelled),
        }
    }

    /// Reported delay in minutes, if known.
    pub fn delay_minutes(&self) -> Option<u32> {
        match self {
            ReportedStatus::Delayed { minutes } => *minutes,
            _ => None,
        }
    }
}
