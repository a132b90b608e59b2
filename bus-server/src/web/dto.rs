//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::domain::Rupees;
use crate::feed::{FeedHealth, Snapshot, SnapshotOrigin};
use crate::pipeline::{
    FilterCriteria, PriceRange, Selection, SortDirection, SortKey, TimetableView,
};

/// Query string of the timetable endpoints.
///
/// Everything is optional and read as text, since the filter form submits
/// empty strings for untouched fields.
#[derive(Debug, Default, Deserialize)]
pub struct TimetableQuery {
    /// Route label, or "all"
    pub route: Option<String>,

    /// Free-text search
    pub q: Option<String>,

    /// Bus type, or "all"
    #[serde(rename = "type")]
    pub bus_type: Option<String>,

    /// Operator, or "all"
    pub operator: Option<String>,

    /// Lowest base fare in rupees
    pub min_price: Option<String>,

    /// Highest base fare in rupees
    pub max_price: Option<String>,

    pub women_only: Option<String>,
    pub prime_only: Option<String>,

    /// Sort key, e.g. "price" or "departureTime"
    pub sort: Option<String>,

    /// "asc" or "desc"
    pub order: Option<String>,
}

impl TimetableQuery {
    /// Build filter criteria, rejecting unusable price bounds.
    pub fn to_criteria(&self) -> Result<FilterCriteria, String> {
        let min = parse_price(self.min_price.as_deref(), "min_price")?;
        let max = parse_price(self.max_price.as_deref(), "max_price")?;
        let price = PriceRange::new(
            min.unwrap_or(PriceRange::ANY.min),
            max.unwrap_or(PriceRange::ANY.max),
        )
        .ok_or_else(|| "min_price must not exceed max_price".to_string())?;

        Ok(FilterCriteria {
            route: Selection::parse(self.route.as_deref()),
            search: self.q.as_deref().unwrap_or("").trim().to_string(),
            bus_type: Selection::parse(self.bus_type.as_deref()),
            operator: Selection::parse(self.operator.as_deref()),
            price,
            women_only: is_checked(self.women_only.as_deref()),
            prime_only: is_checked(self.prime_only.as_deref()),
            sort: self.sort.as_deref().map(SortKey::parse).unwrap_or_default(),
            direction: self
                .order
                .as_deref()
                .map(SortDirection::parse)
                .unwrap_or_default(),
        })
    }
}

fn parse_price(raw: Option<&str>, name: &str) -> Result<Option<Rupees>, String> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse::<u32>()
            .map(|n| Some(Rupees::new(n)))
            .map_err(|_| format!("Invalid {name}: {s}")),
    }
}

/// Checkbox semantics: present and truthy.
fn is_checked(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|s| s.trim().to_ascii_lowercase()).as_deref(),
        Some("true" | "on" | "1" | "yes")
    )
}

/// Timetable response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableResponse<'a> {
    #[serde(flatten)]
    pub view: &'a TimetableView,

    /// Version of the snapshot the view was derived from
    pub snapshot_version: u64,

    pub feed: &'a FeedHealth,

    /// Banner text when the feed is not live
    pub notice: Option<String>,
}

/// Feed status response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedStatusResponse {
    pub health: FeedHealth,
    pub notice: Option<String>,
    pub snapshot: Option<SnapshotInfo>,

    /// Timetable views currently memoized
    pub cached_views: u64,
}

/// Metadata about the current snapshot.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotInfo {
    pub version: u64,

    /// Active buses after normalization
    pub buses: usize,

    /// Documents received, including inactive ones
    pub documents: usize,

    /// RFC 3339 timestamp
    pub received_at: String,

    pub origin: SnapshotOrigin,
}

impl SnapshotInfo {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            version: snapshot.version,
            buses: snapshot.buses.len(),
            documents: snapshot.document_count,
            received_at: snapshot.received_at.to_rfc3339(),
            origin: snapshot.origin,
        }
    }
}

/// Response to a manual refresh request.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub requested: bool,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}
