//! Askama templates for the web frontend.

use askama::Template;

use crate::domain::{BusStatus, is_overnight};
use crate::pipeline::{
    FilterCriteria, FilterOptions, SortDirection, SortKey, Summary, TimetableEntry, TimetableView,
};

// ============================================================================
// Page Templates (extend base.html)
// ============================================================================

/// Timetable page with filter form.
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub form: FilterFormView,
    /// Pre-rendered `BusListTemplate`.
    pub list_html: String,
}

/// Error page.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub title: String,
    pub message: String,
    pub details: Option<String>,
    /// Offer a button that asks the feed to retry.
    pub retry: bool,
}

// ============================================================================
// Fragment Templates (AJAX responses, no base.html)
// ============================================================================

/// Bus list fragment with summary counts.
#[derive(Template)]
#[template(path = "bus_list.html")]
pub struct BusListTemplate {
    pub buses: Vec<BusView>,
    pub summary: SummaryView,
    pub evaluated_at: String,
    pub notice: Option<String>,
    pub filtering: bool,
}

impl BusListTemplate {
    pub fn from_view(
        view: &TimetableView,
        criteria: &FilterCriteria,
        notice: Option<String>,
    ) -> Self {
        Self {
            buses: view.buses.iter().map(BusView::from_entry).collect(),
            summary: SummaryView::from_summary(&view.summary),
            evaluated_at: view.evaluated_at.to_string(),
            notice,
            filtering: criteria.is_filtering(),
        }
    }
}

// ============================================================================
// View Models (for templates)
// ============================================================================

/// One row of the timetable.
#[derive(Debug, Clone)]
pub struct BusView {
    pub id: String,
    pub bus_number: String,
    pub operator: String,
    pub bus_type: String,
    pub route_label: String,
    pub departure: String,
    pub arrival: String,
    pub duration: String,
    pub overnight: bool,
    pub rating: String,
    pub review_count: u32,
    pub available_seats: u32,
    pub total_seats: u32,
    pub occupancy: u32,
    pub price: String,
    /// Discounted price, only when a discount applies.
    pub final_price: Option<String>,
    pub discount_percent: Option<u8>,
    pub features: Vec<String>,
    pub is_prime: bool,
    pub women_only: bool,
    pub status_label: &'static str,
    pub status_class: &'static str,
    pub delay_minutes: Option<u32>,
}

impl BusView {
    pub fn from_entry(entry: &TimetableEntry) -> Self {
        let bus = &entry.bus;
        let time = |t: Option<crate::domain::ClockTime>| {
            t.map(|t| t.to_string()).unwrap_or_else(|| "--:--".to_string())
        };

        let final_price = bus
            .discount_percent
            .filter(|pct| *pct > 0)
            .map(|_| bus.final_price().to_string());

        Self {
            id: bus.id.clone(),
            bus_number: bus.bus_number.clone(),
            operator: bus.operator.clone(),
            bus_type: bus.bus_type.clone(),
            route_label: bus.route_label.clone(),
            departure: time(bus.departure),
            arrival: time(bus.arrival),
            duration: bus.duration.map(|d| d.to_string()).unwrap_or_default(),
            overnight: matches!(
                (bus.departure, bus.arrival),
                (Some(d), Some(a)) if is_overnight(d, a)
            ),
            rating: format!("{:.1}", bus.rating),
            review_count: bus.review_count,
            available_seats: bus.available_seats,
            total_seats: bus.total_seats,
            occupancy: bus.occupancy_percentage.round() as u32,
            price: bus.price.to_string(),
            final_price,
            discount_percent: bus.discount_percent.filter(|pct| *pct > 0),
            features: bus.features.iter().cloned().collect(),
            is_prime: bus.is_prime,
            women_only: bus.women_only,
            status_label: entry.status.label(),
            status_class: entry.status.css_class(),
            delay_minutes: bus.reported.delay_minutes(),
        }
    }

    pub fn is_sold_out(&self) -> bool {
        self.available_seats == 0
    }
}

/// Summary counts with display labels.
#[derive(Debug, Clone)]
pub struct SummaryView {
    pub total: usize,
    pub prime: usize,
    pub women_only: usize,
    pub statuses: Vec<StatusCount>,
}

#[derive(Debug, Clone)]
pub struct StatusCount {
    pub label: &'static str,
    pub class: &'static str,
    pub count: usize,
}

impl SummaryView {
    pub fn from_summary(summary: &Summary) -> Self {
        Self {
            total: summary.total,
            prime: summary.prime,
            women_only: summary.women_only,
            statuses: BusStatus::ALL
                .iter()
                .map(|s| StatusCount {
                    label: s.label(),
                    class: s.css_class(),
                    count: summary.count(*s),
                })
                .collect(),
        }
    }
}

/// A dropdown option.
#[derive(Debug, Clone)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// The filter form, pre-filled with the current criteria.
#[derive(Debug, Clone)]
pub struct FilterFormView {
    pub routes: Vec<SelectOption>,
    pub bus_types: Vec<SelectOption>,
    pub operators: Vec<SelectOption>,
    pub sorts: Vec<SelectOption>,
    pub search: String,
    pub min_price: String,
    pub max_price: String,
    pub price_hint: Option<String>,
    pub women_only: bool,
    pub prime_only: bool,
    pub descending: bool,
}

impl FilterFormView {
    pub fn new(options: &FilterOptions, criteria: &FilterCriteria) -> Self {
        let select = |values: &[String], current: Option<&str>, all_label: &str| {
            std::iter::once(SelectOption {
                value: "all".to_string(),
                label: all_label.to_string(),
                selected: current.is_none(),
            })
            .chain(values.iter().map(|v| SelectOption {
                value: v.clone(),
                label: v.clone(),
                selected: current == Some(v.as_str()),
            }))
            .collect::<Vec<_>>()
        };

        let sorts = [
            (SortKey::BusNumber, "Bus number"),
            (SortKey::DepartureTime, "Departure"),
            (SortKey::Price, "Price"),
            (SortKey::Duration, "Duration"),
            (SortKey::Rating, "Rating"),
            (SortKey::AvailableSeats, "Seats available"),
        ]
        .into_iter()
        .map(|(key, label)| SelectOption {
            value: key.as_param().to_string(),
            label: label.to_string(),
            selected: key == criteria.sort,
        })
        .collect();

        let bound = |r: crate::domain::Rupees, unbounded: crate::domain::Rupees| {
            if r == unbounded {
                String::new()
            } else {
                r.amount().to_string()
            }
        };

        Self {
            routes: select(&options.routes, criteria.route.value(), "All routes"),
            bus_types: select(&options.bus_types, criteria.bus_type.value(), "All types"),
            operators: select(&options.operators, criteria.operator.value(), "All operators"),
            sorts,
            search: criteria.search.clone(),
            min_price: bound(criteria.price.min, crate::pipeline::PriceRange::ANY.min),
            max_price: bound(criteria.price.max, crate::pipeline::PriceRange::ANY.max),
            price_hint: options.price_bounds.map(|(lo, hi)| format!("{lo} to {hi}")),
            women_only: criteria.women_only,
            prime_only: criteria.prime_only,
            descending: criteria.direction == SortDirection::Descending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::bus;
    use crate::domain::{ClockTime, ReportedStatus, Rupees};
    use crate::pipeline::{PipelineConfig, Selection, run};

    fn entry(status: BusStatus) -> TimetableEntry {
        TimetableEntry {
            bus: bus("1"),
            status,
        }
    }

    #[test]
    fn bus_view_formats_fields() {
        let mut e = entry(BusStatus::Delayed);
        e.bus.discount_percent = Some(25);
        e.bus.price = Rupees::new(1600);
        e.bus.reported = ReportedStatus::Delayed { minutes: Some(15) };
        e.bus.departure = None;

        let view = BusView::from_entry(&e);
        assert_eq!(view.price, "₹1,600");
        assert_eq!(view.final_price.as_deref(), Some("₹1,200"));
        assert_eq!(view.departure, "--:--");
        assert_eq!(view.arrival, "15:00");
        assert_eq!(view.status_class, "delayed");
        assert_eq!(view.delay_minutes, Some(15));
        assert_eq!(view.rating, "4.0");
        assert_eq!(view.occupancy, 50);
        assert!(!view.overnight);
    }

    #[test]
    fn zero_discount_shows_single_price() {
        let mut e = entry(BusStatus::OnTime);
        e.bus.discount_percent = Some(0);
        let view = BusView::from_entry(&e);
        assert_eq!(view.final_price, None);
        assert_eq!(view.discount_percent, None);
    }

    #[test]
    fn overnight_flag() {
        let mut e = entry(BusStatus::OnTime);
        e.bus.departure = ClockTime::parse_hhmm("22:00").ok();
        e.bus.arrival = ClockTime::parse_hhmm("06:00").ok();
        assert!(BusView::from_entry(&e).overnight);
    }

    #[test]
    fn form_marks_current_selection() {
        let options = FilterOptions {
            routes: vec!["Delhi - Jaipur".into(), "Pune - Goa".into()],
            operators: vec![],
            bus_types: vec![],
            price_bounds: Some((Rupees::new(400), Rupees::new(2500))),
        };
        let criteria = FilterCriteria {
            route: Selection::Only("Pune - Goa".into()),
            sort: SortKey::Price,
            ..Default::default()
        };

        let form = FilterFormView::new(&options, &criteria);
        let selected: Vec<_> = form.routes.iter().filter(|o| o.selected).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].value, "Pune - Goa");
        assert!(form.operators[0].selected);
        assert!(form.sorts.iter().any(|o| o.selected && o.value == "price"));
        assert_eq!(form.min_price, "");
        assert_eq!(form.price_hint.as_deref(), Some("₹400 to ₹2,500"));
    }

    #[test]
    fn bus_list_renders() {
        let criteria = FilterCriteria::default();
        let view = run(
            &[bus("1")],
            &criteria,
            ClockTime::parse_hhmm("12:00").unwrap(),
            &PipelineConfig::default(),
        );
        let notice = Some("Live updates interrupted".to_string());
        let html = BusListTemplate::from_view(&view, &criteria, notice)
            .render()
            .unwrap();

        assert!(html.contains("BUS-1"));
        assert!(html.contains("Running"));
        assert!(html.contains("Live updates interrupted"));
    }

    #[test]
    fn empty_bus_list_renders_message() {
        let criteria = FilterCriteria {
            search: "nothing matches".into(),
            ..Default::default()
        };
        let view = run(
            &[],
            &criteria,
            ClockTime::parse_hhmm("12:00").unwrap(),
            &PipelineConfig::default(),
        );
        let html = BusListTemplate::from_view(&view, &criteria, None).render().unwrap();
        assert!(html.contains("No buses match"));
    }
}
