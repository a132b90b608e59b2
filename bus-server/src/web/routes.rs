//! HTTP route handlers.

use std::convert::Infallible;
use std::path::Path;
use std::sync::Arc;

use askama::Template;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{
        Html, IntoResponse, Redirect, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::{Stream, stream};
use tokio::sync::watch;
use tower_http::services::ServeDir;

use crate::domain::ClockTime;
use crate::feed::{FeedHealth, Snapshot};
use crate::pipeline::{FilterCriteria, FilterOptions, TimetableView};

use super::dto::*;
use super::state::AppState;
use super::templates::*;

/// Create the application router.
///
/// `static_dir` is the path to the static assets directory.
pub fn create_router(state: AppState, static_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/health", get(health))
        .route("/buses", get(list_buses))
        .route("/buses/stream", get(stream_buses))
        .route("/filters", get(filter_options))
        .route("/feed/status", get(feed_status))
        .route("/feed/refresh", post(refresh_feed))
        .nest_service("/static", ServeDir::new(static_dir.as_ref()))
        .fallback(not_found)
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

async fn not_found() -> AppError {
    AppError::NotFound {
        message: "No such page".to_string(),
    }
}

/// Check if request accepts HTML.
fn accepts_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

fn parse_criteria(query: &TimetableQuery) -> Result<FilterCriteria, AppError> {
    query
        .to_criteria()
        .map_err(|message| AppError::BadRequest { message })
}

/// The current snapshot, or 503 if none was ever loaded.
fn current_snapshot(state: &AppState) -> Result<Arc<Snapshot>, AppError> {
    state.slot.latest().ok_or_else(|| AppError::Unavailable {
        message: state
            .slot
            .health()
            .notice()
            .unwrap_or_else(|| "Bus data is still loading".to_string()),
    })
}

/// Timetable page with filter form.
async fn index_page(
    State(state): State<AppState>,
    Query(query): Query<TimetableQuery>,
) -> Result<Response, AppError> {
    let criteria = parse_criteria(&query)?;

    let Some(snapshot) = state.slot.latest() else {
        let page = ErrorTemplate {
            title: "Bus data unavailable".to_string(),
            message: "We could not load today's buses yet. Please try again shortly.".to_string(),
            details: state.slot.health().notice(),
            retry: true,
        };
        return Ok((StatusCode::SERVICE_UNAVAILABLE, Html(page.render()?)).into_response());
    };

    let view = state.cache.view(&snapshot, &criteria, state.feed.now()).await;
    let list_html =
        BusListTemplate::from_view(&view, &criteria, state.slot.health().notice()).render()?;

    let page = IndexTemplate {
        form: FilterFormView::new(&FilterOptions::from_buses(&snapshot.buses), &criteria),
        list_html,
    };
    Ok(Html(page.render()?).into_response())
}

/// Filtered, sorted timetable.
async fn list_buses(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TimetableQuery>,
) -> Result<Response, AppError> {
    let criteria = parse_criteria(&query)?;
    let snapshot = current_snapshot(&state)?;
    let view = state.cache.view(&snapshot, &criteria, state.feed.now()).await;
    let health = state.slot.health();

    // Return HTML or JSON based on Accept header
    if accepts_html(&headers) {
        let html = BusListTemplate::from_view(&view, &criteria, health.notice()).render()?;
        Ok(Html(html).into_response())
    } else {
        Ok(Json(TimetableResponse {
            view: view.as_ref(),
            snapshot_version: snapshot.version,
            notice: health.notice(),
            feed: &health,
        })
        .into_response())
    }
}

struct LiveView {
    state: AppState,
    criteria: FilterCriteria,
    snapshots: watch::Receiver<Option<Arc<Snapshot>>>,
    health: watch::Receiver<FeedHealth>,
    clock: watch::Receiver<ClockTime>,
    first: bool,
}

/// Server-sent events: the timetable view, re-sent whenever the snapshot,
/// the feed health or the clock minute changes.
///
/// The stream ends when the client disconnects or the feed shuts down.
async fn stream_buses(
    State(state): State<AppState>,
    Query(query): Query<TimetableQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let criteria = parse_criteria(&query)?;

    let live = LiveView {
        snapshots: state.slot.subscribe(),
        health: state.slot.subscribe_health(),
        clock: state.feed.clock(),
        state,
        criteria,
        first: true,
    };

    let events = stream::unfold(live, |mut live| async move {
        if !live.first {
            let open = tokio::select! {
                r = live.snapshots.changed() => r.is_ok(),
                r = live.health.changed() => r.is_ok(),
                r = live.clock.changed() => r.is_ok(),
            };
            if !open {
                tracing::debug!("feed closed, ending timetable stream");
                return None;
            }
        }
        live.first = false;

        let snapshot = live.snapshots.borrow_and_update().clone();
        let health = live.health.borrow_and_update().clone();
        let now = *live.clock.borrow_and_update();

        let event = match snapshot {
            Some(snapshot) => {
                let view = live.state.cache.view(&snapshot, &live.criteria, now).await;
                timetable_event(&view, &snapshot, &health)
            }
            None => Event::default()
                .event("waiting")
                .data(health.notice().unwrap_or_else(|| "loading".to_string())),
        };

        Some((Ok(event), live))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn timetable_event(view: &TimetableView, snapshot: &Snapshot, health: &FeedHealth) -> Event {
    let body = TimetableResponse {
        view,
        snapshot_version: snapshot.version,
        notice: health.notice(),
        feed: health,
    };
    Event::default()
        .event("timetable")
        .json_data(&body)
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to encode timetable event");
            Event::default().comment("encoding error")
        })
}

/// Distinct routes, operators and bus types for the filter form.
async fn filter_options(State(state): State<AppState>) -> Result<Json<FilterOptions>, AppError> {
    let snapshot = current_snapshot(&state)?;
    Ok(Json(FilterOptions::from_buses(&snapshot.buses)))
}

/// Feed health and snapshot metadata.
async fn feed_status(State(state): State<AppState>) -> Json<FeedStatusResponse> {
    let health = state.slot.health();
    Json(FeedStatusResponse {
        notice: health.notice(),
        health,
        snapshot: state
            .slot
            .latest()
            .map(|s| SnapshotInfo::from_snapshot(&s)),
        cached_views: state.cache.entry_count(),
    })
}

/// Ask the feed to re-fetch now. Browsers are sent back to the timetable.
async fn refresh_feed(State(state): State<AppState>, headers: HeaderMap) -> Response {
    state.feed.request_refresh();

    if accepts_html(&headers) {
        Redirect::to("/").into_response()
    } else {
        (StatusCode::ACCEPTED, Json(RefreshResponse { requested: true })).into_response()
    }
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    /// No snapshot has been loaded yet.
    Unavailable { message: String },
    Internal { message: String },
}

impl From<askama::Error> for AppError {
    fn from(e: askama::Error) -> Self {
        AppError::Internal {
            message: format!("Template error: {}", e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Unavailable { message } => (StatusCode::SERVICE_UNAVAILABLE, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            tracing::error!(%status, %message, "request failed");
        } else {
            tracing::debug!(%status, %message, "request rejected");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
