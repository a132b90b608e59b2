//! Web layer for the bus timetable.
//!
//! Serves the timetable page, a JSON/HTML fragment API, a server-sent
//! events stream of live views, and feed status and refresh endpoints.

mod dto;
mod routes;
mod state;
pub mod templates;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
pub use templates::*;
