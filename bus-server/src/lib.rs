//! Bus timetable server.
//!
//! A web application that answers: "which buses are running today, which
//! are about to board, and which still have seats at my price?"
//!
//! Bus documents are read from a document store (or a local JSON file),
//! normalized once per snapshot, and turned into a filtered, sorted view
//! with live statuses on every request and every clock minute.

pub mod cache;
pub mod config;
pub mod domain;
pub mod feed;
pub mod pipeline;
pub mod store;
pub mod web;
