//! Embedded web dashboard
//!
//! Serves a single page at `/` with its assets under `/assets/`. The page
//! drives the JSON API and follows stress runs live over `/ws`, polling
//! `/api/stress/status` when the socket is unavailable.

pub mod handler;
pub mod websocket;

pub use handler::{assets_handler, dashboard_handler};
pub use websocket::websocket_handler;
