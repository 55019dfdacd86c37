//! HTTP API handlers for the collection event ledger

pub mod buildinfo;
pub mod events;
pub mod health;
pub mod info;

pub use buildinfo::get_build_info;
pub use events::{get_event, get_stats, list_events, submit_event};
pub use health::health_routes;
pub use info::{api_info, not_found};
