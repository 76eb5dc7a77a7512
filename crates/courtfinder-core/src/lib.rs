//! Core library for courtfinder.
//!
//! Searches ActiveSG venues for free badminton courts on a given date. Each
//! venue is queried through the lookup backend, its booking page is reduced to
//! one row per court, and rows from all venues are merged as they arrive.

pub mod api;
pub mod config;
pub mod error;
pub mod extractor;
pub mod models;
pub mod search;
pub mod utils;

pub use api::{ApiError, BackendClient, VenueBackend, VenueQuery};
pub use config::Config;
pub use error::SearchError;
pub use extractor::extract_slots;
pub use models::{Progress, ResultSet, SearchCriteria, SlotRecord, VenueId, VenueStatus};
pub use search::SearchSession;
