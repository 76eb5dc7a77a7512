//! Data models for court searches.
//!
//! - `SlotRecord`, `ResultSet`: normalized availability, one row per court
//! - `SearchCriteria`, `VenueId`: what a search asks the backend for
//! - `Progress`, `VenueStatus`: how far a running search has got

pub mod search;
pub mod slot;

pub use search::{Progress, SearchCriteria, VenueId, VenueStatus};
pub use slot::{ResultSet, SlotRecord, SENTINEL};
