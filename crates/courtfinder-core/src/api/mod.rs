//! Client module for the slot lookup backend.
//!
//! This module provides the `BackendClient` for posting venue queries and
//! reading back venue HTML, and the `VenueBackend` trait the search
//! dispatcher is written against.
//!
//! The backend authenticates upstream with the caller's ActiveSG cookie,
//! which is passed through in the request body.

pub mod client;
pub mod error;

pub use client::{BackendClient, VenueBackend, VenueQuery};
pub use error::ApiError;
