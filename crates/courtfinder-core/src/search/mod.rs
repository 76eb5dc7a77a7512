//! Multi-venue search.
//!
//! - `dispatcher`: one cancellable task per venue, reports in completion order
//! - `aggregator`: merges reports into a sorted result set with progress
//! - `session`: the submit / cancel / wait state machine around both

pub mod aggregator;
pub mod dispatcher;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregator::Aggregator;
pub use dispatcher::{Dispatch, VenueOutcome, VenueReport};
pub use session::SearchSession;
