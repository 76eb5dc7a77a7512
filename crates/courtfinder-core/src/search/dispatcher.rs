//! Fan-out of one backend query per venue.
//!
//! Every venue gets its own spawned task, all started at once. A supervisor
//! task forwards each venue's outcome to the session as soon as that venue
//! finishes, in completion order. A task that panics is reported as a failed
//! venue, so every venue reports exactly once.

use std::sync::Arc;

use chrono::FixedOffset;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::api::{VenueBackend, VenueQuery};
use crate::error::SearchError;
use crate::extractor::extract_slots;
use crate::models::{SearchCriteria, SlotRecord, VenueId};

/// What happened to one venue.
#[derive(Debug)]
pub enum VenueOutcome {
    Slots(Vec<SlotRecord>),
    Failed(SearchError),
    Cancelled,
}

/// One venue's outcome, tagged with the search it belongs to.
#[derive(Debug)]
pub struct VenueReport {
    pub generation: u64,
    pub venue: VenueId,
    pub outcome: VenueOutcome,
}

/// Everything a search run needs, captured at submit time.
pub struct Dispatch {
    pub backend: Arc<dyn VenueBackend>,
    pub criteria: SearchCriteria,
    pub venues: Vec<VenueId>,
    pub utc_offset: FixedOffset,
    pub generation: u64,
}

impl Dispatch {
    /// Start all venue queries and return the supervisor's handle.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(
        self,
        tx: mpsc::Sender<VenueReport>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let time = self.criteria.query_timestamp(self.utc_offset);
        let generation = self.generation;
        info!(
            generation,
            venues = self.venues.len(),
            date = %self.criteria.date,
            time,
            "Dispatching venue queries"
        );

        let mut running: FuturesUnordered<_> = self
            .venues
            .into_iter()
            .map(|venue| {
                let query = VenueQuery {
                    venue: venue.clone(),
                    time,
                    cookie: self.criteria.credential.clone(),
                };
                let backend = Arc::clone(&self.backend);
                let cancel = cancel.clone();
                let handle = tokio::spawn(async move {
                    tokio::select! {
                        _ = cancel.cancelled() => VenueOutcome::Cancelled,
                        outcome = query_venue(backend.as_ref(), &query) => outcome,
                    }
                });
                async move { (venue, handle.await) }
            })
            .collect();

        tokio::spawn(async move {
            while let Some((venue, joined)) = running.next().await {
                let outcome = joined.unwrap_or_else(|e| {
                    error!(venue = %venue, error = %e, "Venue task died");
                    VenueOutcome::Failed(SearchError::TaskFailed(e.to_string()))
                });
                let report = VenueReport { generation, venue, outcome };
                if let Err(e) = tx.send(report).await {
                    error!(error = %e, "Failed to send venue report - channel closed");
                    return;
                }
            }
            debug!(generation, "All venue queries finished");
        })
    }
}

/// Fetch and extract one venue.
async fn query_venue(backend: &dyn VenueBackend, query: &VenueQuery) -> VenueOutcome {
    let html = match backend.fetch_venue(query).await {
        Ok(html) => html,
        Err(e) => return VenueOutcome::Failed(e.into()),
    };
    match extract_slots(&html, &query.venue) {
        Ok(records) => VenueOutcome::Slots(records),
        Err(e) => VenueOutcome::Failed(e),
    }
}
