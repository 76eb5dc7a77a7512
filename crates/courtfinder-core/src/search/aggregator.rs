use tracing::{debug, warn};

use crate::models::{Progress, ResultSet, VenueId, VenueStatus};

use super::dispatcher::{VenueOutcome, VenueReport};

/// Merged state of one search: records so far, progress, and per-venue status.
#[derive(Debug, Default)]
pub struct Aggregator {
    results: ResultSet,
    progress: Progress,
    statuses: Vec<(VenueId, VenueStatus)>,
}

impl Aggregator {
    /// Fresh state for a search over `venues`, all pending.
    pub fn new(venues: &[VenueId]) -> Self {
        Self {
            results: ResultSet::new(),
            progress: Progress::new(venues.len()),
            statuses: venues
                .iter()
                .map(|v| (v.clone(), VenueStatus::Pending))
                .collect(),
        }
    }

    /// Apply one venue's report.
    ///
    /// Every accepted report advances progress by one, whatever its outcome.
    /// Reports for unknown or already-finished venues are ignored and
    /// return false.
    pub fn apply(&mut self, report: VenueReport) -> bool {
        let Some((_, status)) = self
            .statuses
            .iter_mut()
            .find(|(venue, status)| *venue == report.venue && !status.is_finished())
        else {
            debug!(venue = %report.venue, "Ignoring report for finished or unknown venue");
            return false;
        };

        *status = match report.outcome {
            VenueOutcome::Slots(records) => {
                let count = records.len();
                self.results.merge(records);
                VenueStatus::Succeeded(count)
            }
            VenueOutcome::Failed(e) => {
                warn!(venue = %report.venue, error = %e, "Venue lookup failed");
                VenueStatus::Failed(e.to_string())
            }
            VenueOutcome::Cancelled => VenueStatus::Cancelled,
        };
        self.progress.done += 1;
        true
    }

    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn statuses(&self) -> &[(VenueId, VenueStatus)] {
        &self.statuses
    }

    /// Venues whose lookup failed, with the reason
    pub fn failures(&self) -> impl Iterator<Item = (&VenueId, &str)> {
        self.statuses.iter().filter_map(|(venue, status)| match status {
            VenueStatus::Failed(reason) => Some((venue, reason.as_str())),
            _ => None,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.progress.is_complete()
    }
}
