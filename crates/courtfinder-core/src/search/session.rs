//! Search session state.
//!
//! `SearchSession` owns the merged results and progress of the current
//! search and is the only thing that mutates them. Venue tasks never touch
//! this state directly: they send `VenueReport`s over an MPSC channel and the
//! session applies them one at a time in `poll` or `wait`.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use chrono::FixedOffset;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::api::{BackendClient, VenueBackend};
use crate::config::Config;
use crate::error::SearchError;
use crate::models::{Progress, ResultSet, SearchCriteria, VenueId, VenueStatus};

use super::aggregator::Aggregator;
use super::dispatcher::{Dispatch, VenueReport};

/// Buffer size for the venue report channel.
/// Reports are tiny and drained often; 64 covers the whole ActiveSG list.
const CHANNEL_BUFFER_SIZE: usize = 64;

pub struct SearchSession {
    backend: Arc<dyn VenueBackend>,
    venues: Vec<VenueId>,
    utc_offset: FixedOffset,

    /// Bumped on every submit; reports from older searches are dropped
    generation: u64,
    criteria: Option<SearchCriteria>,
    aggregator: Aggregator,
    cancel: Option<CancellationToken>,
    supervisor: Option<JoinHandle<()>>,

    report_tx: mpsc::Sender<VenueReport>,
    report_rx: mpsc::Receiver<VenueReport>,
}

impl SearchSession {
    /// Session over `venues`. Repeated ids are queried once, at their first
    /// position.
    pub fn new(
        backend: Arc<dyn VenueBackend>,
        mut venues: Vec<VenueId>,
        utc_offset: FixedOffset,
    ) -> Self {
        let mut seen = HashSet::new();
        venues.retain(|venue| seen.insert(venue.clone()));

        let (report_tx, report_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        Self {
            backend,
            venues,
            utc_offset,
            generation: 0,
            criteria: None,
            aggregator: Aggregator::default(),
            cancel: None,
            supervisor: None,
            report_tx,
            report_rx,
        }
    }

    /// Session over the configured venues, talking to the real backend
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = BackendClient::from_config(config)?;
        Ok(Self::new(
            Arc::new(backend),
            config.venues.clone(),
            config.utc_offset()?,
        ))
    }

    /// Whether a new search may start (no venue still outstanding)
    pub fn can_submit(&self) -> bool {
        self.aggregator.is_complete()
    }

    pub fn is_searching(&self) -> bool {
        !self.can_submit()
    }

    /// Start a search for `date` (YYYY-MM-DD) with `credential`.
    ///
    /// Rejected with `SearchInProgress` while the previous search still has
    /// venues outstanding. On success results are cleared and progress reset
    /// before any venue is queried. Must be called within a Tokio runtime.
    pub fn submit(&mut self, date: &str, credential: &str) -> Result<(), SearchError> {
        let criteria = SearchCriteria::new(date, credential)?;
        if self.is_searching() {
            return Err(SearchError::SearchInProgress);
        }
        self.start(criteria)
    }

    /// Cancel whatever is running and start a new search right away.
    pub fn restart(&mut self, date: &str, credential: &str) -> Result<(), SearchError> {
        let criteria = SearchCriteria::new(date, credential)?;
        self.cancel();
        self.start(criteria)
    }

    fn start(&mut self, criteria: SearchCriteria) -> Result<(), SearchError> {
        if self.venues.is_empty() {
            return Err(SearchError::NoVenues);
        }

        self.generation += 1;
        self.aggregator = Aggregator::new(&self.venues);
        self.criteria = Some(criteria.clone());

        let cancel = CancellationToken::new();
        let dispatch = Dispatch {
            backend: Arc::clone(&self.backend),
            criteria,
            venues: self.venues.clone(),
            utc_offset: self.utc_offset,
            generation: self.generation,
        };
        self.supervisor = Some(dispatch.spawn(self.report_tx.clone(), cancel.clone()));
        self.cancel = Some(cancel);

        info!(generation = self.generation, venues = self.venues.len(), "Search started");
        Ok(())
    }

    /// Cancel in-flight venue queries.
    ///
    /// Cancelled venues still report, so progress reaches the total once the
    /// outstanding reports are drained.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            if self.is_searching() {
                info!(generation = self.generation, "Cancelling search");
            }
            cancel.cancel();
        }
    }

    /// Apply every report that has already arrived without waiting.
    /// Returns how many were applied to the current search.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(report) = self.report_rx.try_recv() {
            if self.apply(report) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait for the next report belonging to the current search and apply it.
    /// Returns false when nothing is outstanding.
    pub async fn next_update(&mut self) -> bool {
        while self.is_searching() {
            match self.report_rx.recv().await {
                Some(report) => {
                    if self.apply(report) {
                        return true;
                    }
                }
                None => return false,
            }
        }
        false
    }

    /// Wait until every venue of the current search has reported.
    pub async fn wait(&mut self) {
        while self.next_update().await {}
        if let Some(handle) = self.supervisor.take() {
            if let Err(e) = handle.await {
                debug!(error = %e, "Search supervisor ended abnormally");
            }
        }
        self.log_finished();
    }

    fn apply(&mut self, report: VenueReport) -> bool {
        if report.generation != self.generation {
            debug!(
                venue = %report.venue,
                generation = report.generation,
                current = self.generation,
                "Dropping report from an earlier search"
            );
            return false;
        }
        let applied = self.aggregator.apply(report);
        if applied && self.aggregator.is_complete() {
            self.cancel = None;
        }
        applied
    }

    fn log_finished(&self) {
        let failed = self.aggregator.failures().count();
        info!(
            generation = self.generation,
            records = self.aggregator.results().len(),
            failed,
            "Search finished"
        );
    }

    pub fn results(&self) -> &ResultSet {
        self.aggregator.results()
    }

    pub fn progress(&self) -> Progress {
        self.aggregator.progress()
    }

    pub fn statuses(&self) -> &[(VenueId, VenueStatus)] {
        self.aggregator.statuses()
    }

    /// Venues whose lookup failed in the current search, with the reason
    pub fn failures(&self) -> impl Iterator<Item = (&VenueId, &str)> {
        self.aggregator.failures()
    }

    /// Criteria of the current (or last) search
    pub fn criteria(&self) -> Option<&SearchCriteria> {
        self.criteria.as_ref()
    }

    pub fn venues(&self) -> &[VenueId] {
        &self.venues
    }
}

impl Drop for SearchSession {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SlotRecord;
    use crate::search::testing::{court_page, FakeBackend};

    fn sgt() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    fn session(backend: FakeBackend, ids: &[i64]) -> SearchSession {
        let venues = ids.iter().copied().map(VenueId::Number).collect();
        SearchSession::new(Arc::new(backend), venues, sgt())
    }

    #[tokio::test]
    async fn test_full_scenario_two_venues() {
        let backend = FakeBackend::new()
            .with_page(1, court_page("Alpha Sports Hall", &["Court1;x;y;14:00:00", "OnePA;1;2;09:00:00"]))
            .with_page(2, court_page("Bravo Secondary", &["slot;1;2;10:00:00"]));
        let sent = backend.sent_queries();
        let mut session = session(backend, &[1, 2]);

        assert!(session.can_submit());
        session.submit("2024-06-01", "tok").unwrap();
        session.wait().await;

        assert_eq!(session.progress(), Progress { done: 2, total: 2 });
        assert!(session.can_submit());
        assert_eq!(
            session.results().records(),
            &[
                SlotRecord {
                    venue: "Alpha Sports Hall".to_string(),
                    court: "Court1".to_string(),
                    slots: "2pm".to_string(),
                },
                SlotRecord::sentinel("Bravo Secondary"),
            ]
        );

        let queries = sent.lock().unwrap();
        assert!(queries.iter().all(|q| q.time == 1_717_171_200 && q.cookie == "tok"));
    }

    #[tokio::test]
    async fn test_missing_date_sets_only_date_indicator() {
        let mut session = session(FakeBackend::new(), &[1]);
        match session.submit("", "tok") {
            Err(SearchError::MissingCriteria { date, credential }) => {
                assert!(date);
                assert!(!credential);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(session.criteria().is_none());
        assert_eq!(session.progress().done, 0);
    }

    #[tokio::test]
    async fn test_submit_while_searching_is_rejected() {
        let backend = FakeBackend::new()
            .with_page(1, court_page("Slow Hall", &[]))
            .with_delay(1, 300);
        let mut session = session(backend, &[1]);

        session.submit("2024-06-01", "tok").unwrap();
        assert!(session.is_searching());
        assert_eq!(session.progress().label(), "Searching... (0/1)");
        assert!(matches!(
            session.submit("2024-06-02", "tok"),
            Err(SearchError::SearchInProgress)
        ));
        // The first search's criteria are untouched
        assert_eq!(session.criteria().unwrap().date.to_string(), "2024-06-01");

        session.wait().await;
        assert_eq!(session.progress().label(), "Search");
        assert!(session.submit("2024-06-02", "tok").is_ok());
        session.wait().await;
    }

    #[tokio::test]
    async fn test_failing_venue_does_not_block_completion() {
        let backend = FakeBackend::new()
            .with_error(1)
            .with_page(2, "<p>no subtitle here</p>".to_string())
            .with_page(3, court_page("Charlie Pri", &["Court 2;;;19:00:00"]));
        let mut session = session(backend, &[1, 2, 3]);

        session.submit("2024-06-01", "tok").unwrap();
        session.wait().await;

        assert!(session.progress().is_complete());
        assert_eq!(session.results().len(), 1);
        assert_eq!(session.results().records()[0].slots, "7pm");

        let failed: Vec<_> = session.failures().map(|(v, _)| v.clone()).collect();
        assert_eq!(failed, vec![VenueId::Number(1), VenueId::Number(2)]);
        assert_eq!(session.statuses()[2].1, VenueStatus::Succeeded(1));
    }

    #[tokio::test]
    async fn test_cancel_completes_with_cancelled_statuses() {
        let backend = FakeBackend::new()
            .with_page(1, court_page("Slow Hall", &[]))
            .with_delay(1, 10_000)
            .with_page(2, court_page("Slow Too", &[]))
            .with_delay(2, 10_000);
        let mut session = session(backend, &[1, 2]);

        session.submit("2024-06-01", "tok").unwrap();
        session.cancel();
        session.wait().await;

        assert!(session.can_submit());
        assert!(session.results().is_empty());
        assert!(session.statuses().iter().all(|(_, s)| *s == VenueStatus::Cancelled));
    }

    #[tokio::test]
    async fn test_restart_discards_earlier_search() {
        let backend = FakeBackend::new()
            .with_page(1, court_page("Alpha Hall", &["Court 1;;;09:00:00"]))
            .with_delay(1, 100);
        let mut session = session(backend, &[1]);

        session.submit("2024-06-01", "first").unwrap();
        session.restart("2024-06-02", "second").unwrap();
        session.wait().await;

        assert_eq!(session.criteria().unwrap().credential, "second");
        assert_eq!(session.progress(), Progress { done: 1, total: 1 });
        assert_eq!(session.results().len(), 1);
        assert_eq!(session.statuses()[0].1, VenueStatus::Succeeded(1));
    }

    #[tokio::test]
    async fn test_poll_applies_arrived_reports() {
        let backend = FakeBackend::new().with_page(1, court_page("Alpha Hall", &[]));
        let mut session = session(backend, &[1]);

        session.submit("2024-06-01", "tok").unwrap();
        while session.is_searching() {
            session.poll();
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(session.results().records()[0], SlotRecord::sentinel("Alpha Hall"));
    }

    #[tokio::test]
    async fn test_repeated_venue_is_queried_once() {
        let backend = FakeBackend::new()
            .with_page(7, court_page("Alpha Hall", &["Court 1;;;09:00:00"]))
            .with_page(8, court_page("Beta Hall", &["Court 2;;;10:00:00"]));
        let sent = backend.sent_queries();
        let mut session = session(backend, &[7, 8, 7]);
        assert_eq!(session.venues(), &[VenueId::Number(7), VenueId::Number(8)]);

        session.submit("2024-06-01", "tok").unwrap();
        session.wait().await;

        assert_eq!(session.progress(), Progress { done: 2, total: 2 });
        let records = session.results().records();
        assert_eq!(records.len(), 2);
        for record in records {
            let same = records
                .iter()
                .filter(|r| r.venue == record.venue && r.court == record.court)
                .count();
            assert_eq!(same, 1, "{} / {} listed {} times", record.venue, record.court, same);
        }
        assert_eq!(sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_no_venues() {
        let mut session = session(FakeBackend::new(), &[]);
        assert!(matches!(session.submit("2024-06-01", "tok"), Err(SearchError::NoVenues)));
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = session(FakeBackend::new(), &[1, 2]);
        assert!(session.can_submit());
        assert_eq!(session.progress().label(), "Search");
        assert!(session.results().is_empty());
    }
}
