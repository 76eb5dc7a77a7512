//! In-memory backend for dispatcher and session tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::api::{ApiError, VenueBackend, VenueQuery};
use crate::models::VenueId;

enum Reply {
    Page(String),
    Error,
    Panic,
}

#[derive(Default)]
pub struct FakeBackend {
    replies: HashMap<VenueId, Reply>,
    delays_ms: HashMap<VenueId, u64>,
    sent: Arc<Mutex<Vec<VenueQuery>>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, venue: i64, html: String) -> Self {
        self.replies.insert(VenueId::Number(venue), Reply::Page(html));
        self
    }

    pub fn with_error(mut self, venue: i64) -> Self {
        self.replies.insert(VenueId::Number(venue), Reply::Error);
        self
    }

    pub fn with_panic(mut self, venue: i64) -> Self {
        self.replies.insert(VenueId::Number(venue), Reply::Panic);
        self
    }

    pub fn with_delay(mut self, venue: i64, ms: u64) -> Self {
        self.delays_ms.insert(VenueId::Number(venue), ms);
        self
    }

    /// Queries received so far, shared with the backend after it is boxed
    pub fn sent_queries(&self) -> Arc<Mutex<Vec<VenueQuery>>> {
        Arc::clone(&self.sent)
    }
}

#[async_trait]
impl VenueBackend for FakeBackend {
    async fn fetch_venue(&self, query: &VenueQuery) -> Result<String, ApiError> {
        self.sent.lock().unwrap().push(query.clone());

        if let Some(&ms) = self.delays_ms.get(&query.venue) {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }

        match self.replies.get(&query.venue) {
            Some(Reply::Page(html)) => Ok(html.clone()),
            Some(Reply::Error) => Err(ApiError::Backend {
                status: 503,
                body: "upstream unavailable".to_string(),
            }),
            Some(Reply::Panic) => panic!("fake backend asked to panic"),
            None => Err(ApiError::NotFound(query.venue.to_string())),
        }
    }
}

/// A venue page with the given name and timeslot values.
pub fn court_page(venue: &str, values: &[&str]) -> String {
    let inputs: String = values
        .iter()
        .map(|v| format!(r#"<input type="checkbox" name="timeslots[]" value="{}">"#, v))
        .collect();
    format!(
        r#"<div class="item-desc"><h4 class="item-desc-subtitle">{}</h4></div><form>{}</form>"#,
        venue, inputs
    )
}
