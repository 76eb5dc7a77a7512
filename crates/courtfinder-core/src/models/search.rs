use std::fmt;

use chrono::{FixedOffset, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// Date format accepted from the input surface (HTML date input style)
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Opaque venue identifier, sent back to the backend exactly as configured.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VenueId {
    Number(i64),
    Text(String),
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VenueId::Number(n) => write!(f, "{}", n),
            VenueId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for VenueId {
    fn from(n: i64) -> Self {
        VenueId::Number(n)
    }
}

impl From<&str> for VenueId {
    fn from(s: &str) -> Self {
        // Numeric ids go out as JSON numbers, like the static venue list.
        // "007" or "+5" would not survive that, so they stay text.
        match s.parse::<i64>() {
            Ok(n) if n.to_string() == s => VenueId::Number(n),
            _ => VenueId::Text(s.to_string()),
        }
    }
}

/// What the user asked for. Snapshotted when a search is submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    pub date: NaiveDate,
    pub credential: String,
}

impl SearchCriteria {
    /// Validate raw form input.
    ///
    /// Both fields are required; when either is empty the error names exactly
    /// the missing ones so each can be flagged next to its input.
    pub fn new(date: &str, credential: &str) -> Result<Self, SearchError> {
        let date = date.trim();
        let missing_date = date.is_empty();
        let missing_credential = credential.is_empty();
        if missing_date || missing_credential {
            return Err(SearchError::MissingCriteria {
                date: missing_date,
                credential: missing_credential,
            });
        }

        let date = NaiveDate::parse_from_str(date, DATE_FORMAT)
            .map_err(|_| SearchError::InvalidDate(date.to_string()))?;

        Ok(Self {
            date,
            credential: credential.to_string(),
        })
    }

    /// Unix seconds of midnight on the search date in the backend's timezone.
    pub fn query_timestamp(&self, offset: FixedOffset) -> i64 {
        let utc_midnight = self.date.and_time(NaiveTime::MIN).and_utc().timestamp();
        utc_midnight - i64::from(offset.local_minus_utc())
    }
}

/// Venues finished out of venues queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self { done: 0, total }
    }

    pub fn is_complete(&self) -> bool {
        self.done >= self.total
    }

    /// Text for the search trigger: "Search" when idle,
    /// "Searching... (done/total)" while venues are outstanding.
    pub fn label(&self) -> String {
        if self.is_complete() {
            "Search".to_string()
        } else {
            format!("Searching... ({}/{})", self.done, self.total)
        }
    }
}

/// Outcome of one venue within a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum VenueStatus {
    Pending,
    /// Number of records the venue contributed
    Succeeded(usize),
    Failed(String),
    Cancelled,
}

impl VenueStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, VenueStatus::Pending)
    }
}
