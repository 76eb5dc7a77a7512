use thiserror::Error;

use crate::api::ApiError;

/// Errors surfaced by a court search.
///
/// `MissingCriteria`, `InvalidDate`, `SearchInProgress` and `NoVenues` stop a
/// search from starting. The remaining variants only ever describe a single
/// venue; the rest of the search carries on.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("{}", missing_message(.date, .credential))]
    MissingCriteria { date: bool, credential: bool },

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("A search is already in progress")]
    SearchInProgress,

    #[error("No venues configured")]
    NoVenues,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Request failed: {0}")]
    RequestFailure(#[from] ApiError),

    #[error("Venue task failed: {0}")]
    TaskFailed(String),
}

fn missing_message(date: &bool, credential: &bool) -> &'static str {
    match (*date, *credential) {
        (true, true) => "Please enter date and provide cookie",
        (true, false) => "Please enter date",
        (false, true) => "Please provide cookie",
        (false, false) => "Missing search criteria",
    }
}
