use thiserror::Error;

/// Failure talking to the slot lookup backend for one venue.
///
/// The backend relays ActiveSG, so auth failures usually mean the forwarded
/// cookie went stale rather than anything wrong with our request.
#[derive(Error, Debug)]
pub enum ApiError {
    /// 401: ActiveSG no longer accepts the session cookie
    #[error("Backend rejected the ActiveSG cookie - log in again and copy a fresh one")]
    CookieRejected,

    /// 403: the venue page is not viewable with this account
    #[error("Venue page forbidden: {0}")]
    Forbidden(String),

    /// 404: wrong endpoint, or a venue id the backend does not know
    #[error("Backend returned not found (check endpoint and venue id): {0}")]
    NotFound(String),

    /// 429 after every retry was spent
    #[error("Backend kept rate limiting the lookup, giving up")]
    RateLimited,

    /// 5xx, typically the backend failing to reach ActiveSG
    #[error("Backend failed ({status}): {body}")]
    Backend { status: u16, body: String },

    #[error("Could not reach backend: {0}")]
    Network(#[from] reqwest::Error),

    /// Any other non-success status
    #[error("Unexpected backend status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
}

/// Longest slice of a venue page kept in an error message
const MAX_ERROR_BODY_BYTES: usize = 500;

impl ApiError {
    /// Map a non-success backend status to an error, keeping a bounded
    /// excerpt of the body (often a whole HTML error page).
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let code = status.as_u16();
        let excerpt = excerpt(body);
        match code {
            401 => ApiError::CookieRejected,
            403 => ApiError::Forbidden(excerpt),
            404 => ApiError::NotFound(excerpt),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::Backend { status: code, body: excerpt },
            _ => ApiError::UnexpectedStatus { status: code, body: excerpt },
        }
    }
}

fn excerpt(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_BYTES {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_BYTES;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... ({} bytes)", &body[..end], body.len())
}
