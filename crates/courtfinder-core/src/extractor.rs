//! Turns one venue's booking page into `SlotRecord`s.
//!
//! The page lists every free slot as an `<input name="timeslots[]">` whose
//! `value` is a `;`-separated record. School halls use records that start
//! with the court label (`Court 1;…;…;09:00:00;…`). OnePA venues reuse the
//! same field name with an unrelated layout, so only `Court` records count.

use std::collections::HashMap;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::debug;

use crate::error::SearchError;
use crate::models::{SlotRecord, VenueId};
use crate::utils::to_am_pm;

/// Element holding the venue's display name
const VENUE_NAME_SELECTOR: &str = ".item-desc-subtitle";

/// Inputs carrying one timeslot each
const TIMESLOT_SELECTOR: &str = r#"[name="timeslots[]"]"#;

/// Prefix of the entries we can book
const COURT_PREFIX: &str = "Court";

const FIELD_SEPARATOR: char = ';';
const COURT_FIELD: usize = 0;
const TIME_FIELD: usize = 3;
const MIN_FIELDS: usize = 4;

static VENUE_NAME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(VENUE_NAME_SELECTOR).expect("valid venue name selector"));

static TIMESLOTS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(TIMESLOT_SELECTOR).expect("valid timeslot selector"));

/// Extract one record per court with free slots, in first-seen court order.
///
/// A venue without any `Court` entries yields a single sentinel record, so
/// the result is never empty.
pub fn extract_slots(html: &str, venue_id: &VenueId) -> Result<Vec<SlotRecord>, SearchError> {
    let document = Html::parse_document(html);

    let venue = document
        .select(&VENUE_NAME)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .ok_or_else(|| {
            SearchError::MalformedResponse(format!("venue {} has no venue name element", venue_id))
        })?;

    // Court label -> index into `courts`, so groups keep first-seen order
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut courts: Vec<(String, Vec<String>)> = Vec::new();

    let values = document
        .select(&TIMESLOTS)
        .map(|el| el.value().attr("value").unwrap_or_default())
        .filter(|value| value.starts_with(COURT_PREFIX));

    for value in values {
        let fields: Vec<&str> = value.split(FIELD_SEPARATOR).collect();
        if fields.len() < MIN_FIELDS {
            return Err(SearchError::MalformedResponse(format!(
                "venue {} timeslot '{}' has {} fields, expected at least {}",
                venue_id,
                value,
                fields.len(),
                MIN_FIELDS
            )));
        }

        let court = fields[COURT_FIELD];
        let label = to_am_pm(fields[TIME_FIELD]).ok_or_else(|| {
            SearchError::MalformedResponse(format!(
                "venue {} timeslot '{}' has invalid time '{}'",
                venue_id, value, fields[TIME_FIELD]
            ))
        })?;

        match index.get(court) {
            Some(&i) => courts[i].1.push(label),
            None => {
                index.insert(court.to_string(), courts.len());
                courts.push((court.to_string(), vec![label]));
            }
        }
    }

    if courts.is_empty() {
        debug!(venue_id = %venue_id, venue = %venue, "No court timeslots");
        return Ok(vec![SlotRecord::sentinel(venue)]);
    }

    debug!(venue_id = %venue_id, venue = %venue, courts = courts.len(), "Extracted court timeslots");
    Ok(courts
        .into_iter()
        .map(|(court, labels)| SlotRecord::new(venue.clone(), court, &labels))
        .collect())
}
