use serde::{Deserialize, Serialize};

use crate::utils::contains_ignore_case;

/// Placeholder shown for both court and slots when a venue reports no
/// "Court" entries (no availability, or a venue type we don't parse).
pub const SENTINEL: &str = "-";

/// Separator between time labels of one court
pub const SLOT_SEPARATOR: &str = ", ";

/// Available slots for one court at one venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct SlotRecord {
    pub venue: String,
    pub court: String,
    pub slots: String,
}

impl SlotRecord {
    pub fn new(venue: impl Into<String>, court: impl Into<String>, labels: &[String]) -> Self {
        Self {
            venue: venue.into(),
            court: court.into(),
            slots: labels.join(SLOT_SEPARATOR),
        }
    }

    /// The single record emitted for a venue with no bookable entries.
    pub fn sentinel(venue: impl Into<String>) -> Self {
        Self {
            venue: venue.into(),
            court: SENTINEL.to_string(),
            slots: SENTINEL.to_string(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.court == SENTINEL && self.slots == SENTINEL
    }

    /// Whether the venue, court or slot text contains `query`, ignoring case.
    pub fn matches(&self, query: &str) -> bool {
        contains_ignore_case(&self.venue, query)
            || contains_ignore_case(&self.court, query)
            || contains_ignore_case(&self.slots, query)
    }
}

/// Merged records of every venue reported so far, kept sorted by venue name.
///
/// Sorting compares names byte-wise, so "Zhenghua" sorts before "ang mo kio".
/// The sort is stable: records of one venue keep their court order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultSet {
    records: Vec<SlotRecord>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a venue's records and re-sort the whole set.
    pub fn merge(&mut self, records: Vec<SlotRecord>) {
        self.records.extend(records);
        self.records.sort_by(|a, b| a.venue.cmp(&b.venue));
    }

    pub fn records(&self) -> &[SlotRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records matching `query` in venue, court or slots (case-insensitive).
    /// An empty query keeps everything.
    pub fn filter(&self, query: &str) -> Vec<&SlotRecord> {
        self.records.iter().filter(|r| r.matches(query)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(venue: &str, court: &str, slots: &str) -> SlotRecord {
        SlotRecord {
            venue: venue.to_string(),
            court: court.to_string(),
            slots: slots.to_string(),
        }
    }

    #[test]
    fn test_new_joins_labels() {
        let r = SlotRecord::new("Venue", "Court 1", &["9am".to_string(), "10am".to_string()]);
        assert_eq!(r.slots, "9am, 10am");
        assert!(!r.is_sentinel());
    }

    #[test]
    fn test_sentinel() {
        let r = SlotRecord::sentinel("Venue");
        assert_eq!(r.court, "-");
        assert_eq!(r.slots, "-");
        assert!(r.is_sentinel());
    }

    #[test]
    fn test_merge_sorts_by_venue() {
        let mut set = ResultSet::new();
        set.merge(vec![record("Yishun", "Court 1", "9am")]);
        set.merge(vec![record("Bedok", "Court 2", "1pm")]);
        set.merge(vec![record("Jurong", "-", "-")]);

        let venues: Vec<&str> = set.records().iter().map(|r| r.venue.as_str()).collect();
        assert_eq!(venues, vec!["Bedok", "Jurong", "Yishun"]);
    }

    #[test]
    fn test_merge_is_stable_within_venue() {
        let mut set = ResultSet::new();
        set.merge(vec![
            record("Tampines", "Court 3", "9am"),
            record("Tampines", "Court 1", "10am"),
        ]);
        set.merge(vec![record("Bishan", "Court 1", "2pm")]);

        let courts: Vec<&str> = set.records().iter().map(|r| r.court.as_str()).collect();
        assert_eq!(courts, vec!["Court 1", "Court 3", "Court 1"]);
        assert_eq!(set.records()[1].venue, "Tampines");
    }

    #[test]
    fn test_sort_is_case_sensitive() {
        let mut set = ResultSet::new();
        set.merge(vec![record("ang mo kio", "-", "-")]);
        set.merge(vec![record("Zhenghua", "-", "-")]);

        assert_eq!(set.records()[0].venue, "Zhenghua");
        assert_eq!(set.records()[1].venue, "ang mo kio");
    }

    #[test]
    fn test_filter_ignores_case_across_fields() {
        let mut set = ResultSet::new();
        set.merge(vec![
            record("Bedok Sports Hall", "Court 1", "9am, 10am"),
            record("Yishun School", "Court 2", "2pm"),
        ]);

        assert_eq!(set.filter("").len(), 2);
        assert_eq!(set.filter("BEDOK").len(), 1);
        assert_eq!(set.filter("court 2")[0].venue, "Yishun School");
        assert_eq!(set.filter("10AM")[0].venue, "Bedok Sports Hall");
        assert!(set.filter("pasir ris").is_empty());
    }
}
