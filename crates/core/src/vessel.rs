//! Vessel records and the PLN -> licence-period temporal index.
//!
//! A single PLN (the human-facing registration number) may carry several,
//! generally non-overlapping licence periods over time as licences lapse and
//! are re-issued. The index is rebuilt wholesale on every vessel refresh and
//! never mutated in place, so readers can hold a snapshot across a refresh.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::CalendarDate;

// ---------------------------------------------------------------------------
// Sentinel identity
// ---------------------------------------------------------------------------

/// PLN of the synthetic vessel appended when `add_vessel_not_found` is set.
pub const VESSEL_NOT_FOUND_PLN: &str = "VESSEL NOT FOUND";

/// RSS number of the synthetic "vessel not found" vessel.
pub const VESSEL_NOT_FOUND_RSS: &str = "RSS VESSEL NOT FOUND";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One licence validity window for a vessel, carrying the identity fields
/// downstream lookups need (RSS number, devolved authority, vessel length).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicencePeriod {
    /// Stable internal vessel id, independent of PLN reassignment.
    pub rss_number: String,
    /// Devolved authority governing the licence.
    pub da: String,
    pub vessel_name: Option<String>,
    pub flag: Option<String>,
    pub home_port: Option<String>,
    pub admin_port: Option<String>,
    /// Overall length in metres. Absent for some historic records.
    pub vessel_length: Option<f64>,
    pub cfr: Option<String>,
    pub imo: Option<String>,
    pub licence_holder: Option<String>,
    pub valid_from: CalendarDate,
    pub valid_to: CalendarDate,
    /// Marks the synthetic sentinel appended for unresolvable PLNs.
    #[serde(default)]
    pub vessel_not_found: bool,
}

impl LicencePeriod {
    /// Whether `date` falls inside this licence window (inclusive bounds).
    pub fn covers(&self, date: CalendarDate) -> bool {
        self.valid_from <= date && date <= self.valid_to
    }
}

/// A vessel as supplied by the bulk vessel loader: one registration number
/// with one or more licence periods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VesselRecord {
    /// Registration / licence-plate number (PLN).
    pub registration_number: String,
    pub periods: Vec<LicencePeriod>,
}

impl VesselRecord {
    /// The synthetic sentinel vessel: fixed identity, effectively unbounded
    /// licence validity, `vessel_not_found` set. Appended to the vessel list
    /// when the cache is configured to resolve unknown PLNs to a marker
    /// instead of a miss.
    pub fn not_found_sentinel() -> Self {
        Self {
            registration_number: VESSEL_NOT_FOUND_PLN.to_string(),
            periods: vec![LicencePeriod {
                rss_number: VESSEL_NOT_FOUND_RSS.to_string(),
                da: String::new(),
                vessel_name: Some(VESSEL_NOT_FOUND_PLN.to_string()),
                flag: None,
                home_port: None,
                admin_port: None,
                vessel_length: None,
                cfr: None,
                imo: None,
                licence_holder: None,
                valid_from: CalendarDate::MIN,
                valid_to: CalendarDate::MAX,
                vessel_not_found: true,
            }],
        }
    }
}

// ---------------------------------------------------------------------------
// Loader row (raw)
// ---------------------------------------------------------------------------

/// A vessel as supplied by the bulk loader, before numeric normalization.
#[derive(Debug, Clone, Deserialize)]
pub struct VesselRow {
    pub registration_number: String,
    pub periods: Vec<LicencePeriod>,
}

impl VesselRow {
    /// Normalize non-finite vessel lengths to "absent", so downstream
    /// size-group bucketing only ever sees a real length or none.
    pub fn normalize(self) -> VesselRecord {
        VesselRecord {
            registration_number: self.registration_number,
            periods: self
                .periods
                .into_iter()
                .map(|mut period| {
                    period.vessel_length = period.vessel_length.filter(|v| v.is_finite());
                    period
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Temporal index
// ---------------------------------------------------------------------------

/// Maps a PLN to its ordered licence periods for point-in-time lookup.
///
/// Built once per vessel-cache refresh from the complete vessel list.
#[derive(Debug, Default)]
pub struct VesselLicenceIndex {
    by_pln: HashMap<String, Vec<LicencePeriod>>,
}

impl VesselLicenceIndex {
    /// Build the index from a full vessel list, preserving the supplied
    /// period order per PLN.
    pub fn build(vessels: &[VesselRecord]) -> Self {
        let mut by_pln: HashMap<String, Vec<LicencePeriod>> = HashMap::new();
        for vessel in vessels {
            by_pln
                .entry(vessel.registration_number.clone())
                .or_default()
                .extend(vessel.periods.iter().cloned());
        }
        Self { by_pln }
    }

    /// Return the licence period covering `date` for `pln`.
    ///
    /// First match wins when periods are supplied out of order or overlap.
    /// An unknown PLN is logged and propagated as `None`, never an error, so
    /// callers can apply their documented defaults.
    pub fn lookup(&self, pln: &str, date: CalendarDate) -> Option<&LicencePeriod> {
        let Some(periods) = self.by_pln.get(pln) else {
            warn!(pln, %date, "vessel not found in licence index");
            return None;
        };
        periods.iter().find(|p| p.covers(date))
    }

    /// Number of distinct PLNs in the index.
    pub fn len(&self) -> usize {
        self.by_pln.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_pln.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> CalendarDate {
        s.parse().expect("test date")
    }

    fn period(rss: &str, from: &str, to: &str) -> LicencePeriod {
        LicencePeriod {
            rss_number: rss.to_string(),
            da: "England".to_string(),
            vessel_name: None,
            flag: None,
            home_port: None,
            admin_port: None,
            vessel_length: Some(11.0),
            cfr: None,
            imo: None,
            licence_holder: None,
            valid_from: date(from),
            valid_to: date(to),
            vessel_not_found: false,
        }
    }

    fn vessel(pln: &str, periods: Vec<LicencePeriod>) -> VesselRecord {
        VesselRecord {
            registration_number: pln.to_string(),
            periods,
        }
    }

    #[test]
    fn lookup_inside_window() {
        let idx = VesselLicenceIndex::build(&[vessel(
            "PH1100",
            vec![period("A10001", "2020-01-01", "2020-12-31")],
        )]);
        let found = idx.lookup("PH1100", date("2020-06-15"));
        assert_eq!(found.map(|p| p.rss_number.as_str()), Some("A10001"));
    }

    #[test]
    fn lookup_boundaries_inclusive() {
        let idx = VesselLicenceIndex::build(&[vessel(
            "PH1100",
            vec![period("A10001", "2020-01-01", "2020-12-31")],
        )]);
        assert!(idx.lookup("PH1100", date("2020-01-01")).is_some());
        assert!(idx.lookup("PH1100", date("2020-12-31")).is_some());
    }

    #[test]
    fn lookup_outside_all_windows() {
        let idx = VesselLicenceIndex::build(&[vessel(
            "PH1100",
            vec![period("A10001", "2020-01-01", "2020-12-31")],
        )]);
        assert!(idx.lookup("PH1100", date("2021-01-01")).is_none());
    }

    #[test]
    fn lookup_unknown_pln_is_none() {
        let idx = VesselLicenceIndex::build(&[]);
        assert!(idx.lookup("WA1", date("2020-06-15")).is_none());
    }

    #[test]
    fn lookup_selects_correct_period_of_several() {
        let idx = VesselLicenceIndex::build(&[vessel(
            "PH1100",
            vec![
                period("A10001", "2019-01-01", "2019-12-31"),
                period("A10002", "2020-01-01", "2020-12-31"),
            ],
        )]);
        let found = idx.lookup("PH1100", date("2020-03-01"));
        assert_eq!(found.map(|p| p.rss_number.as_str()), Some("A10002"));
    }

    #[test]
    fn overlapping_periods_first_match_wins() {
        let idx = VesselLicenceIndex::build(&[vessel(
            "PH1100",
            vec![
                period("FIRST", "2020-01-01", "2020-12-31"),
                period("SECOND", "2020-06-01", "2021-06-01"),
            ],
        )]);
        let found = idx.lookup("PH1100", date("2020-07-01"));
        assert_eq!(found.map(|p| p.rss_number.as_str()), Some("FIRST"));
    }

    #[test]
    fn sentinel_covers_any_date() {
        let sentinel = VesselRecord::not_found_sentinel();
        let idx = VesselLicenceIndex::build(&[sentinel]);
        let found = idx.lookup(VESSEL_NOT_FOUND_PLN, date("1990-01-01"));
        assert!(found.is_some_and(|p| p.vessel_not_found));
        let found = idx.lookup(VESSEL_NOT_FOUND_PLN, date("2099-12-31"));
        assert!(found.is_some_and(|p| p.rss_number == VESSEL_NOT_FOUND_RSS));
    }

    #[test]
    fn vessel_row_normalize_drops_non_finite_length() {
        let mut raw = period("A10001", "2020-01-01", "2020-12-31");
        raw.vessel_length = Some(f64::NAN);
        let row = VesselRow {
            registration_number: "PH1100".to_string(),
            periods: vec![raw],
        };
        let record = row.normalize();
        assert_eq!(record.periods[0].vessel_length, None);
    }

    #[test]
    fn vessel_row_normalize_keeps_finite_length() {
        let row = VesselRow {
            registration_number: "PH1100".to_string(),
            periods: vec![period("A10001", "2020-01-01", "2020-12-31")],
        };
        let record = row.normalize();
        assert_eq!(record.periods[0].vessel_length, Some(11.0));
    }

    #[test]
    fn index_merges_duplicate_pln_entries() {
        let idx = VesselLicenceIndex::build(&[
            vessel("PH1100", vec![period("A10001", "2019-01-01", "2019-12-31")]),
            vessel("PH1100", vec![period("A10002", "2020-01-01", "2020-12-31")]),
        ]);
        assert_eq!(idx.len(), 1);
        assert!(idx.lookup("PH1100", date("2019-06-01")).is_some());
        assert!(idx.lookup("PH1100", date("2020-06-01")).is_some());
    }
}
