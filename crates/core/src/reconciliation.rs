//! Certificate-vs-landing reconciliation.
//!
//! Cross-references declared catch items against observed landing events to
//! spot overuse (more weight declared across certificates than was landed)
//! and to target investigation candidates where landing data is missing or
//! inconsistent. Vessel identity resolves through the licence index: the
//! declared PLN maps to the RSS number of the licence period covering the
//! catch date, and a declared species may be recorded on a landing under a
//! known alias code.

use std::collections::{BTreeSet, HashMap};

use chrono::Days;
use serde::{Deserialize, Serialize};

use crate::risk::RiskScoringEngine;
use crate::types::{CalendarDate, Timestamp};
use crate::vessel::VesselLicenceIndex;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Fixed tolerance: declared weight may exceed landed weight by this much
/// before the real-time check fails.
pub const LANDED_WEIGHT_TOLERANCE_KG: f64 = 50.0;

/// Certificates older than this many days at query time are outside the
/// investigation window.
pub const INVESTIGATION_WINDOW_DAYS: u64 = 40;

// ---------------------------------------------------------------------------
// Declared export data
// ---------------------------------------------------------------------------

/// One declared catch event on a certificate product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatchEvent {
    pub pln: String,
    pub date_landed: CalendarDate,
    pub weight_kg: f64,
    /// Already flagged as overused during validation of its own certificate.
    #[serde(default)]
    pub overused_on_certificate: bool,
    #[serde(default)]
    pub pre_approved: bool,
}

/// A certificate product: one species with its catch events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub species_code: String,
    pub caught_by: Vec<CatchEvent>,
}

/// A catch certificate as the reconciliation query reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatchCertificate {
    pub certificate_number: String,
    pub created_at: Timestamp,
    pub account_id: Option<String>,
    pub contact_id: Option<String>,
    pub products: Vec<Product>,
}

// ---------------------------------------------------------------------------
// Observed landings
// ---------------------------------------------------------------------------

/// Per-species weight within a landing event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandingWeightItem {
    pub species_code: String,
    pub weight_kg: f64,
}

/// An observed landing event for a vessel on a date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandingRecord {
    pub rss_number: String,
    pub date_landed: CalendarDate,
    pub items: Vec<LandingWeightItem>,
}

// ---------------------------------------------------------------------------
// Reconciled output
// ---------------------------------------------------------------------------

/// One certificate catch item joined against the landing data.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciledItem {
    pub certificate_number: String,
    pub certificate_created_at: Timestamp,
    pub account_id: Option<String>,
    pub contact_id: Option<String>,
    pub pln: String,
    /// Resolved via the licence period covering the landing date; `None`
    /// when the PLN has no covering licence.
    pub rss_number: Option<String>,
    pub species_code: String,
    pub date_landed: CalendarDate,
    pub is_landing_exists: bool,
    pub is_species_exists: bool,
    /// Weight declared on this certificate for (vessel, species, date).
    pub weight_on_cert: f64,
    /// Weight declared across all certificates for (vessel, species, date).
    pub weight_on_all_certs: f64,
    /// Landed weight for the species (aliases included) on the joined event.
    pub weight_on_landing: f64,
    pub overused_on_certificate: bool,
    pub pre_approved: bool,
}

/// A deduplicated target for landing-data investigation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct InvestigationCandidate {
    pub rss_number: String,
    pub date_landed: CalendarDate,
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

/// Species aliases: declared code -> codes a landing may record it under.
pub type SpeciesAliases = HashMap<String, Vec<String>>;

fn species_matches(declared: &str, landed: &str, aliases: &SpeciesAliases) -> bool {
    declared == landed
        || aliases
            .get(declared)
            .is_some_and(|list| list.iter().any(|a| a == landed))
}

/// Join every declared catch item against the landing events.
///
/// Cumulative declared weight is keyed on the resolved vessel identity (RSS
/// number where a licence resolves, otherwise the raw PLN), species, and
/// landing date, summed across all supplied certificates.
pub fn reconcile(
    certificates: &[CatchCertificate],
    landings: &[LandingRecord],
    index: &VesselLicenceIndex,
    aliases: &SpeciesAliases,
) -> Vec<ReconciledItem> {
    // Pass 1: cumulative declared weight per (identity, species, date).
    let mut declared_totals: HashMap<(String, String, CalendarDate), f64> = HashMap::new();
    for cert in certificates {
        for product in &cert.products {
            for event in &product.caught_by {
                let identity = resolve_identity(index, &event.pln, event.date_landed);
                *declared_totals
                    .entry((identity, product.species_code.clone(), event.date_landed))
                    .or_default() += event.weight_kg;
            }
        }
    }

    // Pass 2: join each item to its landings.
    let mut items = Vec::new();
    for cert in certificates {
        for product in &cert.products {
            for event in &product.caught_by {
                let rss_number = index
                    .lookup(&event.pln, event.date_landed)
                    .map(|p| p.rss_number.clone());
                let identity = rss_number
                    .clone()
                    .unwrap_or_else(|| event.pln.clone());

                let matching_landings: Vec<&LandingRecord> = rss_number
                    .as_deref()
                    .map(|rss| {
                        landings
                            .iter()
                            .filter(|l| l.rss_number == rss && l.date_landed == event.date_landed)
                            .collect()
                    })
                    .unwrap_or_default();

                let is_landing_exists = !matching_landings.is_empty();
                let mut weight_on_landing = 0.0;
                let mut is_species_exists = false;
                for landing in &matching_landings {
                    for item in &landing.items {
                        if species_matches(&product.species_code, &item.species_code, aliases) {
                            is_species_exists = true;
                            weight_on_landing += item.weight_kg;
                        }
                    }
                }

                let weight_on_all_certs = declared_totals
                    .get(&(identity, product.species_code.clone(), event.date_landed))
                    .copied()
                    .unwrap_or(0.0);

                items.push(ReconciledItem {
                    certificate_number: cert.certificate_number.clone(),
                    certificate_created_at: cert.created_at,
                    account_id: cert.account_id.clone(),
                    contact_id: cert.contact_id.clone(),
                    pln: event.pln.clone(),
                    rss_number,
                    species_code: product.species_code.clone(),
                    date_landed: event.date_landed,
                    is_landing_exists,
                    is_species_exists,
                    weight_on_cert: event.weight_kg,
                    weight_on_all_certs,
                    weight_on_landing,
                    overused_on_certificate: event.overused_on_certificate,
                    pre_approved: event.pre_approved,
                });
            }
        }
    }
    items
}

fn resolve_identity(index: &VesselLicenceIndex, pln: &str, date: CalendarDate) -> String {
    index
        .lookup(pln, date)
        .map(|p| p.rss_number.clone())
        .unwrap_or_else(|| pln.to_string())
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// Whether cross-certificate declared weight exceeds the landed weight by
/// more than the fixed tolerance.
fn exceeds_tolerance(item: &ReconciledItem) -> bool {
    item.weight_on_all_certs > item.weight_on_landing + LANDED_WEIGHT_TOLERANCE_KG
}

/// Informational real-time check: passes while declared weight stays inside
/// the tolerance, or while the composite risk score is not high-risk.
pub fn is_real_time_validation_successful(item: &ReconciledItem, risk: &RiskScoringEngine) -> bool {
    if !exceeds_tolerance(item) {
        return true;
    }
    let score = risk.total_risk_score(
        &item.pln,
        &item.species_code,
        item.account_id.as_deref(),
        item.contact_id.as_deref(),
    );
    !risk.is_high_risk(score)
}

/// Stricter "should block" predicate: overuse confirmed across all
/// certificates on a high-risk item that is neither pre-approved nor already
/// flagged on its own certificate.
pub fn is_validation_overuse(item: &ReconciledItem, risk: &RiskScoringEngine) -> bool {
    if !item.is_species_exists || item.overused_on_certificate || item.pre_approved {
        return false;
    }
    let score = risk.total_risk_score(
        &item.pln,
        &item.species_code,
        item.account_id.as_deref(),
        item.contact_id.as_deref(),
    );
    risk.is_high_risk(score) && exceeds_tolerance(item)
}

// ---------------------------------------------------------------------------
// Investigation query
// ---------------------------------------------------------------------------

/// Target investigation candidates: items whose landing is missing, whose
/// species is missing from the landing, or whose real-time validation
/// failed, restricted to certificates created within the last
/// [`INVESTIGATION_WINDOW_DAYS`] of `query_time`. Emits exact-value
/// deduplicated `(rss_number, date_landed)` pairs, independent of the
/// originating certificate.
pub fn missing_landing_investigation_refresh_query(
    certificates: &[CatchCertificate],
    landings: &[LandingRecord],
    index: &VesselLicenceIndex,
    aliases: &SpeciesAliases,
    risk: &RiskScoringEngine,
    query_time: Timestamp,
) -> Vec<InvestigationCandidate> {
    let window_start = query_time
        .checked_sub_days(Days::new(INVESTIGATION_WINDOW_DAYS))
        .unwrap_or(Timestamp::MIN_UTC);

    let mut candidates = BTreeSet::new();
    for item in reconcile(certificates, landings, index, aliases) {
        if item.certificate_created_at < window_start {
            continue;
        }
        let needs_investigation = !item.is_landing_exists
            || !item.is_species_exists
            || !is_real_time_validation_successful(&item, risk);
        if !needs_investigation {
            continue;
        }
        let Some(rss_number) = item.rss_number else {
            continue;
        };
        candidates.insert(InvestigationCandidate {
            rss_number,
            date_landed: item.date_landed,
        });
    }
    candidates.into_iter().collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::reference::{CacheConfig, ReferenceDataCache, ReferenceDataUpdate, WeightingConfig};
    use crate::vessel::{LicencePeriod, VesselRecord};

    fn date(s: &str) -> CalendarDate {
        s.parse().expect("test date")
    }

    fn ts(s: &str) -> Timestamp {
        Utc.with_ymd_and_hms(
            s[0..4].parse().expect("year"),
            s[5..7].parse().expect("month"),
            s[8..10].parse().expect("day"),
            12,
            0,
            0,
        )
        .single()
        .expect("timestamp")
    }

    fn index_with(pln: &str, rss: &str) -> VesselLicenceIndex {
        VesselLicenceIndex::build(&[VesselRecord {
            registration_number: pln.to_string(),
            periods: vec![LicencePeriod {
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
                valid_from: date("2020-01-01"),
                valid_to: date("2030-12-31"),
                vessel_not_found: false,
            }],
        }])
    }

    fn certificate(
        number: &str,
        created: &str,
        species: &str,
        pln: &str,
        landed: &str,
        weight: f64,
    ) -> CatchCertificate {
        CatchCertificate {
            certificate_number: number.to_string(),
            created_at: ts(created),
            account_id: None,
            contact_id: None,
            products: vec![Product {
                species_code: species.to_string(),
                caught_by: vec![CatchEvent {
                    pln: pln.to_string(),
                    date_landed: date(landed),
                    weight_kg: weight,
                    overused_on_certificate: false,
                    pre_approved: false,
                }],
            }],
        }
    }

    fn landing(rss: &str, landed: &str, species: &str, weight: f64) -> LandingRecord {
        LandingRecord {
            rss_number: rss.to_string(),
            date_landed: date(landed),
            items: vec![LandingWeightItem {
                species_code: species.to_string(),
                weight_kg: weight,
            }],
        }
    }

    /// Cache where every composite score is high-risk (threshold 0).
    fn high_risk_cache() -> ReferenceDataCache {
        let cache = ReferenceDataCache::new(CacheConfig::default());
        cache.refresh(ReferenceDataUpdate {
            weighting: Some(WeightingConfig {
                threshold: 0.0,
                ..Default::default()
            }),
            ..Default::default()
        });
        cache
    }

    /// Cache where nothing is high-risk (threshold far above any product).
    fn low_risk_cache() -> ReferenceDataCache {
        let cache = ReferenceDataCache::new(CacheConfig::default());
        cache.refresh(ReferenceDataUpdate {
            weighting: Some(WeightingConfig {
                threshold: 100.0,
                ..Default::default()
            }),
            ..Default::default()
        });
        cache
    }

    // -- reconcile --

    #[test]
    fn joins_landing_by_rss_and_date() {
        let index = index_with("PH1100", "A10001");
        let certs = vec![certificate("CC-1", "2023-05-01", "COD", "PH1100", "2023-05-10", 100.0)];
        let landings = vec![landing("A10001", "2023-05-10", "COD", 120.0)];
        let items = reconcile(&certs, &landings, &index, &HashMap::new());

        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert!(item.is_landing_exists);
        assert!(item.is_species_exists);
        assert_eq!(item.rss_number.as_deref(), Some("A10001"));
        assert_eq!(item.weight_on_landing, 120.0);
        assert_eq!(item.weight_on_all_certs, 100.0);
    }

    #[test]
    fn missing_landing_is_flagged() {
        let index = index_with("PH1100", "A10001");
        let certs = vec![certificate("CC-1", "2023-05-01", "COD", "PH1100", "2023-05-10", 100.0)];
        let items = reconcile(&certs, &[], &index, &HashMap::new());
        assert!(!items[0].is_landing_exists);
        assert!(!items[0].is_species_exists);
        assert_eq!(items[0].weight_on_landing, 0.0);
    }

    #[test]
    fn species_absent_from_landing() {
        let index = index_with("PH1100", "A10001");
        let certs = vec![certificate("CC-1", "2023-05-01", "COD", "PH1100", "2023-05-10", 100.0)];
        let landings = vec![landing("A10001", "2023-05-10", "HER", 500.0)];
        let items = reconcile(&certs, &landings, &index, &HashMap::new());
        assert!(items[0].is_landing_exists);
        assert!(!items[0].is_species_exists);
        assert_eq!(items[0].weight_on_landing, 0.0);
    }

    #[test]
    fn alias_codes_match_landed_species() {
        let index = index_with("PH1100", "A10001");
        let certs = vec![certificate("CC-1", "2023-05-01", "COD", "PH1100", "2023-05-10", 100.0)];
        let landings = vec![landing("A10001", "2023-05-10", "COD-ALIAS", 120.0)];
        let aliases =
            HashMap::from([("COD".to_string(), vec!["COD-ALIAS".to_string()])]);
        let items = reconcile(&certs, &landings, &index, &aliases);
        assert!(items[0].is_species_exists);
        assert_eq!(items[0].weight_on_landing, 120.0);
    }

    #[test]
    fn cumulative_weight_spans_certificates() {
        let index = index_with("PH1100", "A10001");
        let certs = vec![
            certificate("CC-1", "2023-05-01", "COD", "PH1100", "2023-05-10", 100.0),
            certificate("CC-2", "2023-05-02", "COD", "PH1100", "2023-05-10", 80.0),
        ];
        let landings = vec![landing("A10001", "2023-05-10", "COD", 120.0)];
        let items = reconcile(&certs, &landings, &index, &HashMap::new());
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.weight_on_all_certs == 180.0));
        assert_eq!(items[0].weight_on_cert, 100.0);
        assert_eq!(items[1].weight_on_cert, 80.0);
    }

    #[test]
    fn unresolvable_pln_has_no_rss() {
        let index = VesselLicenceIndex::build(&[]);
        let certs = vec![certificate("CC-1", "2023-05-01", "COD", "WA1", "2023-05-10", 100.0)];
        let items = reconcile(&certs, &[], &index, &HashMap::new());
        assert_eq!(items[0].rss_number, None);
        assert!(!items[0].is_landing_exists);
    }

    // -- real-time validation --

    fn item_with_weights(all_certs: f64, landed: f64) -> ReconciledItem {
        ReconciledItem {
            certificate_number: "CC-1".to_string(),
            certificate_created_at: ts("2023-05-01"),
            account_id: None,
            contact_id: None,
            pln: "PH1100".to_string(),
            rss_number: Some("A10001".to_string()),
            species_code: "COD".to_string(),
            date_landed: date("2023-05-10"),
            is_landing_exists: true,
            is_species_exists: true,
            weight_on_cert: all_certs,
            weight_on_all_certs: all_certs,
            weight_on_landing: landed,
            overused_on_certificate: false,
            pre_approved: false,
        }
    }

    #[test]
    fn within_tolerance_is_successful() {
        let cache = high_risk_cache();
        let risk = RiskScoringEngine::new(&cache);
        let item = item_with_weights(150.0, 100.0);
        assert!(is_real_time_validation_successful(&item, &risk));
    }

    #[test]
    fn over_tolerance_fails_when_high_risk() {
        let cache = high_risk_cache();
        let risk = RiskScoringEngine::new(&cache);
        let item = item_with_weights(150.1, 100.0);
        assert!(!is_real_time_validation_successful(&item, &risk));
    }

    #[test]
    fn over_tolerance_passes_when_low_risk() {
        let cache = low_risk_cache();
        let risk = RiskScoringEngine::new(&cache);
        let item = item_with_weights(150.1, 100.0);
        assert!(is_real_time_validation_successful(&item, &risk));
    }

    // -- overuse predicate --

    #[test]
    fn overuse_requires_all_conditions() {
        let cache = high_risk_cache();
        let risk = RiskScoringEngine::new(&cache);
        let item = item_with_weights(200.0, 100.0);
        assert!(is_validation_overuse(&item, &risk));
    }

    #[test]
    fn overuse_suppressed_when_pre_approved() {
        let cache = high_risk_cache();
        let risk = RiskScoringEngine::new(&cache);
        let mut item = item_with_weights(200.0, 100.0);
        item.pre_approved = true;
        assert!(!is_validation_overuse(&item, &risk));
    }

    #[test]
    fn overuse_suppressed_when_already_flagged_on_certificate() {
        let cache = high_risk_cache();
        let risk = RiskScoringEngine::new(&cache);
        let mut item = item_with_weights(200.0, 100.0);
        item.overused_on_certificate = true;
        assert!(!is_validation_overuse(&item, &risk));
    }

    #[test]
    fn overuse_suppressed_when_species_missing() {
        let cache = high_risk_cache();
        let risk = RiskScoringEngine::new(&cache);
        let mut item = item_with_weights(200.0, 100.0);
        item.is_species_exists = false;
        assert!(!is_validation_overuse(&item, &risk));
    }

    #[test]
    fn overuse_suppressed_when_low_risk() {
        let cache = low_risk_cache();
        let risk = RiskScoringEngine::new(&cache);
        let item = item_with_weights(200.0, 100.0);
        assert!(!is_validation_overuse(&item, &risk));
    }

    #[test]
    fn overuse_suppressed_within_tolerance() {
        let cache = high_risk_cache();
        let risk = RiskScoringEngine::new(&cache);
        let item = item_with_weights(149.0, 100.0);
        assert!(!is_validation_overuse(&item, &risk));
    }

    // -- investigation query --

    #[test]
    fn investigation_targets_missing_landing() {
        let cache = high_risk_cache();
        let risk = RiskScoringEngine::new(&cache);
        let index = index_with("PH1100", "A10001");
        let certs = vec![certificate("CC-1", "2023-05-01", "COD", "PH1100", "2023-05-10", 100.0)];
        let candidates = missing_landing_investigation_refresh_query(
            &certs,
            &[],
            &index,
            &HashMap::new(),
            &risk,
            ts("2023-05-15"),
        );
        assert_eq!(
            candidates,
            vec![InvestigationCandidate {
                rss_number: "A10001".to_string(),
                date_landed: date("2023-05-10"),
            }]
        );
    }

    #[test]
    fn investigation_skips_certificates_outside_window() {
        let cache = high_risk_cache();
        let risk = RiskScoringEngine::new(&cache);
        let index = index_with("PH1100", "A10001");
        let certs = vec![certificate("CC-1", "2023-01-01", "COD", "PH1100", "2022-12-28", 100.0)];
        let candidates = missing_landing_investigation_refresh_query(
            &certs,
            &[],
            &index,
            &HashMap::new(),
            &risk,
            ts("2023-05-15"),
        );
        assert!(candidates.is_empty());
    }

    #[test]
    fn investigation_deduplicates_pairs() {
        let cache = high_risk_cache();
        let risk = RiskScoringEngine::new(&cache);
        let index = index_with("PH1100", "A10001");
        let certs = vec![
            certificate("CC-1", "2023-05-01", "COD", "PH1100", "2023-05-10", 100.0),
            certificate("CC-2", "2023-05-02", "HER", "PH1100", "2023-05-10", 60.0),
        ];
        let candidates = missing_landing_investigation_refresh_query(
            &certs,
            &[],
            &index,
            &HashMap::new(),
            &risk,
            ts("2023-05-15"),
        );
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn investigation_skips_fully_reconciled_items() {
        let cache = low_risk_cache();
        let risk = RiskScoringEngine::new(&cache);
        let index = index_with("PH1100", "A10001");
        let certs = vec![certificate("CC-1", "2023-05-01", "COD", "PH1100", "2023-05-10", 100.0)];
        let landings = vec![landing("A10001", "2023-05-10", "COD", 120.0)];
        let candidates = missing_landing_investigation_refresh_query(
            &certs,
            &landings,
            &index,
            &HashMap::new(),
            &risk,
            ts("2023-05-15"),
        );
        assert!(candidates.is_empty());
    }

    #[test]
    fn investigation_targets_failed_real_time_validation() {
        let cache = high_risk_cache();
        let risk = RiskScoringEngine::new(&cache);
        let index = index_with("PH1100", "A10001");
        // Landing exists with the right species, but declared weight is far
        // over the landed weight plus tolerance.
        let certs = vec![certificate("CC-1", "2023-05-01", "COD", "PH1100", "2023-05-10", 500.0)];
        let landings = vec![landing("A10001", "2023-05-10", "COD", 100.0)];
        let candidates = missing_landing_investigation_refresh_query(
            &certs,
            &landings,
            &index,
            &HashMap::new(),
            &risk,
            ts("2023-05-15"),
        );
        assert_eq!(candidates.len(), 1);
    }
}
