//! Weighted risk scoring for catch/export combinations.
//!
//! Per-factor scores (vessel, species, exporter) combine into a composite
//! score through the configured weighting; a strict threshold comparison
//! decides escalation. All functions are synchronous reads over the current
//! cache snapshot.

use crate::reference::{ExporterBehaviourRecord, ReferenceDataCache};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Score for a vessel present in the vessels-of-interest set.
pub const VESSEL_OF_INTEREST_SCORE: f64 = 1.0;

/// Score for a vessel not under interest.
pub const VESSEL_DEFAULT_SCORE: f64 = 0.5;

/// Exporter score when no behaviour record matches at any fallback tier.
pub const EXPORTER_DEFAULT_SCORE: f64 = 1.0;

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Risk-scoring view over the reference-data cache.
pub struct RiskScoringEngine<'a> {
    cache: &'a ReferenceDataCache,
}

impl<'a> RiskScoringEngine<'a> {
    pub fn new(cache: &'a ReferenceDataCache) -> Self {
        Self { cache }
    }

    /// 1.0 when the PLN is in the vessels-of-interest set, else 0.5.
    pub fn vessel_risk_score(&self, pln: &str) -> f64 {
        if self.cache.is_vessel_of_interest(pln) {
            VESSEL_OF_INTEREST_SCORE
        } else {
            VESSEL_DEFAULT_SCORE
        }
    }

    /// Stored species risk score, defaulting per the cache contract.
    pub fn species_risk_score(&self, species: &str) -> f64 {
        self.cache.species_risk_score(species)
    }

    /// Exporter score via the tiered fallback over behaviour records.
    pub fn exporter_risk_score(
        &self,
        account_id: Option<&str>,
        contact_id: Option<&str>,
    ) -> f64 {
        exporter_risk_score(&self.cache.exporter_behaviour(), account_id, contact_id)
    }

    /// Composite score: the product of each weighted factor.
    pub fn total_risk_score(
        &self,
        pln: &str,
        species: &str,
        account_id: Option<&str>,
        contact_id: Option<&str>,
    ) -> f64 {
        let weighting = self.cache.weighting();
        calc_risk_score(self.vessel_risk_score(pln), weighting.vessel_weight)
            * calc_risk_score(self.species_risk_score(species), weighting.species_weight)
            * calc_risk_score(
                self.exporter_risk_score(account_id, contact_id),
                weighting.exporter_weight,
            )
    }

    /// Strict comparison: a score exactly at the threshold is not high risk.
    pub fn is_high_risk(&self, score: f64) -> bool {
        score > self.cache.weighting().threshold
    }

    /// Whether risk scoring influences validation outcomes at all.
    pub fn is_risk_enabled(&self) -> bool {
        self.cache.is_risk_enabled()
    }
}

/// One weighted factor.
pub fn calc_risk_score(score: f64, weight: f64) -> f64 {
    score * weight
}

// ---------------------------------------------------------------------------
// Exporter fallback tiers
// ---------------------------------------------------------------------------

/// Four-tier fallback, evaluated strictly in order, defaulting to
/// [`EXPORTER_DEFAULT_SCORE`] at every tier exhaustion:
///
/// 1. neither id supplied, or no behaviour data loaded;
/// 2. contact only: a wildcard-account row for that contact;
/// 3. both ids: exact match, then contact-wildcard, then account-wildcard.
pub fn exporter_risk_score(
    records: &[ExporterBehaviourRecord],
    account_id: Option<&str>,
    contact_id: Option<&str>,
) -> f64 {
    if records.is_empty() {
        return EXPORTER_DEFAULT_SCORE;
    }
    let matched = match (account_id, contact_id) {
        // An account id alone is not a recognized tier; it defaults.
        (None, None) | (Some(_), None) => None,
        (None, Some(contact)) => match_contact_wildcard(records, contact),
        (Some(account), Some(contact)) => match_exact(records, account, contact)
            .or_else(|| match_contact_wildcard(records, contact))
            .or_else(|| match_account_wildcard(records, account)),
    };
    matched.map_or(EXPORTER_DEFAULT_SCORE, |r| r.score)
}

/// Exact match on both ids.
fn match_exact<'a>(
    records: &'a [ExporterBehaviourRecord],
    account: &str,
    contact: &str,
) -> Option<&'a ExporterBehaviourRecord> {
    records.iter().find(|r| {
        r.account_id.as_deref() == Some(account) && r.contact_id.as_deref() == Some(contact)
    })
}

/// A row for this contact with no account ("any account").
fn match_contact_wildcard<'a>(
    records: &'a [ExporterBehaviourRecord],
    contact: &str,
) -> Option<&'a ExporterBehaviourRecord> {
    records
        .iter()
        .find(|r| r.account_id.is_none() && r.contact_id.as_deref() == Some(contact))
}

/// A row for this account with no contact ("any contact").
fn match_account_wildcard<'a>(
    records: &'a [ExporterBehaviourRecord],
    account: &str,
) -> Option<&'a ExporterBehaviourRecord> {
    records
        .iter()
        .find(|r| r.contact_id.is_none() && r.account_id.as_deref() == Some(account))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
