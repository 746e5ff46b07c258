//! Refreshable in-memory reference-data cache.
//!
//! Holds one immutable snapshot per category behind its own lock, so a
//! category replace is a single `Arc` swap and synchronous readers never
//! observe a half-written category. Cross-category consistency during a
//! refresh cycle is not guaranteed: a reader may pair freshly swapped vessel
//! data with a still-stale weighting config, and callers must tolerate that
//! window. Refresh invocations are not self-serializing; the triggering
//! collaborator owns that.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::eod::EodSetting;
use crate::error::CoreError;
use crate::types::CalendarDate;
use crate::vessel::{LicencePeriod, VesselLicenceIndex, VesselRecord};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Risk score used when a species has no stored (finite) risk score.
pub const DEFAULT_SPECIES_RISK_SCORE: f64 = 0.5;

/// Live-weight conversion factor used when no usable factor is stored.
/// A zero or non-finite stored factor counts as "no data", not a real zero.
pub const DEFAULT_CONVERSION_FACTOR: f64 = 1.0;

// ---------------------------------------------------------------------------
// Records (normalized)
// ---------------------------------------------------------------------------

/// A conversion-factor entry keyed by (species, state, presentation).
///
/// Numeric fields are `None` when the loader row held no finite value; the
/// normalization happens once, in [`ConversionFactorRow::normalize`], so no
/// downstream consumer ever sees an invalid number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionFactorRecord {
    pub species: String,
    pub state: String,
    pub presentation: String,
    pub to_live_weight_factor: Option<f64>,
    pub quota_status: Option<String>,
    pub risk_score: Option<f64>,
}

/// An exporter-behaviour entry. `account_id`/`contact_id` may each be absent,
/// representing "any account" / "any contact" wildcard rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExporterBehaviourRecord {
    pub account_id: Option<String>,
    pub contact_id: Option<String>,
    pub name: String,
    pub score: f64,
}

/// Risk-scoring weights and the high-risk threshold. Mutable through an
/// administrative write path; the cache only ever swaps whole snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightingConfig {
    pub vessel_weight: f64,
    pub species_weight: f64,
    pub exporter_weight: f64,
    pub threshold: f64,
}

impl Default for WeightingConfig {
    /// Neutral weights used before the first refresh completes.
    fn default() -> Self {
        Self {
            vessel_weight: 1.0,
            species_weight: 1.0,
            exporter_weight: 1.0,
            threshold: 1.0,
        }
    }
}

/// Gates whether risk scoring influences validation outcomes elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeciesRiskToggle {
    pub enabled: bool,
}

// ---------------------------------------------------------------------------
// Loader rows (raw)
// ---------------------------------------------------------------------------

/// A conversion-factor row as supplied by the bulk loader, before numeric
/// normalization.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversionFactorRow {
    pub species: String,
    pub state: String,
    pub presentation: String,
    pub to_live_weight_factor: Option<f64>,
    pub quota_status: Option<String>,
    pub risk_score: Option<f64>,
}

impl ConversionFactorRow {
    /// Normalize non-finite numerics to "absent".
    pub fn normalize(self) -> ConversionFactorRecord {
        ConversionFactorRecord {
            species: self.species,
            state: self.state,
            presentation: self.presentation,
            to_live_weight_factor: self.to_live_weight_factor.filter(|v| v.is_finite()),
            quota_status: self.quota_status,
            risk_score: self.risk_score.filter(|v| v.is_finite()),
        }
    }
}

/// An exporter-behaviour row as supplied by the bulk loader.
#[derive(Debug, Clone, Deserialize)]
pub struct ExporterBehaviourRow {
    pub account_id: Option<String>,
    pub contact_id: Option<String>,
    pub name: String,
    pub score: Option<f64>,
}

impl ExporterBehaviourRow {
    /// Rows without a finite score carry no usable signal and are dropped.
    pub fn normalize(self) -> Option<ExporterBehaviourRecord> {
        let score = self.score.filter(|v| v.is_finite())?;
        Some(ExporterBehaviourRecord {
            account_id: self.account_id,
            contact_id: self.contact_id,
            name: self.name,
            score,
        })
    }
}

// ---------------------------------------------------------------------------
// Loader seam
// ---------------------------------------------------------------------------

/// Bulk loader collaborator (file or object storage).
///
/// Each method returns `Ok(None)` when the category has no new data, which
/// leaves the cached snapshot untouched. Load failures propagate to the
/// refresh-triggering caller, which owns retry/abort policy.
#[async_trait::async_trait]
pub trait ReferenceDataLoader: Send + Sync {
    async fn load_vessels(&self) -> Result<Option<Vec<VesselRecord>>, CoreError>;
    async fn load_conversion_factors(&self)
        -> Result<Option<Vec<ConversionFactorRecord>>, CoreError>;
    async fn load_exporter_behaviour(&self)
        -> Result<Option<Vec<ExporterBehaviourRecord>>, CoreError>;
    async fn load_species_aliases(&self)
        -> Result<Option<HashMap<String, Vec<String>>>, CoreError>;
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// Construction-time configuration for the cache.
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    /// When set, a vessel refresh appends a synthetic sentinel vessel so
    /// lookups for an unresolvable PLN still succeed with a recognizable
    /// "not found" marker instead of a miss.
    pub add_vessel_not_found: bool,
}

/// The vessel category keeps the raw records and the derived temporal index
/// together so both swap atomically.
#[derive(Debug, Default)]
pub struct VesselSnapshot {
    pub vessels: Vec<VesselRecord>,
    pub index: VesselLicenceIndex,
}

/// Per-category replacement payload for [`ReferenceDataCache::refresh`].
/// Only categories set to `Some` are swapped.
#[derive(Debug, Default)]
pub struct ReferenceDataUpdate {
    pub vessels: Option<Vec<VesselRecord>>,
    pub conversion_factors: Option<Vec<ConversionFactorRecord>>,
    pub exporter_behaviour: Option<Vec<ExporterBehaviourRecord>>,
    pub vessels_of_interest: Option<HashSet<String>>,
    pub weighting: Option<WeightingConfig>,
    pub species_risk_toggle: Option<SpeciesRiskToggle>,
    pub eod_settings: Option<Vec<EodSetting>>,
    pub species_aliases: Option<HashMap<String, Vec<String>>>,
}

/// Category-tagged reference-data snapshots.
///
/// Constructed once at process start and passed to readers by reference; all
/// read accessors are synchronous and non-blocking apart from the brief
/// snapshot-pointer read.
pub struct ReferenceDataCache {
    config: CacheConfig,
    vessels: RwLock<Arc<VesselSnapshot>>,
    conversion_factors: RwLock<Arc<Vec<ConversionFactorRecord>>>,
    exporter_behaviour: RwLock<Arc<Vec<ExporterBehaviourRecord>>>,
    vessels_of_interest: RwLock<Arc<HashSet<String>>>,
    weighting: RwLock<Arc<WeightingConfig>>,
    species_risk_toggle: RwLock<Arc<SpeciesRiskToggle>>,
    eod_settings: RwLock<Arc<Vec<EodSetting>>>,
    species_aliases: RwLock<Arc<HashMap<String, Vec<String>>>>,
}

/// Read the current snapshot pointer, recovering from lock poisoning (a
/// panicking writer cannot leave a snapshot half-written; the `Arc` swap is
/// the last thing a replace does).
fn snapshot<T>(lock: &RwLock<Arc<T>>) -> Arc<T> {
    match lock.read() {
        Ok(guard) => Arc::clone(&guard),
        Err(poisoned) => Arc::clone(&poisoned.into_inner()),
    }
}

fn swap<T>(lock: &RwLock<Arc<T>>, next: T) {
    let next = Arc::new(next);
    match lock.write() {
        Ok(mut guard) => *guard = next,
        Err(poisoned) => *poisoned.into_inner() = next,
    }
}

impl ReferenceDataCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            vessels: RwLock::new(Arc::new(VesselSnapshot::default())),
            conversion_factors: RwLock::new(Arc::new(Vec::new())),
            exporter_behaviour: RwLock::new(Arc::new(Vec::new())),
            vessels_of_interest: RwLock::new(Arc::new(HashSet::new())),
            weighting: RwLock::new(Arc::new(WeightingConfig::default())),
            species_risk_toggle: RwLock::new(Arc::new(SpeciesRiskToggle::default())),
            eod_settings: RwLock::new(Arc::new(Vec::new())),
            species_aliases: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    // -- refresh ------------------------------------------------------------

    /// Bulk-replace the categories present in `update`; absent categories are
    /// left untouched. Each category replace is a single reference swap.
    pub fn refresh(&self, update: ReferenceDataUpdate) {
        if let Some(mut vessels) = update.vessels {
            if self.config.add_vessel_not_found {
                vessels.push(VesselRecord::not_found_sentinel());
            }
            let index = VesselLicenceIndex::build(&vessels);
            info!(count = vessels.len(), "refreshed vessel cache");
            swap(&self.vessels, VesselSnapshot { vessels, index });
        }
        if let Some(factors) = update.conversion_factors {
            info!(count = factors.len(), "refreshed conversion factors");
            swap(&self.conversion_factors, factors);
        }
        if let Some(records) = update.exporter_behaviour {
            info!(count = records.len(), "refreshed exporter behaviour");
            swap(&self.exporter_behaviour, records);
        }
        if let Some(plns) = update.vessels_of_interest {
            info!(count = plns.len(), "refreshed vessels of interest");
            swap(&self.vessels_of_interest, plns);
        }
        if let Some(weighting) = update.weighting {
            swap(&self.weighting, weighting);
        }
        if let Some(toggle) = update.species_risk_toggle {
            swap(&self.species_risk_toggle, toggle);
        }
        if let Some(settings) = update.eod_settings {
            info!(count = settings.len(), "refreshed EOD settings");
            swap(&self.eod_settings, settings);
        }
        if let Some(aliases) = update.species_aliases {
            info!(count = aliases.len(), "refreshed species aliases");
            swap(&self.species_aliases, aliases);
        }
    }

    // -- snapshots ----------------------------------------------------------

    /// Current vessel snapshot (records plus licence index).
    pub fn vessels(&self) -> Arc<VesselSnapshot> {
        snapshot(&self.vessels)
    }

    /// Full conversion-factor snapshot, used when no product filter applies.
    pub fn all_conversion_factors(&self) -> Arc<Vec<ConversionFactorRecord>> {
        snapshot(&self.conversion_factors)
    }

    pub fn exporter_behaviour(&self) -> Arc<Vec<ExporterBehaviourRecord>> {
        snapshot(&self.exporter_behaviour)
    }

    pub fn weighting(&self) -> Arc<WeightingConfig> {
        snapshot(&self.weighting)
    }

    pub fn eod_settings(&self) -> Arc<Vec<EodSetting>> {
        snapshot(&self.eod_settings)
    }

    pub fn species_aliases(&self) -> Arc<HashMap<String, Vec<String>>> {
        snapshot(&self.species_aliases)
    }

    // -- lookups ------------------------------------------------------------

    /// Licence period covering `date` for a PLN, from the current vessel
    /// snapshot.
    pub fn vessel_by_pln(&self, pln: &str, date: CalendarDate) -> Option<LicencePeriod> {
        snapshot(&self.vessels).index.lookup(pln, date).cloned()
    }

    /// First exact match on (species, state, presentation) by linear scan.
    pub fn conversion_factor(
        &self,
        species: &str,
        state: &str,
        presentation: &str,
    ) -> Option<ConversionFactorRecord> {
        snapshot(&self.conversion_factors)
            .iter()
            .find(|r| r.species == species && r.state == state && r.presentation == presentation)
            .cloned()
    }

    /// Stored risk score for a species, else [`DEFAULT_SPECIES_RISK_SCORE`].
    pub fn species_risk_score(&self, species: &str) -> f64 {
        snapshot(&self.conversion_factors)
            .iter()
            .find(|r| r.species == species)
            .and_then(|r| r.risk_score)
            .unwrap_or(DEFAULT_SPECIES_RISK_SCORE)
    }

    /// Stored live-weight factor if present and non-zero, else
    /// [`DEFAULT_CONVERSION_FACTOR`].
    pub fn to_live_weight_factor(&self, species: &str, state: &str, presentation: &str) -> f64 {
        self.conversion_factor(species, state, presentation)
            .and_then(|r| r.to_live_weight_factor)
            .filter(|v| *v != 0.0)
            .unwrap_or(DEFAULT_CONVERSION_FACTOR)
    }

    pub fn is_vessel_of_interest(&self, pln: &str) -> bool {
        snapshot(&self.vessels_of_interest).contains(pln)
    }

    pub fn is_risk_enabled(&self) -> bool {
        snapshot(&self.species_risk_toggle).enabled
    }

    /// EOD setting for a devolved authority, if one exists.
    pub fn eod_setting(&self, da: &str) -> Option<EodSetting> {
        snapshot(&self.eod_settings)
            .iter()
            .find(|s| s.da == da)
            .cloned()
    }

    /// Known alias codes a landing may record the given species under.
    pub fn aliases_for(&self, species: &str) -> Vec<String> {
        snapshot(&self.species_aliases)
            .get(species)
            .cloned()
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
