//! Reference-data refresh orchestration.
//!
//! Pulls every store-backed category plus the loader-backed bulk categories
//! and hands them to the cache in one `refresh` call; each category still
//! swaps independently inside the cache. Errors propagate to the caller,
//! which owns retry/abort policy and must serialize refresh invocations.

use std::collections::HashSet;

use catchcert_core::eod::EodSetting;
use catchcert_core::reference::{ReferenceDataCache, ReferenceDataLoader, ReferenceDataUpdate};
use catchcert_core::CoreError;
use tracing::{error, info};

use crate::repositories::{
    EodSettingRepo, SpeciesToggleRepo, VesselOfInterestRepo, WeightingRepo,
};
use crate::DbPool;

fn store_err(err: sqlx::Error) -> CoreError {
    CoreError::Store(err.to_string())
}

/// Refresh every reference-data category from its source.
///
/// Loader categories returning `None` are left untouched in the cache;
/// store-backed categories are always replaced with the current rows.
pub async fn refresh_reference_data(
    pool: &DbPool,
    loader: &dyn ReferenceDataLoader,
    cache: &ReferenceDataCache,
) -> Result<(), CoreError> {
    let vessels = loader.load_vessels().await.inspect_err(log_load_failure)?;
    let conversion_factors = loader
        .load_conversion_factors()
        .await
        .inspect_err(log_load_failure)?;
    let exporter_behaviour = loader
        .load_exporter_behaviour()
        .await
        .inspect_err(log_load_failure)?;
    let species_aliases = loader
        .load_species_aliases()
        .await
        .inspect_err(log_load_failure)?;

    let vessels_of_interest: HashSet<String> = VesselOfInterestRepo::list_all(pool)
        .await
        .map_err(store_err)?
        .into_iter()
        .map(|v| v.registration_number)
        .collect();

    let weighting = WeightingRepo::get(pool)
        .await
        .map_err(store_err)?
        .map(Into::into);

    let species_risk_toggle = SpeciesToggleRepo::get(pool)
        .await
        .map_err(store_err)?
        .map(Into::into);

    let eod_settings: Vec<EodSetting> = EodSettingRepo::list_all(pool)
        .await
        .map_err(store_err)?
        .into_iter()
        .map(Into::into)
        .collect();

    cache.refresh(ReferenceDataUpdate {
        vessels,
        conversion_factors,
        exporter_behaviour,
        vessels_of_interest: Some(vessels_of_interest),
        weighting,
        species_risk_toggle,
        eod_settings: Some(eod_settings),
        species_aliases,
    });
    info!("reference data refresh complete");
    Ok(())
}

fn log_load_failure(err: &CoreError) {
    error!(%err, "reference data load failed");
}
