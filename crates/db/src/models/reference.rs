//! Rows for the store-backed reference-data categories.

use catchcert_core::reference::{SpeciesRiskToggle, WeightingConfig};
use catchcert_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `vessels_of_interest` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct VesselOfInterest {
    pub registration_number: String,
    pub fishing_vessel_name: String,
    pub home_port: Option<String>,
    pub da: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// The single row of the `risk_weightings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WeightingRow {
    pub vessel_weight: f64,
    pub species_weight: f64,
    pub exporter_weight: f64,
    pub threshold: f64,
    pub updated_at: Timestamp,
}

impl From<WeightingRow> for WeightingConfig {
    fn from(row: WeightingRow) -> Self {
        WeightingConfig {
            vessel_weight: row.vessel_weight,
            species_weight: row.species_weight,
            exporter_weight: row.exporter_weight,
            threshold: row.threshold,
        }
    }
}

/// The single row of the `species_risk_toggle` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SpeciesToggleRow {
    pub enabled: bool,
    pub updated_at: Timestamp,
}

impl From<SpeciesToggleRow> for SpeciesRiskToggle {
    fn from(row: SpeciesToggleRow) -> Self {
        SpeciesRiskToggle {
            enabled: row.enabled,
        }
    }
}
