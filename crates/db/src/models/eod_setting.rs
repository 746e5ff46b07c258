//! EOD setting rows. One row per devolved authority; the vessel-size set,
//! rule list, and audit trail are stored as JSONB documents so a rule write
//! stays a single-row update.

use catchcert_core::eod::{EodAudit, EodRule, EodSetting, VesselSizeGroup};
use catchcert_core::types::Timestamp;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `eod_settings` table.
#[derive(Debug, Clone, FromRow)]
pub struct EodSettingRow {
    pub da: String,
    pub vessel_sizes: Json<Vec<VesselSizeGroup>>,
    pub rules: Json<Vec<EodRule>>,
    pub audit: Json<Vec<EodAudit>>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<EodSettingRow> for EodSetting {
    fn from(row: EodSettingRow) -> Self {
        EodSetting {
            da: row.da,
            vessel_sizes: row.vessel_sizes.0,
            rules: row.rules.0,
            audit: row.audit.0,
        }
    }
}
