//! Repository for the single-row `risk_weightings` table.

use catchcert_core::reference::WeightingConfig;
use sqlx::PgPool;

use crate::models::reference::WeightingRow;

/// Column list for risk_weightings queries.
const COLUMNS: &str = "vessel_weight, species_weight, exporter_weight, threshold, updated_at";

/// Provides access to the risk-weighting configuration.
pub struct WeightingRepo;

impl WeightingRepo {
    /// Fetch the current weighting config, if one has been stored.
    pub async fn get(pool: &PgPool) -> Result<Option<WeightingRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM risk_weightings WHERE id = 1");
        sqlx::query_as::<_, WeightingRow>(&query)
            .fetch_optional(pool)
            .await
    }

    /// Administrative update of the weighting config, creating the row on
    /// first write.
    pub async fn update(
        pool: &PgPool,
        config: &WeightingConfig,
    ) -> Result<WeightingRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO risk_weightings
                (id, vessel_weight, species_weight, exporter_weight, threshold)
             VALUES (1, $1, $2, $3, $4)
             ON CONFLICT (id) DO UPDATE
                SET vessel_weight = EXCLUDED.vessel_weight,
                    species_weight = EXCLUDED.species_weight,
                    exporter_weight = EXCLUDED.exporter_weight,
                    threshold = EXCLUDED.threshold,
                    updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WeightingRow>(&query)
            .bind(config.vessel_weight)
            .bind(config.species_weight)
            .bind(config.exporter_weight)
            .bind(config.threshold)
            .fetch_one(pool)
            .await
    }
}
