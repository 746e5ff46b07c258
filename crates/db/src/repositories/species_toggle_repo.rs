//! Repository for the single-row `species_risk_toggle` table.

use sqlx::PgPool;

use crate::models::reference::SpeciesToggleRow;

/// Column list for species_risk_toggle queries.
const COLUMNS: &str = "enabled, updated_at";

/// Provides access to the species-risk toggle.
pub struct SpeciesToggleRepo;

impl SpeciesToggleRepo {
    /// Fetch the toggle, if one has been stored.
    pub async fn get(pool: &PgPool) -> Result<Option<SpeciesToggleRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM species_risk_toggle WHERE id = 1");
        sqlx::query_as::<_, SpeciesToggleRow>(&query)
            .fetch_optional(pool)
            .await
    }

    /// Set the toggle, creating the row on first write.
    pub async fn set(pool: &PgPool, enabled: bool) -> Result<SpeciesToggleRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO species_risk_toggle (id, enabled)
             VALUES (1, $1)
             ON CONFLICT (id) DO UPDATE
                SET enabled = EXCLUDED.enabled,
                    updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SpeciesToggleRow>(&query)
            .bind(enabled)
            .fetch_one(pool)
            .await
    }
}
