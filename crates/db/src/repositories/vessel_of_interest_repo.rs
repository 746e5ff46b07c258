//! Repository for the `vessels_of_interest` table.

use sqlx::PgPool;

use crate::models::reference::VesselOfInterest;

/// Column list for vessels_of_interest queries.
const COLUMNS: &str =
    "registration_number, fishing_vessel_name, home_port, da, created_at, updated_at";

/// Provides read and administrative-delete operations for vessels of
/// interest.
pub struct VesselOfInterestRepo;

impl VesselOfInterestRepo {
    /// List every vessel of interest, ordered by registration number.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<VesselOfInterest>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM vessels_of_interest ORDER BY registration_number ASC");
        sqlx::query_as::<_, VesselOfInterest>(&query)
            .fetch_all(pool)
            .await
    }

    /// Insert a vessel of interest, returning the created row.
    pub async fn create(
        pool: &PgPool,
        registration_number: &str,
        fishing_vessel_name: &str,
        home_port: Option<&str>,
        da: Option<&str>,
    ) -> Result<VesselOfInterest, sqlx::Error> {
        let query = format!(
            "INSERT INTO vessels_of_interest
                (registration_number, fishing_vessel_name, home_port, da)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, VesselOfInterest>(&query)
            .bind(registration_number)
            .bind(fishing_vessel_name)
            .bind(home_port)
            .bind(da)
            .fetch_one(pool)
            .await
    }

    /// Administrative delete by registration number. Returns whether a row
    /// was removed.
    pub async fn delete(pool: &PgPool, registration_number: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM vessels_of_interest WHERE registration_number = $1")
            .bind(registration_number)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
