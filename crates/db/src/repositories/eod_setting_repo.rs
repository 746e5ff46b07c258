//! Repository for the `eod_settings` table.
//!
//! Each devolved authority owns exactly one row; rule and audit writes are
//! single-row JSONB updates, so concurrent writers to the same DA are
//! ordered by the database rather than by the engine.

use catchcert_core::eod::{EodAudit, EodRule, VesselSizeGroup};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::eod_setting::EodSettingRow;

/// Column list for eod_settings queries.
const COLUMNS: &str = "da, vessel_sizes, rules, audit, created_at, updated_at";

/// Provides read/write operations for EOD settings.
pub struct EodSettingRepo;

impl EodSettingRepo {
    /// Find the setting for a devolved authority.
    pub async fn find_by_da(pool: &PgPool, da: &str) -> Result<Option<EodSettingRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM eod_settings WHERE da = $1");
        sqlx::query_as::<_, EodSettingRow>(&query)
            .bind(da)
            .fetch_optional(pool)
            .await
    }

    /// List all settings, ordered by DA for stable refresh snapshots.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<EodSettingRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM eod_settings ORDER BY da ASC");
        sqlx::query_as::<_, EodSettingRow>(&query)
            .fetch_all(pool)
            .await
    }

    /// Replace the vessel-size set and rule list for a DA, creating the row
    /// if absent. The audit trail is untouched.
    pub async fn upsert_setting(
        pool: &PgPool,
        da: &str,
        vessel_sizes: &[VesselSizeGroup],
        rules: &[EodRule],
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO eod_settings (da, vessel_sizes, rules, audit)
             VALUES ($1, $2, $3, '[]'::jsonb)
             ON CONFLICT (da) DO UPDATE
                SET vessel_sizes = EXCLUDED.vessel_sizes,
                    rules = EXCLUDED.rules,
                    updated_at = NOW()",
        )
        .bind(da)
        .bind(Json(vessel_sizes))
        .bind(Json(rules))
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Replace the rule list for a DA, creating the row if absent.
    pub async fn replace_rules(
        pool: &PgPool,
        da: &str,
        rules: &[EodRule],
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO eod_settings (da, vessel_sizes, rules, audit)
             VALUES ($1, '[]'::jsonb, $2, '[]'::jsonb)
             ON CONFLICT (da) DO UPDATE
                SET rules = EXCLUDED.rules,
                    updated_at = NOW()",
        )
        .bind(da)
        .bind(Json(rules))
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Append one audit entry to the DA's trail. Entries are never updated
    /// or removed afterwards.
    pub async fn append_audit(
        pool: &PgPool,
        da: &str,
        entry: &EodAudit,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE eod_settings
                SET audit = audit || $2::jsonb,
                    updated_at = NOW()
              WHERE da = $1",
        )
        .bind(da)
        .bind(Json(entry))
        .execute(pool)
        .await?;
        Ok(())
    }
}
