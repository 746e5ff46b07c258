//! Postgres-backed implementation of the core `EodRepository` seam.

use catchcert_core::eod::{
    EodAudit, EodRepository, EodRule, EodRuleKey, EodSetting, VesselSizeGroup,
};
use catchcert_core::CoreError;

use crate::repositories::EodSettingRepo;
use crate::DbPool;

/// Adapts [`EodSettingRepo`] to the storage-agnostic repository trait the
/// EOD engine mutates through.
pub struct PgEodRepository {
    pool: DbPool,
}

impl PgEodRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn store_err(err: sqlx::Error) -> CoreError {
    CoreError::Store(err.to_string())
}

#[async_trait::async_trait]
impl EodRepository for PgEodRepository {
    async fn get_setting(&self, da: &str) -> Result<Option<EodSetting>, CoreError> {
        let row = EodSettingRepo::find_by_da(&self.pool, da)
            .await
            .map_err(store_err)?;
        Ok(row.map(EodSetting::from))
    }

    async fn replace_setting(
        &self,
        da: &str,
        vessel_sizes: &[VesselSizeGroup],
        rules: &[EodRule],
    ) -> Result<(), CoreError> {
        EodSettingRepo::upsert_setting(&self.pool, da, vessel_sizes, rules)
            .await
            .map_err(store_err)
    }

    async fn upsert_rule(
        &self,
        da: &str,
        key: EodRuleKey,
        rule: &EodRule,
    ) -> Result<(), CoreError> {
        // Read-modify-write of the whole rule document; the replace stays a
        // single-row update so no partial write is observable.
        let mut rules = EodSettingRepo::find_by_da(&self.pool, da)
            .await
            .map_err(store_err)?
            .map(|row| row.rules.0)
            .unwrap_or_default();
        rules.retain(|r| r.key() != key);
        rules.push(rule.clone());
        EodSettingRepo::replace_rules(&self.pool, da, &rules)
            .await
            .map_err(store_err)
    }

    async fn append_audit(&self, da: &str, entry: &EodAudit) -> Result<(), CoreError> {
        EodSettingRepo::append_audit(&self.pool, da, entry)
            .await
            .map_err(store_err)
    }
}
