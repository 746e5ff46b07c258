//! Evidence-of-date (EOD) rule engine.
//!
//! Resolves, per devolved authority and vessel-size group, whether and when
//! landing data is expected to exist, and performs the administrative rule
//! mutations with an append-only audit trail. Read operations are pure
//! functions over the current EOD-settings snapshot; the write path goes
//! through a narrow repository seam so the engine has no storage dependency.

use chrono::Days;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{CalendarDate, Timestamp};
use crate::vessel::LicencePeriod;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Days added to a landing date by the seeded `expectedDate` rule.
pub const DEFAULT_EXPECTED_DATE_DAYS: i64 = 0;

/// Days added to the expected date by the seeded `endDate` rule, and the
/// offset applied to today when no `endDate` rule resolves.
pub const DEFAULT_END_DATE_DAYS: i64 = 14;

// ---------------------------------------------------------------------------
// Vessel size groups
// ---------------------------------------------------------------------------

/// Vessel-size buckets used by EOD rules, keyed by overall length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VesselSizeGroup {
    #[serde(rename = "Under 10m")]
    Under10m,
    #[serde(rename = "10-12m")]
    Between10And12m,
    #[serde(rename = "12m+")]
    Over12m,
}

impl VesselSizeGroup {
    /// Bucket a vessel length. Anything that is neither strictly under 10m
    /// nor strictly over 12m lands in the middle bucket, including an
    /// unknown length.
    pub fn from_length(length: Option<f64>) -> Self {
        match length {
            Some(l) if l < 10.0 => Self::Under10m,
            Some(l) if l > 12.0 => Self::Over12m,
            _ => Self::Between10And12m,
        }
    }

    /// Wire label as stored in settings documents.
    pub fn label(self) -> &'static str {
        match self {
            Self::Under10m => "Under 10m",
            Self::Between10And12m => "10-12m",
            Self::Over12m => "12m+",
        }
    }
}

// ---------------------------------------------------------------------------
// Rules, settings, audit
// ---------------------------------------------------------------------------

/// Kind of date an EOD rule produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EodRuleType {
    /// When landing data is first expected after the landing.
    ExpectedDate,
    /// Deadline for supplying landing data, relative to the expected date.
    EndDate,
}

/// Identity of a rule within a setting. At most one rule per key may exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EodRuleKey {
    pub rule_type: EodRuleType,
    pub vessel_size: VesselSizeGroup,
}

/// One EOD rule for a (rule type, vessel size) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EodRule {
    pub rule_type: EodRuleType,
    pub vessel_size: VesselSizeGroup,
    pub number_of_days: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_to: Option<String>,
}

impl EodRule {
    pub fn key(&self) -> EodRuleKey {
        EodRuleKey {
            rule_type: self.rule_type,
            vessel_size: self.vessel_size,
        }
    }
}

/// Immutable audit entry appended on every rule mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EodAudit {
    pub user: String,
    pub timestamp: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<EodRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vessel_sizes: Option<Vec<VesselSizeGroup>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_from: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_to: Option<serde_json::Value>,
}

/// EOD configuration for one devolved authority.
///
/// Invariant: at most one rule per `(rule_type, vessel_size)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EodSetting {
    pub da: String,
    pub vessel_sizes: Vec<VesselSizeGroup>,
    pub rules: Vec<EodRule>,
    #[serde(default)]
    pub audit: Vec<EodAudit>,
}

impl EodSetting {
    pub fn empty(da: &str) -> Self {
        Self {
            da: da.to_string(),
            vessel_sizes: Vec::new(),
            rules: Vec::new(),
            audit: Vec::new(),
        }
    }

    pub fn rule(&self, key: EodRuleKey) -> Option<&EodRule> {
        self.rules.iter().find(|r| r.key() == key)
    }
}

// ---------------------------------------------------------------------------
// Repository seam
// ---------------------------------------------------------------------------

/// Narrow persistence surface for EOD settings. Writes are single-document
/// upserts; concurrent writers to the same DA are ordered by the store.
#[async_trait::async_trait]
pub trait EodRepository: Send + Sync {
    async fn get_setting(&self, da: &str) -> Result<Option<EodSetting>, CoreError>;

    /// Replace the DA's vessel-size set and rule list wholesale, creating the
    /// setting if absent.
    async fn replace_setting(
        &self,
        da: &str,
        vessel_sizes: &[VesselSizeGroup],
        rules: &[EodRule],
    ) -> Result<(), CoreError>;

    /// Delete any rule sharing `key`, then insert `rule` (replace, not merge).
    async fn upsert_rule(&self, da: &str, key: EodRuleKey, rule: &EodRule)
        -> Result<(), CoreError>;

    async fn append_audit(&self, da: &str, entry: &EodAudit) -> Result<(), CoreError>;
}

// ---------------------------------------------------------------------------
// Read operations
// ---------------------------------------------------------------------------

fn setting_for<'a>(settings: &'a [EodSetting], da: &str) -> Option<&'a EodSetting> {
    settings.iter().find(|s| s.da == da)
}

fn rule_for<'a>(
    settings: &'a [EodSetting],
    da: &str,
    size: VesselSizeGroup,
    rule_type: EodRuleType,
) -> Option<&'a EodRule> {
    setting_for(settings, da)?.rule(EodRuleKey {
        rule_type,
        vessel_size: size,
    })
}

/// Whether landing data is ever expected for this licence: true iff the
/// licence's DA has a setting whose vessel sizes include the vessel's size
/// group.
pub fn data_ever_expected(licence: &LicencePeriod, settings: &[EodSetting]) -> bool {
    let size = VesselSizeGroup::from_length(licence.vessel_length);
    setting_for(settings, &licence.da).is_some_and(|s| s.vessel_sizes.contains(&size))
}

/// Resolve the rule-derived date for a landing.
///
/// With no matching rule, or an `endDate` request whose expected date is not
/// a syntactically valid calendar date, the context default applies: today
/// for `expectedDate`, today plus 14 calendar days for `endDate`. Otherwise
/// the base date (landing date for `expectedDate`, the supplied expected
/// date for `endDate`) advances by the rule's number of days.
pub fn landing_data_rule_date(
    landing_date: CalendarDate,
    licence: &LicencePeriod,
    rule_type: EodRuleType,
    landing_data_expected_date: Option<&str>,
    settings: &[EodSetting],
    today: CalendarDate,
) -> CalendarDate {
    let size = VesselSizeGroup::from_length(licence.vessel_length);
    let rule = rule_for(settings, &licence.da, size, rule_type);

    let base = match (rule, rule_type) {
        (Some(_), EodRuleType::ExpectedDate) => Some(landing_date),
        (Some(_), EodRuleType::EndDate) => landing_data_expected_date
            .and_then(|s| s.parse::<CalendarDate>().ok()),
        (None, _) => None,
    };

    match (rule, base) {
        (Some(rule), Some(base)) => add_days(base, rule.number_of_days),
        _ => match rule_type {
            EodRuleType::ExpectedDate => today,
            EodRuleType::EndDate => add_days(today, DEFAULT_END_DATE_DAYS),
        },
    }
}

/// Decide whether landing data should be available by `now`.
///
/// A legal obligation (`is_legally_due`) overrides the scheduling rule, and
/// a DA/size with no `expectedDate` rule is treated as available.
pub fn is_landing_data_available(
    licence: &LicencePeriod,
    landed_date: CalendarDate,
    is_legally_due: Option<bool>,
    settings: &[EodSetting],
    now: CalendarDate,
) -> bool {
    if !data_ever_expected(licence, settings) {
        return false;
    }
    if is_legally_due == Some(true) {
        return true;
    }
    let size = VesselSizeGroup::from_length(licence.vessel_length);
    match rule_for(settings, &licence.da, size, EodRuleType::ExpectedDate) {
        None => true,
        Some(rule) => now >= add_days(landed_date, rule.number_of_days),
    }
}

/// Saturating calendar-day arithmetic; rule offsets may be negative.
fn add_days(date: CalendarDate, days: i64) -> CalendarDate {
    if days >= 0 {
        date.checked_add_days(Days::new(days as u64))
            .unwrap_or(CalendarDate::MAX)
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
            .unwrap_or(CalendarDate::MIN)
    }
}

// ---------------------------------------------------------------------------
// Write path
// ---------------------------------------------------------------------------

/// Apply an administrative EOD mutation for one DA.
///
/// Exactly one of `vessel_sizes` (vessel-size replacement) or `rule`
/// (single-rule upsert) must be supplied. Each logical change appends exactly
/// one audit entry capturing the acting user and before/after values.
/// Returns the setting as persisted after the change.
pub async fn create_eod_rules(
    repo: &dyn EodRepository,
    user: &str,
    da: &str,
    vessel_sizes: Option<Vec<VesselSizeGroup>>,
    rule: Option<EodRule>,
    now: Timestamp,
) -> Result<EodSetting, CoreError> {
    match (vessel_sizes, rule) {
        (Some(sizes), None) => replace_vessel_sizes(repo, user, da, sizes, now).await,
        (None, Some(rule)) => upsert_single_rule(repo, user, da, rule, now).await,
        _ => Err(CoreError::Validation(
            "supply exactly one of vesselSizes or rule".to_string(),
        )),
    }
}

/// Vessel-size replacement: swap the DA's size set and seed default rules
/// for every newly-qualifying size group that has neither an `expectedDate`
/// nor an `endDate` rule yet.
async fn replace_vessel_sizes(
    repo: &dyn EodRepository,
    user: &str,
    da: &str,
    sizes: Vec<VesselSizeGroup>,
    now: Timestamp,
) -> Result<EodSetting, CoreError> {
    let existing = repo
        .get_setting(da)
        .await?
        .unwrap_or_else(|| EodSetting::empty(da));

    let mut rules = existing.rules.clone();
    for size in &sizes {
        let has_any_rule = rules.iter().any(|r| r.vessel_size == *size);
        if !has_any_rule {
            rules.push(default_rule(EodRuleType::ExpectedDate, *size));
            rules.push(default_rule(EodRuleType::EndDate, *size));
        }
    }

    repo.replace_setting(da, &sizes, &rules).await?;

    let audit = EodAudit {
        user: user.to_string(),
        timestamp: now,
        rule: None,
        changed_from: to_json(&existing.vessel_sizes),
        changed_to: to_json(&sizes),
        vessel_sizes: Some(sizes),
    };
    repo.append_audit(da, &audit).await?;

    fetch_setting(repo, da).await
}

/// Single-rule upsert: replace any rule with the same key, never merge.
async fn upsert_single_rule(
    repo: &dyn EodRepository,
    user: &str,
    da: &str,
    rule: EodRule,
    now: Timestamp,
) -> Result<EodSetting, CoreError> {
    let existing = repo
        .get_setting(da)
        .await?
        .unwrap_or_else(|| EodSetting::empty(da));
    let previous = existing.rule(rule.key()).cloned();

    repo.upsert_rule(da, rule.key(), &rule).await?;

    let audit = EodAudit {
        user: user.to_string(),
        timestamp: now,
        rule: Some(rule.clone()),
        vessel_sizes: None,
        changed_from: previous.as_ref().and_then(to_json),
        changed_to: to_json(&rule),
    };
    repo.append_audit(da, &audit).await?;

    fetch_setting(repo, da).await
}

fn default_rule(rule_type: EodRuleType, size: VesselSizeGroup) -> EodRule {
    EodRule {
        rule_type,
        vessel_size: size,
        number_of_days: match rule_type {
            EodRuleType::ExpectedDate => DEFAULT_EXPECTED_DATE_DAYS,
            EodRuleType::EndDate => DEFAULT_END_DATE_DAYS,
        },
        changed_from: None,
        changed_to: None,
    }
}

fn to_json<T: Serialize>(value: &T) -> Option<serde_json::Value> {
    serde_json::to_value(value).ok()
}

async fn fetch_setting(repo: &dyn EodRepository, da: &str) -> Result<EodSetting, CoreError> {
    repo.get_setting(da).await?.ok_or(CoreError::NotFound {
        entity: "eod_setting",
        key: da.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
