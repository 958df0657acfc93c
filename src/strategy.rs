//! # Migration Strategies
//!
//! The pluggable eligibility-plus-transform capability applied to every case,
//! and the campaigns shipped with the tool. Strategies are pure: no side
//! effects, called synchronously on whichever task owns the record.

use serde_json::{Map, Value};

use crate::error::{MigrationError, Result};
use crate::query;
use crate::record::CaseRecord;

/// Eligibility predicate plus data transformation for one migration campaign.
///
/// `accepts` decides whether a record still needs migrating; records it
/// rejects are skipped without an outcome. `migrate` receives the case data
/// by value and returns the transformed payload.
pub trait MigrationStrategy: Send + Sync {
    fn accepts(&self, record: &CaseRecord) -> bool;

    fn migrate(&self, data: Map<String, Value>) -> Map<String, Value>;
}

const GENERAL_EMAIL_FIELDS: [&str; 4] = [
    "generalEmailRecipient",
    "generalEmailCreatedBy",
    "generalEmailUploadedDocument",
    "generalEmailBody",
];

/// Removes the legacy general-email fields from case data.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneralEmailCleanup;

impl MigrationStrategy for GeneralEmailCleanup {
    fn accepts(&self, record: &CaseRecord) -> bool {
        GENERAL_EMAIL_FIELDS
            .iter()
            .any(|field| record.data.contains_key(*field))
    }

    fn migrate(&self, mut data: Map<String, Value>) -> Map<String, Value> {
        for field in GENERAL_EMAIL_FIELDS {
            data.remove(field);
        }
        data
    }
}

const HANDED_OFF_FIELD: &str = "caseHandedOffToLegacySite";

/// Stamps `caseHandedOffToLegacySite` from the legacy-site hand-off rule
/// table. Applies to every case; the rules only decide the flag value.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyHandoffFlag;

impl LegacyHandoffFlag {
    fn handed_off(data: &Map<String, Value>) -> bool {
        let is = |key: &str, value: &str| data.get(key) == Some(&Value::String(value.into()));
        let case_type_in = |values: &[&str]| values.iter().any(|value| is("caseType", value));

        if is("applicationType", "Solicitor") {
            if is("titleAndClearingType", "TCTTrustCorpResWithSDJ")
                || is("titleAndClearingType", "TCTTrustCorpResWithApp")
            {
                return true;
            }
            if case_type_in(&["gop", "admonWill", "intestacy"])
                && is("deceasedDomicileInEngWales", "No")
            {
                return true;
            }
            if case_type_in(&["gop", "admonWill", "intestacy"])
                && is("willAccessOriginal", "No")
                && is("willAccessNotarial", "Yes")
            {
                return true;
            }
            if is("caseType", "intestacy") && is("solsApplicantRelationshipToDeceased", "Yes") {
                return true;
            }
        }
        if is("applicationType", "Personal")
            && is("caseType", "intestacy")
            && is("primaryApplicantRelationshipToDeceased", "adoptedChild")
            && is("primaryApplicantAdoptionInEnglandOrWales", "Yes")
        {
            return true;
        }
        false
    }
}

impl MigrationStrategy for LegacyHandoffFlag {
    fn accepts(&self, _record: &CaseRecord) -> bool {
        true
    }

    fn migrate(&self, mut data: Map<String, Value>) -> Map<String, Value> {
        let flag = if Self::handed_off(&data) { "Yes" } else { "No" };
        data.insert(HANDED_OFF_FIELD.to_string(), Value::String(flag.to_string()));
        data
    }
}

/// Campaign selected at startup. Exactly one must be chosen per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationCampaign {
    GeneralEmailCleanup,
    LegacyHandoffFlag,
}

impl MigrationCampaign {
    /// Resolve the campaign from runner flags; selecting none or several is a
    /// configuration error raised before any fetching begins.
    pub fn from_flags(general_email_cleanup: bool, legacy_handoff_flag: bool) -> Result<Self> {
        match (general_email_cleanup, legacy_handoff_flag) {
            (true, false) => Ok(Self::GeneralEmailCleanup),
            (false, true) => Ok(Self::LegacyHandoffFlag),
            (false, false) => Err(MigrationError::Configuration(
                "a migration campaign flag is required".to_string(),
            )),
            (true, true) => Err(MigrationError::Configuration(
                "only a single migration campaign at once is allowed".to_string(),
            )),
        }
    }

    pub fn strategy(&self) -> std::sync::Arc<dyn MigrationStrategy> {
        match self {
            Self::GeneralEmailCleanup => std::sync::Arc::new(GeneralEmailCleanup),
            Self::LegacyHandoffFlag => std::sync::Arc::new(LegacyHandoffFlag),
        }
    }

    /// Search filter selecting the cases this campaign still applies to.
    pub fn search_filter(&self) -> Value {
        match self {
            Self::GeneralEmailCleanup => query::exists_any_query(&GENERAL_EMAIL_FIELDS),
            Self::LegacyHandoffFlag => query::missing_field_query(HANDED_OFF_FIELD),
        }
    }
}
