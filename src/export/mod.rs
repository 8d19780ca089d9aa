pub mod concordance;
pub mod genotypes;
pub mod outcomes;

use crate::artifact::UploadKind;
use crate::validation::{ArtifactOutcome, OutcomeDetail};
use chrono::{DateTime, Utc};
use serde::de::{Deserializer, Error};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

pub const RECORD_TYPE: &str = "progen.upload.outcome";
pub const RECORD_VERSION: &str = "1";

/// One persisted status row: what the external table stores per upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    #[serde(rename = "$type")]
    pub record_type: String,
    pub version: String,
    #[serde(serialize_with = "serialize_datetime", deserialize_with = "deserialize_datetime")]
    pub created_at: DateTime<Utc>,
    pub tool_version: String,

    pub upload_id: String,
    pub kind: String,
    pub file_name: String,
    pub digest: String,
    pub code: String,
    pub bit_ok: u8,
    pub bit_elaborato: u8,
    pub message: String,
    #[serde(default)]
    pub milestones: Vec<String>,
    /// Load summary or rejection diagnostics.
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_id: Option<String>,
}

impl OutcomeRecord {
    pub fn from_outcome(outcome: &ArtifactOutcome, created_at: DateTime<Utc>) -> Self {
        let map_id = outcome.detail.as_ref().map(|detail| match detail {
            OutcomeDetail::MapAdmitted { map_id, .. }
            | OutcomeDetail::GenotypesLoaded { map_id, .. }
            | OutcomeDetail::MapMismatch { map_id, .. } => map_id.to_string(),
        });
        Self {
            record_type: RECORD_TYPE.to_string(),
            version: RECORD_VERSION.to_string(),
            created_at,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            upload_id: outcome.upload_id.clone(),
            kind: match outcome.kind {
                UploadKind::Map => "M".to_string(),
                UploadKind::Genotype => "G".to_string(),
            },
            file_name: outcome.file_name.clone(),
            digest: outcome.digest.clone(),
            code: outcome.status.code.clone(),
            bit_ok: outcome.status.bit_ok(),
            bit_elaborato: outcome.status.bit_elaborato(),
            message: outcome.status.message.clone(),
            milestones: outcome.milestones.iter().map(|m| m.code.clone()).collect(),
            notes: outcome.processing_notes(),
            map_id,
        }
    }
}

fn serialize_datetime<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&date.to_rfc3339())
}

fn deserialize_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(D::Error::custom)
}
