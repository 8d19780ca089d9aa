use crate::artifact::UploadKind;
use crate::genotype::SampleGenotypes;
use crate::map_registry::{MapId, MapProvenance, Resolution};
use crate::status::{StatusCode, StatusKey};
use serde::Serialize;
use std::fmt;

/// Samples listed by name in a load summary.
const SUMMARY_LISTED: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

/// What a successful genotype load will change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub ready: usize,
    pub overwritten: usize,
    pub first_overwritten: Vec<String>,
}

impl LoadSummary {
    pub fn new(ready: usize, replaced: &[String]) -> Self {
        Self {
            ready,
            overwritten: replaced.len(),
            first_overwritten: replaced.iter().take(SUMMARY_LISTED).cloned().collect(),
        }
    }
}

impl fmt::Display for LoadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} genotypes ready to be uploaded. ", self.ready)?;
        if self.overwritten == 0 {
            write!(f, "0 samples with existing genotype will be overwritten.")
        } else {
            write!(
                f,
                "{} samples with existing genotype will be overwritten, the first {} are: {}",
                self.overwritten,
                self.first_overwritten.len(),
                self.first_overwritten.join(", ")
            )
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeDetail {
    MapAdmitted {
        map_id: MapId,
        provenance: MapProvenance,
        snps: usize,
    },
    GenotypesLoaded {
        map_id: MapId,
        resolved_by: Resolution,
        summary: LoadSummary,
    },
    MapMismatch {
        map_id: MapId,
        expected: usize,
        found: usize,
        missing: usize,
        unexpected: usize,
    },
}

/// The single status assigned to one upload attempt, with its trail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactOutcome {
    pub upload_id: String,
    pub kind: UploadKind,
    pub file_name: String,
    /// SHA-256 of the uploaded entries.
    pub digest: String,
    pub status: StatusCode,
    /// Intermediate codes reached before `status`, e.g. `g_D` before `g_I`.
    pub milestones: Vec<StatusCode>,
    pub diagnostics: Vec<Diagnostic>,
    pub detail: Option<OutcomeDetail>,
    #[serde(skip)]
    pub genotypes: Vec<SampleGenotypes>,
}

impl ArtifactOutcome {
    pub fn is_success(&self) -> bool {
        self.status.success
    }

    pub fn code(&self) -> &str {
        &self.status.code
    }

    pub fn has_milestone(&self, key: StatusKey) -> bool {
        self.milestones.iter().any(|m| m.code == key.as_str())
    }

    /// Free-text error column: the load summary on success, else the diagnostics.
    pub fn processing_notes(&self) -> String {
        if let Some(OutcomeDetail::GenotypesLoaded { summary, .. }) = &self.detail {
            return summary.to_string();
        }
        self.diagnostics
            .iter()
            .map(|d| d.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// A terminal, non-success condition.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Rejection {
    pub(crate) key: StatusKey,
    pub(crate) reason: String,
    pub(crate) detail: Option<OutcomeDetail>,
}

impl Rejection {
    pub(crate) fn new(key: StatusKey, reason: impl Into<String>) -> Self {
        Self {
            key,
            reason: reason.into(),
            detail: None,
        }
    }

    pub(crate) fn with_detail(mut self, detail: OutcomeDetail) -> Self {
        self.detail = Some(detail);
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Accepted {
    pub(crate) key: StatusKey,
    pub(crate) milestones: Vec<StatusKey>,
    pub(crate) detail: OutcomeDetail,
    pub(crate) genotypes: Vec<SampleGenotypes>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lists_at_most_ten_samples() {
        let replaced: Vec<String> = (0..12).map(|i| format!("S{:02}", i)).collect();
        let summary = LoadSummary::new(30, &replaced);
        assert_eq!(summary.overwritten, 12);
        assert_eq!(summary.first_overwritten.len(), 10);
        let text = summary.to_string();
        assert!(text.starts_with("30 genotypes ready to be uploaded."));
        assert!(text.contains("S09"));
        assert!(!text.contains("S10"));
    }

    #[test]
    fn initial_load_summary() {
        let summary = LoadSummary::new(2, &[]);
        assert_eq!(
            summary.to_string(),
            "2 genotypes ready to be uploaded. 0 samples with existing genotype will be overwritten."
        );
    }
}
