//! Per-upload validation: one pass, terminal on the first disqualifying
//! condition, always ending in exactly one catalog status.

mod final_report;
mod map;
mod outcome;

pub use outcome::{ArtifactOutcome, Diagnostic, LoadSummary, OutcomeDetail, Severity};

use crate::artifact::{ArtifactEntry, Classifier, Delimiter, UploadKind, UploadedArtifact};
use crate::config::Config;
use crate::error::{ClassifyError, ConfigError};
use crate::genotype::{GenotypeDecoder, GenotypeStore};
use crate::map_registry::MapRegistry;
use crate::status::{StatusKey, StatusRegistry};
use outcome::{Accepted, Rejection};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Final-report rules that come from configuration.
#[derive(Debug, Clone)]
pub struct ReportRules {
    pub genotype_prefixes: Vec<String>,
    pub chip_delimiters: BTreeMap<String, Vec<Delimiter>>,
    pub max_sample_id_len: usize,
}

impl Default for ReportRules {
    fn default() -> Self {
        Self {
            genotype_prefixes: vec!["GEN_".to_string(), "G_".to_string()],
            chip_delimiters: BTreeMap::new(),
            max_sample_id_len: 25,
        }
    }
}

impl ReportRules {
    fn from_config(config: &Config) -> Self {
        Self {
            genotype_prefixes: config.genotype_prefixes.clone(),
            chip_delimiters: config
                .chip_delimiters
                .iter()
                .map(|(chip, list)| (chip.clone(), list.iter().map(Delimiter::new).collect()))
                .collect(),
            max_sample_id_len: config.max_sample_id_len,
        }
    }
}

pub struct ValidationEngine {
    statuses: Arc<StatusRegistry>,
    decoder: GenotypeDecoder,
    classifier: Classifier,
    rules: ReportRules,
    maps: Arc<MapRegistry>,
    store: Arc<GenotypeStore>,
}

impl ValidationEngine {
    pub fn new(
        statuses: Arc<StatusRegistry>,
        decoder: GenotypeDecoder,
        classifier: Classifier,
        rules: ReportRules,
        maps: Arc<MapRegistry>,
        store: Arc<GenotypeStore>,
    ) -> Self {
        Self {
            statuses,
            decoder,
            classifier,
            rules,
            maps,
            store,
        }
    }

    pub fn from_config(
        config: &Config,
        statuses: Arc<StatusRegistry>,
        maps: Arc<MapRegistry>,
        store: Arc<GenotypeStore>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(
            statuses,
            config.decoder()?,
            config.classifier(),
            ReportRules::from_config(config),
            maps,
            store,
        ))
    }

    pub fn maps(&self) -> &Arc<MapRegistry> {
        &self.maps
    }

    pub fn store(&self) -> &Arc<GenotypeStore> {
        &self.store
    }

    pub fn statuses(&self) -> &StatusRegistry {
        &self.statuses
    }

    pub fn validate(&self, artifact: &UploadedArtifact) -> ArtifactOutcome {
        let mut diagnostics = Vec::new();
        match self.run(artifact, &mut diagnostics) {
            Ok(accepted) => {
                info!(
                    upload = %artifact.upload_id,
                    file = %artifact.file_name,
                    status = %accepted.key,
                    "upload accepted"
                );
                ArtifactOutcome {
                    upload_id: artifact.upload_id.clone(),
                    kind: artifact.kind,
                    file_name: artifact.normalized_file_name(),
                    digest: artifact.digest(),
                    status: self.statuses.get(accepted.key).clone(),
                    milestones: accepted
                        .milestones
                        .iter()
                        .map(|key| self.statuses.get(*key).clone())
                        .collect(),
                    diagnostics,
                    detail: Some(accepted.detail),
                    genotypes: accepted.genotypes,
                }
            }
            Err(rejection) => {
                warn!(
                    upload = %artifact.upload_id,
                    file = %artifact.file_name,
                    status = %rejection.key,
                    reason = %rejection.reason,
                    "upload rejected"
                );
                diagnostics.push(Diagnostic::error(rejection.reason));
                self.rejected(artifact, rejection.key, diagnostics, rejection.detail)
            }
        }
    }

    /// Outcome for an upload whose validation could not run to completion.
    pub fn unprocessable(&self, artifact: &UploadedArtifact, reason: impl Into<String>) -> ArtifactOutcome {
        self.rejected(
            artifact,
            StatusKey::c_B,
            vec![Diagnostic::error(reason)],
            None,
        )
    }

    fn rejected(
        &self,
        artifact: &UploadedArtifact,
        key: StatusKey,
        diagnostics: Vec<Diagnostic>,
        detail: Option<OutcomeDetail>,
    ) -> ArtifactOutcome {
        ArtifactOutcome {
            upload_id: artifact.upload_id.clone(),
            kind: artifact.kind,
            file_name: artifact.normalized_file_name(),
            digest: artifact.digest(),
            status: self.statuses.get(key).clone(),
            milestones: Vec::new(),
            diagnostics,
            detail,
            genotypes: Vec::new(),
        }
    }

    fn run(&self, artifact: &UploadedArtifact, diagnostics: &mut Vec<Diagnostic>) -> Result<Accepted, Rejection> {
        let entry = single_entry(artifact)?;
        let classification = self
            .classifier
            .classify(entry)
            .map_err(|e| Rejection::new(classify_status(&e), e.to_string()))?;

        let declared = artifact.kind.category();
        if classification.category != declared {
            return Err(Rejection::new(
                StatusKey::c_A,
                format!(
                    "declared as {} but content is a {}",
                    declared, classification.category
                ),
            ));
        }

        match artifact.kind {
            UploadKind::Map => self.validate_map(artifact, entry, &classification),
            UploadKind::Genotype => self.validate_report(artifact, entry, &classification, diagnostics),
        }
    }
}

fn single_entry(artifact: &UploadedArtifact) -> Result<&ArtifactEntry, Rejection> {
    match artifact.entries.as_slice() {
        [entry] => Ok(entry),
        entries => {
            let key = match artifact.kind {
                UploadKind::Map => StatusKey::m_C,
                UploadKind::Genotype => StatusKey::g_H,
            };
            Err(Rejection::new(
                key,
                format!("expected exactly one file in upload, found {}", entries.len()),
            ))
        }
    }
}

fn classify_status(error: &ClassifyError) -> StatusKey {
    match error {
        ClassifyError::Empty | ClassifyError::Unreadable => StatusKey::c_B,
        ClassifyError::MissingHeader
        | ClassifyError::AmbiguousFormat(_)
        | ClassifyError::NoDelimiterMatch => StatusKey::c_A,
    }
}
