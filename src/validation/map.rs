use super::outcome::{Accepted, OutcomeDetail, Rejection};
use super::ValidationEngine;
use crate::artifact::{entry_text, ArtifactEntry, Classification, UploadedArtifact, MAP_KEY_COLUMN};
use crate::error::RegistryError;
use crate::map_registry::MapProvenance;
use crate::status::StatusKey;
use std::collections::HashSet;
use tracing::debug;

const INDEX_COLUMN: &str = "Index";

impl ValidationEngine {
    pub(super) fn validate_map(
        &self,
        artifact: &UploadedArtifact,
        entry: &ArtifactEntry,
        classification: &Classification,
    ) -> Result<Accepted, Rejection> {
        let layout = classification
            .layout
            .as_ref()
            .ok_or_else(|| Rejection::new(StatusKey::m_B, "map has no table"))?;
        let name_col = layout.column(MAP_KEY_COLUMN);
        let (Some(_), Some(name_col)) = (layout.column(INDEX_COLUMN), name_col) else {
            return Err(Rejection::new(
                StatusKey::m_B,
                format!("map header lacks {} or {} column", INDEX_COLUMN, MAP_KEY_COLUMN),
            ));
        };

        let text = entry_text(entry).map_err(|e| Rejection::new(StatusKey::m_B, e.to_string()))?;
        let mut snps = Vec::new();
        let mut seen = HashSet::new();
        for (line_no, line) in text
            .lines()
            .enumerate()
            .skip(layout.header_line + 1)
            .filter(|(_, line)| !line.trim().is_empty())
        {
            let fields = layout.delimiter.split(line);
            if fields.len() != layout.columns.len() {
                return Err(Rejection::new(
                    StatusKey::m_B,
                    format!("line {}: expected {} fields, found {}", line_no + 1, layout.columns.len(), fields.len()),
                ));
            }
            let snp = fields[name_col].to_uppercase();
            if snp.is_empty() {
                return Err(Rejection::new(StatusKey::m_A, format!("line {}: empty SNP name", line_no + 1)));
            }
            if !seen.insert(snp.clone()) {
                return Err(Rejection::new(StatusKey::m_A, format!("duplicate SNP {}", snp)));
            }
            snps.push(snp);
        }
        if snps.is_empty() {
            return Err(Rejection::new(StatusKey::m_A, "map lists no SNPs"));
        }

        let count = snps.len();
        debug!(upload = %artifact.upload_id, snps = count, "map parsed");
        let admission = self
            .maps
            .admit(
                snps,
                artifact.provenance.chip_id.clone(),
                artifact.provenance.map_id.clone(),
            )
            .map_err(|e| match e {
                RegistryError::DuplicateSnp { .. } => Rejection::new(StatusKey::m_A, e.to_string()),
                other => Rejection::new(StatusKey::m_B, other.to_string()),
            })?;

        let key = match admission.provenance {
            MapProvenance::Existing => StatusKey::m_D,
            MapProvenance::New => StatusKey::m_E,
            MapProvenance::CountCollision => StatusKey::m_F,
        };
        Ok(Accepted {
            key,
            milestones: Vec::new(),
            detail: OutcomeDetail::MapAdmitted {
                map_id: admission.map_id,
                provenance: admission.provenance,
                snps: count,
            },
            genotypes: Vec::new(),
        })
    }
}
