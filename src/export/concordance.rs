use crate::error::PedigreeError;
use crate::pedigree::{ConcordanceResult, PedigreeClaim, Relationship};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Claim table row: `child;sire;dam;relationship`. Empty parent cells are skipped.
#[derive(Debug, Deserialize)]
struct ClaimRow {
    child: String,
    #[serde(default)]
    sire: Option<String>,
    #[serde(default)]
    dam: Option<String>,
    #[serde(default)]
    relationship: Option<Relationship>,
}

impl ClaimRow {
    fn into_claim(self) -> PedigreeClaim {
        let sire = self.sire.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let dam = self.dam.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let relationship = self.relationship.unwrap_or(match (&sire, &dam) {
            (Some(_), Some(_)) => Relationship::Parents,
            (None, Some(_)) => Relationship::Dam,
            _ => Relationship::Sire,
        });
        PedigreeClaim {
            child: self.child.trim().to_string(),
            parents: sire.into_iter().chain(dam).collect(),
            relationship,
        }
    }
}

pub fn read_claims(path: &Path) -> Result<Vec<PedigreeClaim>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open claims {}", path.display()))?;
    reader
        .deserialize::<ClaimRow>()
        .enumerate()
        .map(|(idx, row)| {
            row.map(ClaimRow::into_claim)
                .with_context(|| format!("{}: invalid claim on row {}", path.display(), idx + 1))
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct ResultRow<'a> {
    child: &'a str,
    parents: String,
    relationship: String,
    compared: Option<usize>,
    concordant: Option<usize>,
    discordant: Option<usize>,
    discordance: Option<f64>,
    verdict: String,
}

pub fn write_results(
    path: &Path,
    claims: &[PedigreeClaim],
    results: &[Result<ConcordanceResult, PedigreeError>],
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for (claim, result) in claims.iter().zip(results) {
        let row = match result {
            Ok(result) => ResultRow {
                child: &claim.child,
                parents: claim.parents.join(","),
                relationship: claim.relationship.to_string(),
                compared: Some(result.compared),
                concordant: Some(result.concordant),
                discordant: Some(result.discordant),
                discordance: Some((result.discordance_rate() * 10_000.0).round() / 10_000.0),
                verdict: result.verdict.to_string(),
            },
            Err(e) => ResultRow {
                child: &claim.child,
                parents: claim.parents.join(","),
                relationship: claim.relationship.to_string(),
                compared: None,
                concordant: None,
                discordant: None,
                discordance: None,
                verdict: e.to_string(),
            },
        };
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
