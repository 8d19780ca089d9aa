use super::outcome::{Accepted, Diagnostic, LoadSummary, OutcomeDetail, Rejection};
use super::ValidationEngine;
use crate::artifact::{
    entry_text, ArtifactEntry, Classification, TableLayout, UploadedArtifact, REPORT_KEY_COLUMN,
};
use crate::genotype::{GenotypeCode, SampleGenotypes};
use crate::map_registry::{MatchResult, Resolution, SnpMap};
use crate::status::StatusKey;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

const SAMPLE_COLUMN: &str = "Sample ID";
const ALLELE1_COLUMN: &str = "Allele1 - AB";
const ALLELE2_COLUMN: &str = "Allele2 - AB";
const ALLELE_TOKENS: [&str; 3] = ["A", "B", "-"];

struct Columns {
    snp: usize,
    sample: usize,
    allele1: usize,
    allele2: usize,
}

impl Columns {
    fn locate(layout: &TableLayout) -> Result<Self, Vec<&'static str>> {
        let wanted = [REPORT_KEY_COLUMN, SAMPLE_COLUMN, ALLELE1_COLUMN, ALLELE2_COLUMN];
        let missing: Vec<&'static str> = wanted
            .iter()
            .filter(|name| layout.column(name).is_none())
            .copied()
            .collect();
        match wanted.map(|name| layout.column(name)) {
            [Some(snp), Some(sample), Some(allele1), Some(allele2)] => Ok(Self {
                snp,
                sample,
                allele1,
                allele2,
            }),
            _ => Err(missing),
        }
    }
}

struct ReportRow<'a> {
    sample: &'a str,
    snp: String,
    allele1: &'a str,
    allele2: &'a str,
}

/// Data rows split once; malformed rows are counted, not kept.
struct ParsedReport<'a> {
    rows: Vec<ReportRow<'a>>,
    malformed: Vec<String>,
    /// Distinct samples in order of first appearance.
    samples: Vec<&'a str>,
}

impl<'a> ParsedReport<'a> {
    fn parse(text: &'a str, layout: &TableLayout, columns: &Columns) -> Self {
        let mut rows = Vec::new();
        let mut malformed = Vec::new();
        let mut samples = Vec::new();
        let mut seen = HashSet::new();

        for (line_no, line) in text
            .lines()
            .enumerate()
            .skip(layout.header_line + 1)
            .filter(|(_, line)| !line.trim().is_empty())
        {
            let fields = layout.delimiter.split(line);
            if fields.len() != layout.columns.len() {
                malformed.push(format!(
                    "line {}: expected {} fields, found {}",
                    line_no + 1,
                    layout.columns.len(),
                    fields.len()
                ));
                continue;
            }
            let (sample, snp) = (fields[columns.sample], fields[columns.snp]);
            if sample.is_empty() || snp.is_empty() {
                malformed.push(format!("line {}: empty sample or SNP name", line_no + 1));
                continue;
            }
            if seen.insert(sample) {
                samples.push(sample);
            }
            rows.push(ReportRow {
                sample,
                snp: snp.to_uppercase(),
                allele1: fields[columns.allele1],
                allele2: fields[columns.allele2],
            });
        }

        Self {
            rows,
            malformed,
            samples,
        }
    }

    fn snp_set(&self) -> HashSet<String> {
        self.rows.iter().map(|row| row.snp.clone()).collect()
    }
}

impl ValidationEngine {
    pub(super) fn validate_report(
        &self,
        artifact: &UploadedArtifact,
        entry: &ArtifactEntry,
        classification: &Classification,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Accepted, Rejection> {
        if !self
            .rules
            .genotype_prefixes
            .iter()
            .any(|prefix| artifact.file_name.starts_with(prefix.as_str()))
        {
            return Err(Rejection::new(
                StatusKey::g_B,
                format!(
                    "file name {} does not start with {}",
                    artifact.file_name,
                    self.rules.genotype_prefixes.join(" or ")
                ),
            ));
        }

        let layout = classification
            .layout
            .as_ref()
            .ok_or_else(|| Rejection::new(StatusKey::g_A, "final report has no data table"))?;
        let columns = Columns::locate(layout).map_err(|missing| {
            Rejection::new(StatusKey::g_A, format!("missing column(s): {}", missing.join(", ")))
        })?;

        let chip = classification
            .header
            .content()
            .or(artifact.provenance.chip_id.as_deref());
        if let Some(allowed) = chip.and_then(|chip| self.rules.chip_delimiters.get(chip.trim())) {
            if !allowed.contains(&layout.delimiter) {
                return Err(Rejection::new(
                    StatusKey::g_M,
                    format!(
                        "delimiter {} is not configured for chip {}",
                        layout.delimiter,
                        chip.unwrap_or_default()
                    ),
                ));
            }
        }

        let text = entry_text(entry).map_err(|e| Rejection::new(StatusKey::g_C, e.to_string()))?;
        let report = ParsedReport::parse(text, layout, &columns);
        let snps = report.snp_set();

        let (map, resolved_by) = self.resolve_map(artifact, chip, &snps)?;
        debug!(upload = %artifact.upload_id, map = %map.map_id, ?resolved_by, "report map resolved");

        self.check_sample_count(artifact, classification, report.samples.len())?;
        check_structure(&report)?;
        let genotypes = self.decode(&report, &map)?;

        for sample in report
            .samples
            .iter()
            .filter(|sample| sample.chars().count() > self.rules.max_sample_id_len)
        {
            warn!(upload = %artifact.upload_id, sample, "sample id exceeds length limit");
            diagnostics.push(Diagnostic::warning(format!(
                "sample id longer than {} characters: {}",
                self.rules.max_sample_id_len, sample
            )));
        }

        let ready = genotypes.len();
        let replaced = self.store.commit(genotypes.clone());
        if resolved_by == Resolution::SnpSet {
            if let Some(chip) = chip {
                // The map exists, binding only fails for an unknown id.
                if let Ok(true) = self.maps.bind_alias(&map.map_id, chip) {
                    debug!(map = %map.map_id, chip, "chip alias bound from report");
                }
            }
        }

        let key = if replaced.is_empty() {
            StatusKey::g_I
        } else {
            StatusKey::g_K
        };
        Ok(Accepted {
            key,
            milestones: vec![StatusKey::g_D],
            detail: OutcomeDetail::GenotypesLoaded {
                map_id: map.map_id.clone(),
                resolved_by,
                summary: LoadSummary::new(ready, &replaced),
            },
            genotypes,
        })
    }

    /// Declared map id, then chip alias, then a map with the same SNP set.
    fn resolve_map(
        &self,
        artifact: &UploadedArtifact,
        chip: Option<&str>,
        snps: &HashSet<String>,
    ) -> Result<(Arc<SnpMap>, Resolution), Rejection> {
        let result = match &artifact.provenance.map_id {
            Some(map_id) => self.maps.match_id(snps, map_id),
            None => self.maps.match_map(snps, chip),
        };
        match result {
            MatchResult::Exact { map, resolved_by } => Ok((map, resolved_by)),
            MatchResult::CountMismatch {
                map_id,
                expected,
                found,
                missing,
                unexpected,
            } => Err(Rejection::new(
                StatusKey::g_N,
                format!(
                    "report lists {} SNPs, map {} has {} ({} missing, {} unexpected)",
                    found, map_id, expected, missing, unexpected
                ),
            )
            .with_detail(OutcomeDetail::MapMismatch {
                map_id,
                expected,
                found,
                missing,
                unexpected,
            })),
            MatchResult::NotFound => Err(Rejection::new(
                StatusKey::g_F,
                format!("no registered map matches the {} SNPs of the report", snps.len()),
            )),
        }
    }

    fn check_sample_count(
        &self,
        artifact: &UploadedArtifact,
        classification: &Classification,
        found: usize,
    ) -> Result<(), Rejection> {
        let expected = [
            ("upload", artifact.provenance.expected_samples),
            ("header", classification.header.num_samples()),
        ];
        for (source, expected) in expected {
            if let Some(expected) = expected.filter(|expected| *expected != found) {
                return Err(Rejection::new(
                    StatusKey::g_L,
                    format!("{} declares {} samples, report has {}", source, expected, found),
                ));
            }
        }
        Ok(())
    }

    fn decode(&self, report: &ParsedReport<'_>, map: &SnpMap) -> Result<Vec<SampleGenotypes>, Rejection> {
        let position: HashMap<&str, usize> = map
            .snps()
            .iter()
            .enumerate()
            .map(|(idx, snp)| (snp.as_str(), idx))
            .collect();
        let mut codes: HashMap<&str, Vec<GenotypeCode>> = report
            .samples
            .iter()
            .map(|sample| (*sample, vec![GenotypeCode::NO_CALL; map.len()]))
            .collect();

        let mut bad_tokens = 0usize;
        let mut first_bad = None;
        for row in &report.rows {
            if !ALLELE_TOKENS.contains(&row.allele1) || !ALLELE_TOKENS.contains(&row.allele2) {
                bad_tokens += 1;
                first_bad.get_or_insert_with(|| format!("{}{} at {}/{}", row.allele1, row.allele2, row.sample, row.snp));
                continue;
            }
            let code = self.decoder.decode_alleles(row.allele1, row.allele2).map_err(|e| {
                Rejection::new(StatusKey::g_G, format!("{} at {}/{}", e, row.sample, row.snp))
            })?;
            if let (Some(&idx), Some(sample_codes)) = (position.get(row.snp.as_str()), codes.get_mut(row.sample)) {
                sample_codes[idx] = code;
            }
        }
        if bad_tokens > 0 {
            return Err(Rejection::new(
                StatusKey::g_G,
                format!(
                    "{} allele call(s) outside A/B/-, first: {}",
                    bad_tokens,
                    first_bad.unwrap_or_default()
                ),
            ));
        }

        Ok(report
            .samples
            .iter()
            .map(|sample| {
                let sample_codes = codes.remove(sample).unwrap_or_default();
                SampleGenotypes::new(sample.to_string(), map.map_id.clone(), map.ordered(), sample_codes)
            })
            .collect())
    }
}

/// Structural checks in detection order: malformed rows first, then duplicate
/// pairs, then unequal per-sample SNP counts. Counts are taken over distinct
/// pairs, so a repeated row never masquerades as a short or long sample.
fn check_structure(report: &ParsedReport<'_>) -> Result<(), Rejection> {
    if let Some(first) = report.malformed.first() {
        return Err(Rejection::new(
            StatusKey::g_C,
            format!("{} malformed row(s), first at {}", report.malformed.len(), first),
        ));
    }

    let mut pairs = HashSet::with_capacity(report.rows.len());
    if let Some(row) = report
        .rows
        .iter()
        .find(|row| !pairs.insert((row.sample, row.snp.as_str())))
    {
        return Err(Rejection::new(
            StatusKey::g_E,
            format!("duplicate genotype for sample {} at SNP {}", row.sample, row.snp),
        ));
    }

    let mut per_sample: HashMap<&str, usize> = HashMap::new();
    for (sample, _) in &pairs {
        *per_sample.entry(*sample).or_default() += 1;
    }
    let counts: HashSet<usize> = per_sample.values().copied().collect();
    if counts.len() > 1 {
        let (min, max) = (
            counts.iter().min().copied().unwrap_or_default(),
            counts.iter().max().copied().unwrap_or_default(),
        );
        return Err(Rejection::new(
            StatusKey::g_C,
            format!("samples carry unequal SNP counts ({} to {})", min, max),
        ));
    }
    Ok(())
}
