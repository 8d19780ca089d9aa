use crate::map_registry::MapId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Upload type declared by the loading table ("Tipo_Cari").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UploadKind {
    #[serde(rename = "M", alias = "map")]
    Map,
    #[serde(rename = "G", alias = "genotype")]
    Genotype,
}

impl UploadKind {
    pub fn category(&self) -> ArtifactCategory {
        match self {
            UploadKind::Map => ArtifactCategory::Map,
            UploadKind::Genotype => ArtifactCategory::Genotype,
        }
    }
}

/// Category sniffed from the content itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactCategory {
    /// A bare `[Header]` block naming a chip, without a data table.
    Chip,
    /// SNP map table (`Index`, `Name`, ...).
    Map,
    /// Illumina final report (`[Header]` + `[Data]`).
    Genotype,
}

impl fmt::Display for ArtifactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArtifactCategory::Chip => "chip descriptor",
            ArtifactCategory::Map => "SNP map",
            ArtifactCategory::Genotype => "final report",
        })
    }
}

/// A field separator candidate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Delimiter(String);

impl Delimiter {
    pub fn new(separator: impl Into<String>) -> Self {
        Delimiter(separator.into())
    }

    pub fn tab() -> Self {
        Delimiter::new("\t")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split one line; tokens are trimmed, empty trailing fields are kept.
    pub fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        line.trim_end_matches(['\r', '\n'])
            .split(self.0.as_str())
            .map(str::trim)
            .collect()
    }

    /// Human-readable name used in diagnostics.
    pub fn name(&self) -> String {
        match self.0.as_str() {
            "\t" => "tab".to_string(),
            "," => "comma".to_string(),
            " " => "space".to_string(),
            "-" => "hyphen".to_string(),
            ";" => "semicolon".to_string(),
            other => format!("{:?}", other),
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// One file inside an upload container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ArtifactEntry {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Metadata the loading table supplies next to the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    #[serde(default)]
    pub chip_id: Option<String>,
    #[serde(default)]
    pub map_id: Option<MapId>,
    #[serde(default)]
    pub expected_samples: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedArtifact {
    pub upload_id: String,
    pub kind: UploadKind,
    pub file_name: String,
    pub entries: Vec<ArtifactEntry>,
    pub provenance: Provenance,
}

impl UploadedArtifact {
    pub fn new(upload_id: impl Into<String>, kind: UploadKind, file_name: impl Into<String>) -> Self {
        Self {
            upload_id: upload_id.into(),
            kind,
            file_name: file_name.into(),
            entries: Vec::new(),
            provenance: Provenance::default(),
        }
    }

    pub fn with_entry(mut self, entry: ArtifactEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// Short upload prefixes are stored long-form: `G_` → `GEN_`, `M_` → `MAP_`.
    pub fn normalized_file_name(&self) -> String {
        if let Some(rest) = self.file_name.strip_prefix("G_") {
            format!("GEN_{}", rest)
        } else if let Some(rest) = self.file_name.strip_prefix("M_") {
            format!("MAP_{}", rest)
        } else {
            self.file_name.clone()
        }
    }

    /// SHA-256 over every entry, in container order.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for entry in &self.entries {
            hasher.update(entry.name.as_bytes());
            hasher.update((entry.bytes.len() as u64).to_le_bytes());
            hasher.update(&entry.bytes);
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Key/value lines of a report's `[Header]` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportHeader {
    pub fields: BTreeMap<String, String>,
}

impl ReportHeader {
    /// Chip name from the `Content` line.
    pub fn content(&self) -> Option<&str> {
        self.fields.get("Content").map(String::as_str)
    }

    pub fn num_samples(&self) -> Option<usize> {
        self.fields.get("Num Samples").and_then(|v| v.parse().ok())
    }

    pub fn num_snps(&self) -> Option<usize> {
        self.fields.get("Num SNPs").and_then(|v| v.parse().ok())
    }
}

/// Where the data table sits and how it is separated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    pub delimiter: Delimiter,
    /// Zero-based line index of the column header.
    pub header_line: usize,
    pub columns: Vec<String>,
}

impl TableLayout {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: ArtifactCategory,
    /// Absent only for chip descriptors.
    pub layout: Option<TableLayout>,
    pub header: ReportHeader,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_prefixes_are_expanded() {
        let a = UploadedArtifact::new("1", UploadKind::Genotype, "G_batch.zip");
        assert_eq!(a.normalized_file_name(), "GEN_batch.zip");
        let m = UploadedArtifact::new("2", UploadKind::Map, "M_chip.zip");
        assert_eq!(m.normalized_file_name(), "MAP_chip.zip");
        let other = UploadedArtifact::new("3", UploadKind::Map, "GEN_x.zip");
        assert_eq!(other.normalized_file_name(), "GEN_x.zip");
    }

    #[test]
    fn digest_depends_on_content() {
        let a = UploadedArtifact::new("1", UploadKind::Map, "m").with_entry(ArtifactEntry::new("a", "x"));
        let b = UploadedArtifact::new("2", UploadKind::Map, "m").with_entry(ArtifactEntry::new("a", "y"));
        assert_ne!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }

    #[test]
    fn split_keeps_empty_fields() {
        let tab = Delimiter::tab();
        assert_eq!(tab.split("Content\t\tChip50.bpm\r"), vec!["Content", "", "Chip50.bpm"]);
        assert_eq!(Delimiter::new(";").name(), "semicolon");
    }
}
