//! Builds uploads from the local file system: a manifest lists the rows of the
//! loading table, each pointing at a file or an extracted container directory.

use super::types::{ArtifactEntry, Provenance, UploadKind, UploadedArtifact};
use crate::map_registry::MapId;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    pub kind: UploadKind,
    /// Declared file name; defaults to the last component of `path`.
    #[serde(default)]
    pub file_name: Option<String>,
    pub path: PathBuf,
    #[serde(default)]
    pub chip: Option<String>,
    #[serde(default)]
    pub expected_samples: Option<usize>,
    #[serde(default)]
    pub map_id: Option<MapId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchManifest {
    pub uploads: Vec<ManifestEntry>,
}

impl BatchManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse manifest {}", path.display()))
    }

    /// Relative upload paths are resolved against `base`.
    pub fn artifacts(&self, base: &Path) -> Result<Vec<UploadedArtifact>> {
        self.uploads
            .iter()
            .map(|entry| {
                let path = if entry.path.is_absolute() {
                    entry.path.clone()
                } else {
                    base.join(&entry.path)
                };
                load_upload(entry, &path)
            })
            .collect()
    }
}

fn load_upload(entry: &ManifestEntry, path: &Path) -> Result<UploadedArtifact> {
    let file_name = entry.file_name.clone().unwrap_or_else(|| {
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    let mut artifact = UploadedArtifact::new(entry.id.clone(), entry.kind, file_name).with_provenance(Provenance {
        chip_id: entry.chip.clone(),
        map_id: entry.map_id.clone(),
        expected_samples: entry.expected_samples,
    });
    artifact.entries = read_entries(path)?;
    debug!(upload = %artifact.upload_id, entries = artifact.entries.len(), "upload loaded");
    Ok(artifact)
}

/// A file is one entry; a directory contributes one entry per regular file, by name.
pub fn read_entries(path: &Path) -> Result<Vec<ArtifactEntry>> {
    if path.is_dir() {
        let mut files: Vec<PathBuf> = fs::read_dir(path)
            .with_context(|| format!("Failed to list {}", path.display()))?
            .filter_map(|dir_entry| dir_entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect();
        files.sort();
        files.iter().map(|file| read_entry(file)).collect()
    } else {
        Ok(vec![read_entry(path)?])
    }
}

/// Magic-number probe length; shorter files cannot be compressed.
const SNIFF_LEN: usize = 5;

/// Reads one file, decompressing it when it carries a known compression magic.
pub fn read_entry(path: &Path) -> Result<ArtifactEntry> {
    let raw = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    if raw.len() < SNIFF_LEN {
        return Ok(ArtifactEntry::new(name, raw));
    }

    let (mut reader, format) = niffler::get_reader(Box::new(Cursor::new(raw)))
        .with_context(|| format!("Failed to create decompressor for {}", path.display()))?;
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .with_context(|| format!("Failed to decompress {}", path.display()))?;

    if format != niffler::compression::Format::No {
        if let Some(stem) = name.strip_suffix(".gz") {
            name = stem.to_string();
        }
    }
    Ok(ArtifactEntry::new(name, bytes))
}
