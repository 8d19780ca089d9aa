use crate::error::RegistryError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapId(String);

impl MapId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MapId {
    fn from(value: &str) -> Self {
        MapId(value.to_string())
    }
}

impl From<String> for MapId {
    fn from(value: String) -> Self {
        MapId(value)
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered SNP map. The identifier set is unique and never changes.
#[derive(Debug, Clone, PartialEq)]
pub struct SnpMap {
    pub map_id: MapId,
    pub chip_id: Option<String>,
    ordered: Arc<[String]>,
    set: HashSet<String>,
}

impl SnpMap {
    pub fn new(map_id: MapId, chip_id: Option<String>, snps: Vec<String>) -> Result<Self, RegistryError> {
        let mut set = HashSet::with_capacity(snps.len());
        for snp in &snps {
            if !set.insert(snp.clone()) {
                return Err(RegistryError::DuplicateSnp {
                    map_id: map_id.to_string(),
                    snp: snp.clone(),
                });
            }
        }
        Ok(Self {
            map_id,
            chip_id,
            ordered: snps.into(),
            set,
        })
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn snps(&self) -> &[String] {
        &self.ordered
    }

    /// Shared handle on the SNP order, used to align decoded genotypes.
    pub fn ordered(&self) -> Arc<[String]> {
        Arc::clone(&self.ordered)
    }

    pub fn contains(&self, snp: &str) -> bool {
        self.set.contains(snp)
    }

    pub fn same_set(&self, other: &HashSet<String>) -> bool {
        self.set.len() == other.len() && self.set.iter().all(|snp| other.contains(snp))
    }

    pub(crate) fn compare(&self, other: &HashSet<String>) -> SetDifference {
        SetDifference {
            missing: self.set.iter().filter(|snp| !other.contains(*snp)).count(),
            unexpected: other.iter().filter(|snp| !self.set.contains(*snp)).count(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SetDifference {
    pub(crate) missing: usize,
    pub(crate) unexpected: usize,
}

/// How a report's map was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Declared,
    ChipAlias,
    SnpSet,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    Exact {
        map: Arc<SnpMap>,
        resolved_by: Resolution,
    },
    /// The map is known but its SNP set differs from the candidate's.
    CountMismatch {
        map_id: MapId,
        expected: usize,
        found: usize,
        missing: usize,
        unexpected: usize,
    },
    NotFound,
}

/// Outcome of an idempotent `register`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub map_id: MapId,
    pub added: bool,
}

/// Provenance of an admitted map upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MapProvenance {
    /// Identical to an already registered map; nothing was written.
    Existing,
    /// New map, no registered map shares its SNP count.
    New,
    /// New map whose SNP count collides with registered maps.
    CountCollision,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub map_id: MapId,
    pub provenance: MapProvenance,
}
