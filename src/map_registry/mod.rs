mod snapshot;
mod types;

pub use snapshot::{MapRecord, RegistrySnapshot};
pub use types::{Admission, MapId, MapProvenance, MatchResult, Registration, Resolution, SnpMap};

use crate::error::RegistryError;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

#[derive(Debug, Default)]
struct RegistryState {
    maps: BTreeMap<MapId, Arc<SnpMap>>,
    aliases: HashMap<String, MapId>,
}

impl RegistryState {
    fn find_identical(&self, snps: &HashSet<String>) -> Option<&Arc<SnpMap>> {
        self.maps.values().find(|map| map.same_set(snps))
    }

    fn count_collides(&self, count: usize) -> bool {
        self.maps.values().any(|map| map.len() == count)
    }

    fn next_free_name(&self, count: usize) -> MapId {
        (0..)
            .map(|idx| MapId::from(format!("{}_{}", count, suffix(idx))))
            .find(|candidate| !self.maps.contains_key(candidate))
            .unwrap_or_else(|| MapId::from(count.to_string()))
    }

    fn bind_alias(&mut self, chip: &str, map_id: &MapId) -> bool {
        let chip = chip.trim();
        if chip.is_empty() || self.aliases.contains_key(chip) {
            return false;
        }
        self.aliases.insert(chip.to_string(), map_id.clone());
        true
    }

    fn insert(&mut self, map: SnpMap) {
        let map_id = map.map_id.clone();
        if let Some(chip) = map.chip_id.clone() {
            self.bind_alias(&chip, &map_id);
        }
        self.maps.insert(map_id, Arc::new(map));
    }

    fn compare(&self, map: &Arc<SnpMap>, snps: &HashSet<String>, resolved_by: Resolution) -> MatchResult {
        if map.same_set(snps) {
            return MatchResult::Exact {
                map: Arc::clone(map),
                resolved_by,
            };
        }
        let diff = map.compare(snps);
        MatchResult::CountMismatch {
            map_id: map.map_id.clone(),
            expected: map.len(),
            found: snps.len(),
            missing: diff.missing,
            unexpected: diff.unexpected,
        }
    }
}

/// Spreadsheet-style suffixes: a..z, aa, ab, ...
fn suffix(mut idx: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'a' + (idx % 26) as u8) as char);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// Registry of accepted SNP maps. Single writer, many readers; readers only
/// ever see whole maps.
#[derive(Debug, Default)]
pub struct MapRegistry {
    state: RwLock<RegistryState>,
}

impl MapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under the map's own id. Re-registering an identical set is a no-op.
    pub fn register(&self, map: SnpMap) -> Result<Registration, RegistryError> {
        let mut state = self.write();
        if let Some(existing) = state.maps.get(&map.map_id) {
            if existing.len() == map.len() && map.snps().iter().all(|snp| existing.contains(snp)) {
                return Ok(Registration {
                    map_id: map.map_id,
                    added: false,
                });
            }
            return Err(RegistryError::DuplicateMap {
                map_id: map.map_id.to_string(),
            });
        }

        let map_id = map.map_id.clone();
        info!(map = %map_id, snps = map.len(), "registering map");
        state.insert(map);
        Ok(Registration { map_id, added: true })
    }

    /// Accept an uploaded map, naming it when no id is declared. The whole
    /// check-and-insert runs under the write lock.
    pub fn admit(
        &self,
        snps: Vec<String>,
        chip_id: Option<String>,
        declared: Option<MapId>,
    ) -> Result<Admission, RegistryError> {
        let candidate: HashSet<String> = snps.iter().cloned().collect();
        let mut state = self.write();

        if let Some(existing) = state.find_identical(&candidate) {
            let map_id = existing.map_id.clone();
            if let Some(declared) = declared.filter(|declared| *declared != map_id) {
                if state.maps.contains_key(&declared) {
                    return Err(RegistryError::DuplicateMap {
                        map_id: declared.to_string(),
                    });
                }
                // reports declaring this id resolve to the matched map
                state.bind_alias(declared.as_str(), &map_id);
            }
            if let Some(chip) = chip_id.as_deref() {
                state.bind_alias(chip, &map_id);
            }
            debug!(map = %map_id, "upload matches registered map");
            return Ok(Admission {
                map_id,
                provenance: MapProvenance::Existing,
            });
        }

        let provenance = if state.count_collides(snps.len()) {
            MapProvenance::CountCollision
        } else {
            MapProvenance::New
        };
        let map_id = match declared {
            Some(declared) if state.maps.contains_key(&declared) => {
                return Err(RegistryError::DuplicateMap {
                    map_id: declared.to_string(),
                });
            }
            Some(declared) => declared,
            None => state.next_free_name(snps.len()),
        };

        let map = SnpMap::new(map_id.clone(), chip_id, snps)?;
        info!(map = %map_id, snps = map.len(), ?provenance, "admitting new map");
        state.insert(map);
        Ok(Admission { map_id, provenance })
    }

    /// Match a candidate SNP set, resolving the map through the chip alias
    /// first and falling back to set equality.
    pub fn match_map(&self, snps: &HashSet<String>, chip_id: Option<&str>) -> MatchResult {
        let state = self.read();
        if let Some(map) = chip_id
            .and_then(|chip| state.aliases.get(chip.trim()))
            .and_then(|map_id| state.maps.get(map_id))
        {
            return state.compare(map, snps, Resolution::ChipAlias);
        }
        match state.find_identical(snps) {
            Some(map) => MatchResult::Exact {
                map: Arc::clone(map),
                resolved_by: Resolution::SnpSet,
            },
            None => MatchResult::NotFound,
        }
    }

    /// Match against one declared map id, or an alias bound to a map.
    pub fn match_id(&self, snps: &HashSet<String>, map_id: &MapId) -> MatchResult {
        let state = self.read();
        let map = state.maps.get(map_id).or_else(|| {
            state
                .aliases
                .get(map_id.as_str())
                .and_then(|target| state.maps.get(target))
        });
        match map {
            Some(map) => state.compare(map, snps, Resolution::Declared),
            None => MatchResult::NotFound,
        }
    }

    /// Bind a chip name to a map unless the name is already taken.
    pub fn bind_alias(&self, map_id: &MapId, chip: &str) -> Result<bool, RegistryError> {
        let mut state = self.write();
        if !state.maps.contains_key(map_id) {
            return Err(RegistryError::UnknownMap(map_id.to_string()));
        }
        Ok(state.bind_alias(chip, map_id))
    }

    pub fn get(&self, map_id: &MapId) -> Option<Arc<SnpMap>> {
        self.read().maps.get(map_id).cloned()
    }

    pub fn alias(&self, chip: &str) -> Option<MapId> {
        self.read().aliases.get(chip.trim()).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().maps.is_empty()
    }

    pub fn map_ids(&self) -> Vec<MapId> {
        self.read().maps.keys().cloned().collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}
