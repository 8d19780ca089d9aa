use super::{MapId, MapRegistry, SnpMap};
use crate::error::RegistryError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapRecord {
    pub map_id: MapId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chip_id: Option<String>,
    pub snps: Vec<String>,
}

/// On-disk form of the registry, so accepted maps survive between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub maps: Vec<MapRecord>,
    #[serde(default)]
    pub aliases: BTreeMap<String, MapId>,
}

impl RegistrySnapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read map registry {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse map registry {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write map registry {}", path.display()))
    }
}

impl MapRegistry {
    /// Rebuild a registry exactly as saved. Maps go in without binding their
    /// chips, the saved aliases are applied next, and only chips left unbound
    /// (snapshots without an alias table) fall back to their map.
    pub fn from_snapshot(snapshot: RegistrySnapshot) -> Result<Self> {
        let registry = MapRegistry::new();
        {
            let mut state = registry.write();
            let mut chips = Vec::new();
            for record in snapshot.maps {
                let map = SnpMap::new(record.map_id, record.chip_id, record.snps)?;
                if state.maps.contains_key(&map.map_id) {
                    return Err(RegistryError::DuplicateMap {
                        map_id: map.map_id.to_string(),
                    }
                    .into());
                }
                if let Some(chip) = map.chip_id.clone() {
                    chips.push((chip, map.map_id.clone()));
                }
                state.maps.insert(map.map_id.clone(), Arc::new(map));
            }

            for (alias, map_id) in snapshot.aliases {
                if !state.maps.contains_key(&map_id) {
                    return Err(RegistryError::UnknownMap(map_id.to_string()).into());
                }
                if !state.bind_alias(&alias, &map_id) {
                    return Err(RegistryError::AliasConflict {
                        alias,
                        map_id: map_id.to_string(),
                    }
                    .into());
                }
            }
            for (chip, map_id) in chips {
                state.bind_alias(&chip, &map_id);
            }
        }
        Ok(registry)
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let state = self.read();
        RegistrySnapshot {
            maps: state
                .maps
                .values()
                .map(|map| MapRecord {
                    map_id: map.map_id.clone(),
                    chip_id: map.chip_id.clone(),
                    snps: map.snps().to_vec(),
                })
                .collect(),
            aliases: state
                .aliases
                .iter()
                .map(|(chip, map_id)| (chip.clone(), map_id.clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_preserves_maps_and_aliases() {
        let registry = MapRegistry::new();
        registry
            .admit(vec!["A".into(), "B".into()], Some("CHIP".into()), None)
            .unwrap();
        registry.admit(vec!["C".into()], None, None).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        registry.snapshot().save(&path).unwrap();

        let restored = MapRegistry::from_snapshot(RegistrySnapshot::load(&path).unwrap()).unwrap();
        assert_eq!(restored.map_ids(), registry.map_ids());
        assert_eq!(restored.alias("CHIP"), Some(MapId::from("2_a")));
        assert_eq!(restored.snapshot(), registry.snapshot());
    }

    #[test]
    fn restore_keeps_the_first_chip_binding() {
        let registry = MapRegistry::new();
        let five: Vec<String> = (1..=5).map(|i| format!("S{}", i)).collect();
        let ten: Vec<String> = (1..=10).map(|i| format!("S{}", i)).collect();
        registry.admit(five, Some("CHIP".into()), None).unwrap();
        registry.admit(ten, Some("CHIP".into()), None).unwrap();
        assert_eq!(registry.alias("CHIP"), Some(MapId::from("5_a")));

        let restored = MapRegistry::from_snapshot(registry.snapshot()).unwrap();
        assert_eq!(restored.alias("CHIP"), Some(MapId::from("5_a")));
        assert_eq!(restored.snapshot(), registry.snapshot());
    }

    #[test]
    fn restore_without_alias_table_binds_chips() {
        let snapshot: RegistrySnapshot =
            serde_json::from_str(r#"{"maps": [{"map_id": "2_a", "chip_id": "CHIP", "snps": ["A", "B"]}]}"#).unwrap();
        let restored = MapRegistry::from_snapshot(snapshot).unwrap();
        assert_eq!(restored.alias("CHIP"), Some(MapId::from("2_a")));
    }

    #[test]
    fn restore_rejects_dangling_and_empty_aliases() {
        let record = MapRecord {
            map_id: MapId::from("1_a"),
            chip_id: None,
            snps: vec!["A".into()],
        };
        let mut snapshot = RegistrySnapshot {
            maps: vec![record],
            aliases: BTreeMap::from([("CHIP".to_string(), MapId::from("9_z"))]),
        };
        assert!(MapRegistry::from_snapshot(snapshot.clone()).is_err());

        snapshot.aliases = BTreeMap::from([(" ".to_string(), MapId::from("1_a"))]);
        let err = MapRegistry::from_snapshot(snapshot).unwrap_err();
        assert!(err.to_string().contains("cannot be bound"));
    }
}
