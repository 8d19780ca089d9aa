use super::{StatusCategory, StatusCode, StatusKey};
use crate::error::StatusError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const DEFAULT_CATALOG: &str = include_str!("catalog.toml");

#[derive(Deserialize)]
struct CatalogFile {
    status: Vec<CatalogEntry>,
}

#[derive(Deserialize)]
struct CatalogEntry {
    code: String,
    bit_ok: i64,
    bit_elaborato: i64,
    message: String,
}

fn flag(code: &str, field: &'static str, value: i64) -> Result<bool, StatusError> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(StatusError::InvalidFlag {
            code: code.to_string(),
            field,
            value,
        }),
    }
}

/// Read-only outcome catalog, built once at startup and shared by reference.
#[derive(Debug, Clone)]
pub struct StatusRegistry {
    entries: HashMap<String, StatusCode>,
    // Indexed by StatusKey ordinal; populated only when every key is present.
    known: Vec<StatusCode>,
}

impl StatusRegistry {
    /// The catalog compiled into the binary.
    pub fn builtin() -> Result<Self, StatusError> {
        Self::from_toml(DEFAULT_CATALOG)
    }

    pub fn from_path(path: &Path) -> Result<Self, StatusError> {
        let content = fs::read_to_string(path).map_err(|source| StatusError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, StatusError> {
        let file: CatalogFile = toml::from_str(content)?;
        let mut entries = HashMap::with_capacity(file.status.len());

        for entry in file.status {
            let category = StatusCategory::from_code(&entry.code).ok_or_else(|| {
                StatusError::BadPrefix {
                    code: entry.code.clone(),
                }
            })?;
            let status = StatusCode {
                category,
                success: flag(&entry.code, "bit_ok", entry.bit_ok)?,
                processed: flag(&entry.code, "bit_elaborato", entry.bit_elaborato)?,
                message: entry.message,
                code: entry.code,
            };
            if entries.contains_key(&status.code) {
                return Err(StatusError::DuplicateCode { code: status.code });
            }
            entries.insert(status.code.clone(), status);
        }

        let missing: Vec<String> = StatusKey::ALL
            .iter()
            .filter(|key| !entries.contains_key(key.as_str()))
            .map(|key| key.as_str().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(StatusError::IncompleteCatalog(missing));
        }

        let known = StatusKey::ALL
            .iter()
            .filter_map(|key| entries.get(key.as_str()).cloned())
            .collect();

        Ok(Self { entries, known })
    }

    /// Look up any catalog code, including extensions the engine does not emit.
    pub fn lookup(&self, category: StatusCategory, code: &str) -> Result<&StatusCode, StatusError> {
        self.entries
            .get(code)
            .filter(|status| status.category == category)
            .ok_or_else(|| StatusError::UnknownCode {
                category: category.to_string(),
                code: code.to_string(),
            })
    }

    /// Codes referenced by the engine are guaranteed present by construction.
    pub fn get(&self, key: StatusKey) -> &StatusCode {
        &self.known[key.ordinal()]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All codes sorted by code string.
    pub fn codes(&self) -> Vec<&StatusCode> {
        let mut codes: Vec<_> = self.entries.values().collect();
        codes.sort_by(|a, b| a.code.cmp(&b.code));
        codes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_covers_every_key() {
        let registry = StatusRegistry::builtin().unwrap();
        for key in StatusKey::ALL {
            let status = registry.get(key);
            assert_eq!(status.code, key.as_str());
            assert_eq!(status.category, key.category());
        }
        assert!(registry.get(StatusKey::m_D).success);
        assert!(!registry.get(StatusKey::g_N).success);
        assert!(!registry.get(StatusKey::c_B).processed);
    }

    #[test]
    fn near_duplicate_variants_keep_identical_messages() {
        let registry = StatusRegistry::builtin().unwrap();
        assert_eq!(
            registry.get(StatusKey::g_C).message,
            registry.get(StatusKey::g_G).message
        );
        assert_eq!(
            registry.get(StatusKey::m_E).message,
            registry.get(StatusKey::m_F).message
        );
    }

    #[test]
    fn lookup_rejects_unknown_and_miscategorised_codes() {
        let registry = StatusRegistry::builtin().unwrap();
        assert!(registry.lookup(StatusCategory::Map, "m_A").is_ok());
        assert!(matches!(
            registry.lookup(StatusCategory::Map, "m_Z"),
            Err(StatusError::UnknownCode { .. })
        ));
        assert!(matches!(
            registry.lookup(StatusCategory::Chip, "m_A"),
            Err(StatusError::UnknownCode { .. })
        ));
    }

    #[test]
    fn incomplete_catalog_fails_fast() {
        let content = r#"
            [[status]]
            code = "c_A"
            bit_ok = 0
            bit_elaborato = 1
            message = "x"
        "#;
        match StatusRegistry::from_toml(content) {
            Err(StatusError::IncompleteCatalog(missing)) => {
                assert_eq!(missing.len(), StatusKey::ALL.len() - 1);
                assert!(!missing.contains(&"c_A".to_string()));
            }
            other => panic!("expected IncompleteCatalog, got {:?}", other),
        }
    }

    #[test]
    fn invalid_flag_is_rejected() {
        let content = DEFAULT_CATALOG.replacen("bit_ok = 0", "bit_ok = 2", 1);
        assert!(matches!(
            StatusRegistry::from_toml(&content),
            Err(StatusError::InvalidFlag { field: "bit_ok", value: 2, .. })
        ));
    }

    #[test]
    fn extensions_are_allowed() {
        let content = format!(
            "{}\n[[status]]\ncode = \"g_Z\"\nbit_ok = 0\nbit_elaborato = 1\nmessage = \"later\"\n",
            DEFAULT_CATALOG
        );
        let registry = StatusRegistry::from_toml(&content).unwrap();
        assert_eq!(registry.len(), StatusKey::ALL.len() + 1);
        assert_eq!(
            registry.lookup(StatusCategory::Genotype, "g_Z").unwrap().message,
            "later"
        );
    }

    #[test]
    fn duplicate_code_is_rejected() {
        let content = format!(
            "{}\n[[status]]\ncode = \"m_A\"\nbit_ok = 0\nbit_elaborato = 1\nmessage = \"again\"\n",
            DEFAULT_CATALOG
        );
        assert!(matches!(
            StatusRegistry::from_toml(&content),
            Err(StatusError::DuplicateCode { .. })
        ));
    }
}
