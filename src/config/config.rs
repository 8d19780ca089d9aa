use crate::artifact::{Classifier, Delimiter};
use crate::error::{ConfigError, DecodeError};
use crate::genotype::{GenotypeDecoder, CALLS};
use crate::map_registry::MapId;
use crate::pedigree::Thresholds;
use crate::status::StatusRegistry;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Field separators tried in order when sniffing a table.
    #[serde(default = "default_delimiters")]
    pub delimiters: Vec<String>,

    /// Separators accepted for reports of a given chip (`Content` line).
    #[serde(default)]
    pub chip_delimiters: BTreeMap<String, Vec<String>>,

    #[serde(default = "default_sample_rows")]
    pub sample_rows: usize,

    #[serde(default = "default_genotype_prefixes")]
    pub genotype_prefixes: Vec<String>,

    #[serde(default = "default_decode_table")]
    pub decode_table: BTreeMap<String, u8>,

    #[serde(default = "default_max_sample_id_len")]
    pub max_sample_id_len: usize,

    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Replaces the built-in status catalog.
    #[serde(default)]
    pub status_catalog: Option<PathBuf>,

    /// Validate only: registry snapshot and genotype tables are not written.
    #[serde(default)]
    pub dry_run: bool,

    #[serde(default)]
    pub pedigree: PedigreeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PedigreeConfig {
    #[serde(default = "default_confirm_max_discordance")]
    pub confirm_max_discordance: f64,

    #[serde(default = "default_exclude_min_discordance")]
    pub exclude_min_discordance: f64,

    #[serde(default = "default_min_compared_snps")]
    pub min_compared_snps: usize,

    /// Registered map restricting the comparison to a parentage panel.
    #[serde(default)]
    pub parentage_map: Option<MapId>,
}

fn default_delimiters() -> Vec<String> {
    ["\t", ",", " ", "-", ";"].iter().map(|d| d.to_string()).collect()
}

fn default_sample_rows() -> usize {
    20
}

fn default_genotype_prefixes() -> Vec<String> {
    vec!["GEN_".to_string(), "G_".to_string()]
}

fn default_decode_table() -> BTreeMap<String, u8> {
    CALLS
        .iter()
        .zip([0u8, 1, 2, 5])
        .map(|(call, code)| (call.to_string(), code))
        .collect()
}

fn default_max_sample_id_len() -> usize {
    25
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8))
        .unwrap_or(4)
}

fn default_confirm_max_discordance() -> f64 {
    0.01
}

fn default_exclude_min_discordance() -> f64 {
    0.03
}

fn default_min_compared_snps() -> usize {
    20
}

impl Default for Config {
    fn default() -> Self {
        Self {
            delimiters: default_delimiters(),
            chip_delimiters: BTreeMap::new(),
            sample_rows: default_sample_rows(),
            genotype_prefixes: default_genotype_prefixes(),
            decode_table: default_decode_table(),
            max_sample_id_len: default_max_sample_id_len(),
            workers: default_workers(),
            status_catalog: None,
            dry_run: false,
            pedigree: PedigreeConfig::default(),
        }
    }
}

impl Default for PedigreeConfig {
    fn default() -> Self {
        Self {
            confirm_max_discordance: default_confirm_max_discordance(),
            exclude_min_discordance: default_exclude_min_discordance(),
            min_compared_snps: default_min_compared_snps(),
            parentage_map: None,
        }
    }
}

impl Config {
    /// `config.toml` in the user's config directory.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "progen", "progen-tools")
            .map(|proj_dirs| proj_dirs.config_dir().join("config.toml"))
    }

    /// Load from an explicit path, else from the default location, else defaults.
    /// An explicit path must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match explicit {
            Some(path) => Self::load_from(path)?,
            None => match Self::default_path().filter(|path| path.exists()) {
                Some(path) => Self::load_from(&path)?,
                None => Config::default(),
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.delimiters.is_empty() || self.delimiters.iter().any(String::is_empty) {
            return Err(invalid("delimiters", "at least one non-empty delimiter is required"));
        }
        if let Some((chip, _)) = self
            .chip_delimiters
            .iter()
            .find(|(_, list)| list.is_empty() || list.iter().any(String::is_empty))
        {
            return Err(invalid("chip_delimiters", format!("empty delimiter list for chip {}", chip)));
        }
        if self.genotype_prefixes.is_empty() {
            return Err(invalid("genotype_prefixes", "at least one prefix is required"));
        }
        if self.workers == 0 {
            return Err(invalid("workers", "must be at least 1"));
        }
        self.decoder()?;
        self.thresholds()?;
        Ok(())
    }

    pub fn decoder(&self) -> Result<GenotypeDecoder, ConfigError> {
        GenotypeDecoder::from_table(&self.decode_table)
            .map_err(|e: DecodeError| invalid("decode_table", e.to_string()))
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(
            self.delimiters.iter().map(Delimiter::new).collect(),
            self.sample_rows,
        )
    }

    pub fn thresholds(&self) -> Result<Thresholds, ConfigError> {
        let p = &self.pedigree;
        let in_range = |v: f64| (0.0..=1.0).contains(&v);
        if !in_range(p.confirm_max_discordance) || !in_range(p.exclude_min_discordance) {
            return Err(invalid("pedigree", "discordance thresholds must lie in [0, 1]"));
        }
        if p.confirm_max_discordance > p.exclude_min_discordance {
            return Err(invalid(
                "pedigree",
                "confirm_max_discordance must not exceed exclude_min_discordance",
            ));
        }
        Ok(Thresholds {
            confirm_max_discordance: p.confirm_max_discordance,
            exclude_min_discordance: p.exclude_min_discordance,
            min_compared_snps: p.min_compared_snps,
        })
    }

    /// The built-in catalog unless a replacement is configured.
    pub fn status_registry(&self) -> anyhow::Result<StatusRegistry> {
        let registry = match &self.status_catalog {
            Some(path) => StatusRegistry::from_path(path)?,
            None => StatusRegistry::builtin()?,
        };
        Ok(registry)
    }

    /// Separators accepted for `chip`, when the chip has a configured list.
    pub fn chip_delimiters(&self, chip: &str) -> Option<Vec<Delimiter>> {
        self.chip_delimiters
            .get(chip.trim())
            .map(|list| list.iter().map(Delimiter::new).collect())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}
