//! Error types shared by the validation core.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration could not be read or is inconsistent.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Status catalog load and lookup failures.
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("unknown status code {category}/{code}")]
    UnknownCode { category: String, code: String },

    #[error("status catalog is missing required codes: {}", .0.join(", "))]
    IncompleteCatalog(Vec<String>),

    #[error("status code {code} listed more than once in catalog")]
    DuplicateCode { code: String },

    #[error("status code {code} has prefix outside the c_/m_/g_ categories")]
    BadPrefix { code: String },

    #[error("status code {code}: {field} must be 0 or 1, found {value}")]
    InvalidFlag {
        code: String,
        field: &'static str,
        value: i64,
    },

    #[error("failed to read status catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse status catalog: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A genotype call outside the decode table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unrecognized genotype call {0:?}")]
    UnrecognizedCall(String),

    #[error("decode table is not total: missing call {0:?}")]
    IncompleteTable(String),

    #[error("decode table maps {call:?} to {code}, expected one of 0, 1, 2, 5")]
    InvalidCode { call: String, code: u8 },
}

/// Reasons an artifact could not be classified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("artifact content is empty")]
    Empty,

    #[error("artifact content is not valid UTF-8")]
    Unreadable,

    #[error("no table header line found")]
    MissingHeader,

    #[error("delimiters {} parse the header differently", .0.join(" / "))]
    AmbiguousFormat(Vec<String>),

    #[error("no candidate delimiter yields a consistent table")]
    NoDelimiterMatch,
}

/// Map registry consistency failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("map {map_id} is already registered with a different SNP set")]
    DuplicateMap { map_id: String },

    #[error("map {0} is not registered")]
    UnknownMap(String),

    #[error("map {map_id} contains duplicate SNP {snp}")]
    DuplicateSnp { map_id: String, snp: String },

    #[error("alias {alias} cannot be bound to map {map_id}")]
    AliasConflict { alias: String, map_id: String },
}

/// Pedigree verification failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PedigreeError {
    #[error("no SNP is called in both child {child} and the declared parents")]
    InsufficientData { child: String },

    #[error("no decoded genotypes for sample {0}")]
    MissingSample(String),

    #[error("invalid pedigree claim for {child}: {reason}")]
    InvalidClaim { child: String, reason: String },
}
