pub mod artifact;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod export;
pub mod genotype;
pub mod map_registry;
pub mod pedigree;
pub mod pipeline;
pub mod status;
pub mod utils;
pub mod validation;

pub use error::{ClassifyError, ConfigError, DecodeError, PedigreeError, RegistryError, StatusError};
