//! Parent/child verification by SNP concordance.

mod types;
mod verifier;

pub use types::{ConcordanceResult, PedigreeClaim, Relationship, Thresholds, Verdict};
pub use verifier::{duo_consistent, trio_consistent, GenotypeLookup, PedigreeVerifier};
