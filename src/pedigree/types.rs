use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared relationship between the child and the listed parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    Sire,
    Dam,
    /// Both parents declared.
    Parents,
}

impl Relationship {
    pub fn expected_parents(&self) -> usize {
        match self {
            Relationship::Sire | Relationship::Dam => 1,
            Relationship::Parents => 2,
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Relationship::Sire => "sire",
            Relationship::Dam => "dam",
            Relationship::Parents => "parents",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PedigreeClaim {
    pub child: String,
    pub parents: Vec<String>,
    pub relationship: Relationship,
}

impl PedigreeClaim {
    pub fn duo(child: impl Into<String>, parent: impl Into<String>, relationship: Relationship) -> Self {
        Self {
            child: child.into(),
            parents: vec![parent.into()],
            relationship,
        }
    }

    pub fn trio(child: impl Into<String>, sire: impl Into<String>, dam: impl Into<String>) -> Self {
        Self {
            child: child.into(),
            parents: vec![sire.into(), dam.into()],
            relationship: Relationship::Parents,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Confirmed,
    Inconclusive,
    Excluded,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Confirmed => "confirmed",
            Verdict::Inconclusive => "inconclusive",
            Verdict::Excluded => "excluded",
        })
    }
}

/// Discordance cut-offs. Rates at or below `confirm_max_discordance` confirm,
/// rates above `exclude_min_discordance` exclude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub confirm_max_discordance: f64,
    pub exclude_min_discordance: f64,
    pub min_compared_snps: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            confirm_max_discordance: 0.01,
            exclude_min_discordance: 0.03,
            min_compared_snps: 20,
        }
    }
}

impl Thresholds {
    pub fn verdict(&self, discordant: usize, compared: usize) -> Verdict {
        if compared < self.min_compared_snps {
            return Verdict::Inconclusive;
        }
        let rate = discordant as f64 / compared as f64;
        if rate <= self.confirm_max_discordance {
            Verdict::Confirmed
        } else if rate > self.exclude_min_discordance {
            Verdict::Excluded
        } else {
            Verdict::Inconclusive
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConcordanceResult {
    pub claim: PedigreeClaim,
    pub concordant: usize,
    pub discordant: usize,
    pub compared: usize,
    pub verdict: Verdict,
}

impl ConcordanceResult {
    pub fn discordance_rate(&self) -> f64 {
        if self.compared == 0 {
            0.0
        } else {
            self.discordant as f64 / self.compared as f64
        }
    }
}
