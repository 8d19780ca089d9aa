use crate::error::DecodeError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// The four calls an Illumina AB report can produce for one sample at one SNP.
pub const CALLS: [&str; 4] = ["BB", "AB", "AA", "--"];

/// Numeric genotype: 0/1/2 are called genotypes, 5 is a no-call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenotypeCode(u8);

impl GenotypeCode {
    pub const HOM_B: GenotypeCode = GenotypeCode(0);
    pub const HET: GenotypeCode = GenotypeCode(1);
    pub const HOM_A: GenotypeCode = GenotypeCode(2);
    pub const NO_CALL: GenotypeCode = GenotypeCode(5);

    pub fn new(code: u8) -> Option<Self> {
        match code {
            0 | 1 | 2 | 5 => Some(GenotypeCode(code)),
            _ => None,
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn is_called(&self) -> bool {
        self.0 != 5
    }

    /// Copies of the allele counted by the code (0, 1 or 2); `None` for a no-call.
    pub fn dosage(&self) -> Option<u8> {
        self.is_called().then_some(self.0)
    }

    pub fn from_digit(digit: char) -> Option<Self> {
        digit.to_digit(10).and_then(|d| Self::new(d as u8))
    }

    pub fn as_digit(&self) -> char {
        (b'0' + self.0) as char
    }
}

impl fmt::Display for GenotypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Maps genotype call strings to codes. Total over [`CALLS`], nothing else.
#[derive(Debug, Clone)]
pub struct GenotypeDecoder {
    table: HashMap<String, GenotypeCode>,
}

impl Default for GenotypeDecoder {
    fn default() -> Self {
        Self::standard()
    }
}

impl GenotypeDecoder {
    pub fn standard() -> Self {
        let table = [
            ("BB", GenotypeCode::HOM_B),
            ("AB", GenotypeCode::HET),
            ("AA", GenotypeCode::HOM_A),
            ("--", GenotypeCode::NO_CALL),
        ]
        .into_iter()
        .map(|(call, code)| (call.to_string(), code))
        .collect();
        Self { table }
    }

    /// Build from a configured table; it must cover exactly the four calls.
    pub fn from_table(table: &BTreeMap<String, u8>) -> Result<Self, DecodeError> {
        for call in CALLS {
            if !table.contains_key(call) {
                return Err(DecodeError::IncompleteTable(call.to_string()));
            }
        }

        let mut decoded = HashMap::with_capacity(CALLS.len());
        for (call, &code) in table {
            if !CALLS.contains(&call.as_str()) {
                return Err(DecodeError::UnrecognizedCall(call.clone()));
            }
            let code = GenotypeCode::new(code).ok_or_else(|| DecodeError::InvalidCode {
                call: call.clone(),
                code,
            })?;
            decoded.insert(call.clone(), code);
        }

        Ok(Self { table: decoded })
    }

    pub fn decode(&self, call: &str) -> Result<GenotypeCode, DecodeError> {
        self.table
            .get(call)
            .copied()
            .ok_or_else(|| DecodeError::UnrecognizedCall(call.to_string()))
    }

    /// Decode an `Allele1 - AB` / `Allele2 - AB` pair.
    pub fn decode_alleles(&self, allele1: &str, allele2: &str) -> Result<GenotypeCode, DecodeError> {
        let mut call = String::with_capacity(allele1.len() + allele2.len());
        call.push_str(allele1);
        call.push_str(allele2);
        self.decode(&call)
    }
}
