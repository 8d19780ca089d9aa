use super::decoder::GenotypeCode;
use crate::map_registry::{MapId, SnpMap};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Decoded genotypes of one sample, aligned to the SNP order of a registered map.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleGenotypes {
    pub sample_id: String,
    pub map_id: MapId,
    pub snps: Arc<[String]>,
    pub codes: Vec<GenotypeCode>,
    pub call_rate: f64,
}

impl SampleGenotypes {
    pub fn new(sample_id: String, map_id: MapId, snps: Arc<[String]>, codes: Vec<GenotypeCode>) -> Self {
        let call_rate = call_rate(&codes);
        Self {
            sample_id,
            map_id,
            snps,
            codes,
            call_rate,
        }
    }

    /// Rebuild from the digit string written by the genotype export.
    pub fn from_digits(sample_id: String, map: &SnpMap, digits: &str) -> Option<Self> {
        if digits.chars().count() != map.len() {
            return None;
        }
        let codes = digits
            .chars()
            .map(GenotypeCode::from_digit)
            .collect::<Option<Vec<_>>>()?;
        Some(Self::new(sample_id, map.map_id.clone(), map.ordered(), codes))
    }

    /// One digit per SNP, in map order.
    pub fn genotype_string(&self) -> String {
        self.codes.iter().map(GenotypeCode::as_digit).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, GenotypeCode)> {
        self.snps.iter().map(String::as_str).zip(self.codes.iter().copied())
    }

    /// Re-align onto another map; SNPs this sample has no code for become no-calls.
    pub fn project_onto(&self, panel: &SnpMap) -> SampleGenotypes {
        let by_snp: HashMap<&str, GenotypeCode> = self.iter().collect();
        let codes = panel
            .snps()
            .iter()
            .map(|snp| by_snp.get(snp.as_str()).copied().unwrap_or(GenotypeCode::NO_CALL))
            .collect();
        SampleGenotypes::new(
            self.sample_id.clone(),
            panel.map_id.clone(),
            panel.ordered(),
            codes,
        )
    }
}

/// Fraction of called SNPs, rounded to four decimals.
pub fn call_rate(codes: &[GenotypeCode]) -> f64 {
    if codes.is_empty() {
        return 0.0;
    }
    let called = codes.iter().filter(|code| code.is_called()).count();
    ((called as f64 / codes.len() as f64) * 10_000.0).round() / 10_000.0
}

/// Decoded-genotype store. Writes land as whole batches under one lock.
#[derive(Debug, Default)]
pub struct GenotypeStore {
    samples: RwLock<HashMap<String, SampleGenotypes>>,
}

impl GenotypeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace every sample of one upload; returns the replaced sample ids.
    pub fn commit(&self, batch: Vec<SampleGenotypes>) -> Vec<String> {
        let mut samples = self.samples.write().unwrap_or_else(|e| e.into_inner());
        let mut replaced = Vec::new();
        for sample in batch {
            let sample_id = sample.sample_id.clone();
            if samples.insert(sample_id.clone(), sample).is_some() {
                replaced.push(sample_id);
            }
        }
        replaced.sort();
        replaced
    }

    pub fn get(&self, sample_id: &str) -> Option<SampleGenotypes> {
        self.read().get(sample_id).cloned()
    }

    pub fn contains(&self, sample_id: &str) -> bool {
        self.read().contains_key(sample_id)
    }

    /// Sample ids of `candidates` that already hold genotypes, sorted.
    pub fn existing<'a>(&self, candidates: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let samples = self.read();
        let mut found: Vec<String> = candidates
            .into_iter()
            .filter(|id| samples.contains_key(*id))
            .map(str::to_string)
            .collect();
        found.sort();
        found.dedup();
        found
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn snapshot(&self) -> HashMap<String, SampleGenotypes> {
        self.read().clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, SampleGenotypes>> {
        self.samples.read().unwrap_or_else(|e| e.into_inner())
    }
}
