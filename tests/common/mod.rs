#![allow(dead_code)]

use progen_tools::artifact::{ArtifactEntry, Provenance, UploadKind, UploadedArtifact};
use progen_tools::config::Config;
use progen_tools::genotype::GenotypeStore;
use progen_tools::map_registry::MapRegistry;
use progen_tools::status::StatusRegistry;
use progen_tools::validation::ValidationEngine;
use std::sync::Arc;

pub fn engine() -> Arc<ValidationEngine> {
    let config = Config::default();
    let engine = ValidationEngine::from_config(
        &config,
        Arc::new(StatusRegistry::builtin().expect("builtin catalog")),
        Arc::new(MapRegistry::new()),
        Arc::new(GenotypeStore::new()),
    )
    .expect("engine from default config");
    Arc::new(engine)
}

pub fn snp_names(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("rs{:05}", i)).collect()
}

pub fn map_upload(id: &str, snps: &[String], provenance: Provenance) -> UploadedArtifact {
    let mut text = String::from("Index\tName\tChromosome\tPosition\n");
    for (idx, snp) in snps.iter().enumerate() {
        text.push_str(&format!("{}\t{}\t{}\t{}\n", idx + 1, snp, idx % 29 + 1, 10_000 + idx * 7));
    }
    UploadedArtifact::new(id, UploadKind::Map, format!("MAP_{}.txt", id))
        .with_entry(ArtifactEntry::new(format!("{}.txt", id), text))
        .with_provenance(provenance)
}

/// A tab-separated final report; `call(sample, snp)` gives the two-letter call.
pub fn report_upload(
    id: &str,
    chip: &str,
    samples: &[&str],
    snps: &[String],
    call: impl Fn(usize, usize) -> &'static str,
) -> UploadedArtifact {
    let mut text = format!(
        "[Header]\nGSGT Version\t2.0.4\nProcessing Date\t3/14/2025 9:12 AM\nContent\t\t{}\nNum SNPs\t{}\nNum Samples\t{}\n[Data]\nSNP Name\tSample ID\tAllele1 - AB\tAllele2 - AB\tGC Score\n",
        chip,
        snps.len(),
        samples.len()
    );
    for (s_idx, sample) in samples.iter().enumerate() {
        for (n_idx, snp) in snps.iter().enumerate() {
            let (a1, a2) = call(s_idx, n_idx).split_at(1);
            text.push_str(&format!("{}\t{}\t{}\t{}\t0.8731\n", snp, sample, a1, a2));
        }
    }
    UploadedArtifact::new(id, UploadKind::Genotype, format!("GEN_{}.txt", id))
        .with_entry(ArtifactEntry::new(format!("{}.txt", id), text))
}
