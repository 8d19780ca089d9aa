use crate::config::Config;
use crate::export::concordance::{read_claims, write_results};
use crate::export::genotypes::read_genotype_table;
use crate::map_registry::{MapId, MapRegistry, RegistrySnapshot};
use crate::pedigree::{PedigreeVerifier, Verdict};
use crate::utils::progress_bar_builder::ProgressBarBuilder;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::info;

pub fn run(
    config: &Config,
    claims: PathBuf,
    genotypes: Vec<PathBuf>,
    registry: PathBuf,
    output_file: PathBuf,
    panel: Option<String>,
) -> Result<()> {
    let maps = MapRegistry::from_snapshot(RegistrySnapshot::load(&registry)?)?;

    let mut samples = HashMap::new();
    for table in &genotypes {
        let loaded = read_genotype_table(table, &maps)?;
        info!(samples = loaded.len(), path = %table.display(), "genotype table loaded");
        samples.extend(loaded);
    }

    let mut verifier = PedigreeVerifier::new(config.thresholds()?);
    let panel = panel.map(MapId::from).or_else(|| config.pedigree.parentage_map.clone());
    if let Some(panel_id) = panel {
        let map = maps
            .get(&panel_id)
            .ok_or_else(|| anyhow!("parentage panel {} is not a registered map", panel_id))?;
        info!(panel = %panel_id, snps = map.len(), "restricting comparisons to panel");
        verifier = verifier.with_panel(map);
    }

    let claims = read_claims(&claims)?;
    let progress = ProgressBarBuilder::new(format!("Verifying {} claims", claims.len()))
        .with_tick()
        .build()?;
    let results = verifier.verify_all(&claims, &samples, config.workers);
    progress.finish_and_clear();

    write_results(&output_file, &claims, &results)?;

    let (mut confirmed, mut inconclusive, mut excluded, mut unverifiable) = (0, 0, 0, 0);
    for result in &results {
        match result.as_ref().map(|r| r.verdict) {
            Ok(Verdict::Confirmed) => confirmed += 1,
            Ok(Verdict::Inconclusive) => inconclusive += 1,
            Ok(Verdict::Excluded) => excluded += 1,
            Err(_) => unverifiable += 1,
        }
    }
    println!(
        "{} claims: {} confirmed, {} inconclusive, {} excluded, {} unverifiable",
        claims.len(),
        confirmed,
        inconclusive,
        excluded,
        unverifiable
    );
    println!("Results written to {}", output_file.display());
    Ok(())
}
