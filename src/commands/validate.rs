use crate::artifact::BatchManifest;
use crate::config::Config;
use crate::export::genotypes::{read_genotype_tables, write_genotype_table};
use crate::export::outcomes::JsonLinesSink;
use crate::genotype::GenotypeStore;
use crate::map_registry::{MapRegistry, RegistrySnapshot};
use crate::pipeline::{BatchPipeline, BatchReport};
use crate::validation::{ArtifactOutcome, ValidationEngine};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Subdirectory of the output directory holding one genotype table per accepted report.
pub const GENOTYPE_DIR: &str = "genotypes";

pub fn run(
    config: &Config,
    manifest: PathBuf,
    registry: PathBuf,
    output_dir: PathBuf,
    dry_run: bool,
) -> Result<()> {
    let dry_run = dry_run || config.dry_run;
    let statuses = Arc::new(config.status_registry()?);
    let maps = Arc::new(load_registry(&registry)?);
    let genotype_dir = output_dir.join(GENOTYPE_DIR);
    let store = Arc::new(load_store(&genotype_dir, &maps)?);
    let engine = Arc::new(ValidationEngine::from_config(config, statuses, Arc::clone(&maps), store)?);

    let base = manifest.parent().unwrap_or_else(|| Path::new("."));
    let artifacts = BatchManifest::load(&manifest)?.artifacts(base)?;
    info!(uploads = artifacts.len(), manifest = %manifest.display(), "manifest loaded");

    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;
    let mut sink = JsonLinesSink::append(&output_dir.join("outcomes.jsonl"))?;

    let pipeline = BatchPipeline::new(engine, config.workers).with_progress();
    let report = pipeline.run(artifacts, &mut sink)?;
    sink.into_inner()?;

    if dry_run {
        info!("dry run: registry and genotype tables left untouched");
    } else {
        fs::create_dir_all(&genotype_dir)
            .with_context(|| format!("Failed to create {}", genotype_dir.display()))?;
        for outcome in report.outcomes.iter().filter(|o| !o.genotypes.is_empty()) {
            let path = genotype_dir.join(genotype_table_name(outcome));
            write_genotype_table(&path, &outcome.genotypes)?;
            info!(upload = %outcome.upload_id, samples = outcome.genotypes.len(), path = %path.display(), "genotype table written");
        }
        maps.snapshot().save(&registry)?;
    }

    print_summary(&report);
    Ok(())
}

/// Tables of earlier runs, so reloading a sample counts as a replacement.
fn load_store(genotype_dir: &Path, maps: &MapRegistry) -> Result<GenotypeStore> {
    let store = GenotypeStore::new();
    let samples = read_genotype_tables(genotype_dir, maps)?;
    if !samples.is_empty() {
        info!(samples = samples.len(), path = %genotype_dir.display(), "stored genotypes loaded");
        store.commit(samples.into_values().collect());
    }
    Ok(store)
}

/// A missing snapshot starts an empty registry.
fn load_registry(path: &Path) -> Result<MapRegistry> {
    if path.exists() {
        let registry = MapRegistry::from_snapshot(RegistrySnapshot::load(path)?)?;
        info!(maps = registry.len(), path = %path.display(), "map registry loaded");
        Ok(registry)
    } else {
        Ok(MapRegistry::new())
    }
}

fn genotype_table_name(outcome: &ArtifactOutcome) -> String {
    let stem = Path::new(&outcome.file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| outcome.upload_id.clone());
    format!("{}_{}.csv", outcome.upload_id, stem)
}

fn print_summary(report: &BatchReport) {
    for outcome in &report.outcomes {
        println!(
            "{:<12} {:<5} {}",
            outcome.upload_id,
            outcome.code(),
            outcome.processing_notes()
        );
    }
    println!(
        "\n{} uploads: {} accepted, {} rejected",
        report.outcomes.len(),
        report.accepted(),
        report.rejected()
    );
    if report.stats.panicked > 0 {
        println!("{} uploads could not be processed", report.stats.panicked);
    }
}
