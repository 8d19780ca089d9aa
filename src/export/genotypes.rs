//! Decoded genotypes as `;`-separated tables, one row per sample.

use crate::genotype::SampleGenotypes;
use crate::map_registry::{MapId, MapRegistry};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
struct GenotypeRow {
    #[serde(rename = "Campione")]
    sample: String,
    #[serde(rename = "CallRate")]
    call_rate: f64,
    #[serde(rename = "mappa_usata")]
    map_id: String,
    #[serde(rename = "Genotipo")]
    genotype: String,
}

pub fn write_genotype_table(path: &Path, samples: &[SampleGenotypes]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .with_context(|| format!("Failed to create genotype table {}", path.display()))?;
    for sample in samples {
        writer.serialize(GenotypeRow {
            sample: sample.sample_id.clone(),
            call_rate: sample.call_rate,
            map_id: sample.map_id.to_string(),
            genotype: sample.genotype_string(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a genotype table back, aligning every row to its registered map.
pub fn read_genotype_table(path: &Path, maps: &MapRegistry) -> Result<HashMap<String, SampleGenotypes>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open genotype table {}", path.display()))?;

    let mut samples = HashMap::new();
    for (idx, row) in reader.deserialize::<GenotypeRow>().enumerate() {
        let row = row.with_context(|| format!("{}: invalid row {}", path.display(), idx + 1))?;
        let map_id = MapId::from(row.map_id.trim());
        let map = maps
            .get(&map_id)
            .ok_or_else(|| anyhow!("{}: sample {} uses unknown map {}", path.display(), row.sample, map_id))?;
        let genotypes = SampleGenotypes::from_digits(row.sample.trim().to_string(), &map, row.genotype.trim())
            .ok_or_else(|| {
                anyhow!(
                    "{}: genotype of sample {} does not fit map {} ({} SNPs)",
                    path.display(),
                    row.sample,
                    map_id,
                    map.len()
                )
            })?;
        samples.insert(genotypes.sample_id.clone(), genotypes);
    }
    Ok(samples)
}

/// Every `*.csv` table in `dir`, in file-name order; later tables win for a
/// sample listed twice. A missing directory holds no genotypes.
pub fn read_genotype_tables(dir: &Path, maps: &MapRegistry) -> Result<HashMap<String, SampleGenotypes>> {
    let mut samples = HashMap::new();
    if !dir.is_dir() {
        return Ok(samples);
    }
    let mut tables: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("Failed to list genotype tables in {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    tables.sort();
    for table in tables {
        samples.extend(read_genotype_table(&table, maps)?);
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map_registry::SnpMap;

    #[test]
    fn tables_use_semicolons_and_round_trip() {
        let maps = MapRegistry::new();
        maps.register(SnpMap::new(MapId::from("3_a"), None, vec!["A".into(), "B".into(), "C".into()]).unwrap())
            .unwrap();
        let map = maps.get(&MapId::from("3_a")).unwrap();
        let samples = vec![
            SampleGenotypes::from_digits("S1".into(), &map, "012").unwrap(),
            SampleGenotypes::from_digits("S2".into(), &map, "555").unwrap(),
        ];

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("GEN_x.csv");
        write_genotype_table(&path, &samples).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Campione;CallRate;mappa_usata;Genotipo\n"));
        assert!(text.lines().any(|line| line.starts_with("S1;") && line.ends_with(";3_a;012")));

        let back = read_genotype_table(&path, &maps).unwrap();
        assert_eq!(back.get("S1"), Some(&samples[0]));
        assert_eq!(back.get("S2").unwrap().call_rate, 0.0);
    }

    #[test]
    fn unknown_map_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        fs::write(&path, "Campione;CallRate;mappa_usata;Genotipo\nS1;1;9_z;012\n").unwrap();
        let err = read_genotype_table(&path, &MapRegistry::new()).unwrap_err();
        assert!(err.to_string().contains("unknown map 9_z"));
    }

    #[test]
    fn table_directory_merges_in_name_order() {
        let maps = MapRegistry::new();
        maps.register(SnpMap::new(MapId::from("2_a"), None, vec!["A".into(), "B".into()]).unwrap())
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        assert!(read_genotype_tables(&dir.path().join("absent"), &maps).unwrap().is_empty());

        let header = "Campione;CallRate;mappa_usata;Genotipo\n";
        fs::write(dir.path().join("a.csv"), format!("{}S1;1;2_a;00\nS2;1;2_a;11\n", header)).unwrap();
        fs::write(dir.path().join("b.csv"), format!("{}S1;1;2_a;22\n", header)).unwrap();
        fs::write(dir.path().join("notes.txt"), "not a table").unwrap();

        let samples = read_genotype_tables(dir.path(), &maps).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples["S1"].genotype_string(), "22");
    }
}
