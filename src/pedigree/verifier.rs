use super::types::{ConcordanceResult, PedigreeClaim, Thresholds};
use crate::error::PedigreeError;
use crate::genotype::{GenotypeCode, GenotypeStore, SampleGenotypes};
use crate::map_registry::SnpMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use tracing::debug;

/// Source of decoded genotypes keyed by sample id.
pub trait GenotypeLookup {
    fn genotypes(&self, sample_id: &str) -> Option<SampleGenotypes>;
}

impl GenotypeLookup for GenotypeStore {
    fn genotypes(&self, sample_id: &str) -> Option<SampleGenotypes> {
        self.get(sample_id)
    }
}

impl GenotypeLookup for HashMap<String, SampleGenotypes> {
    fn genotypes(&self, sample_id: &str) -> Option<SampleGenotypes> {
        self.get(sample_id).cloned()
    }
}

/// Alleles a parent of the given dosage can pass on, counted as A alleles.
fn transmissible(dosage: u8) -> &'static [u8] {
    match dosage {
        0 => &[0],
        1 => &[0, 1],
        _ => &[1],
    }
}

/// A single parent must share an allele with the child: 0 against 2 is the
/// only impossible pairing.
pub fn duo_consistent(parent: u8, child: u8) -> bool {
    parent.abs_diff(child) < 2
}

pub fn trio_consistent(sire: u8, dam: u8, child: u8) -> bool {
    transmissible(sire)
        .iter()
        .any(|a| transmissible(dam).iter().any(|b| a + b == child))
}

#[derive(Debug, Clone, Default)]
pub struct PedigreeVerifier {
    thresholds: Thresholds,
    panel: Option<Arc<SnpMap>>,
}

impl PedigreeVerifier {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            panel: None,
        }
    }

    /// Restrict every comparison to the SNPs of a parentage panel map.
    pub fn with_panel(mut self, panel: Arc<SnpMap>) -> Self {
        self.panel = Some(panel);
        self
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn verify<G: GenotypeLookup + ?Sized>(
        &self,
        claim: &PedigreeClaim,
        genotypes: &G,
    ) -> Result<ConcordanceResult, PedigreeError> {
        check_claim(claim)?;

        let fetch = |sample_id: &str| {
            genotypes
                .genotypes(sample_id)
                .map(|sample| match &self.panel {
                    Some(panel) => sample.project_onto(panel),
                    None => sample,
                })
                .ok_or_else(|| PedigreeError::MissingSample(sample_id.to_string()))
        };
        let child = fetch(&claim.child)?;
        let parents = claim
            .parents
            .iter()
            .map(|parent| fetch(parent))
            .collect::<Result<Vec<_>, _>>()?;

        let (mut concordant, mut discordant) = (0usize, 0usize);
        for row in joined_dosages(&child, &parents) {
            let consistent = match row.as_slice() {
                [c, p] => duo_consistent(*p, *c),
                [c, s, d] => trio_consistent(*s, *d, *c),
                _ => continue,
            };
            if consistent {
                concordant += 1;
            } else {
                discordant += 1;
            }
        }

        let compared = concordant + discordant;
        if compared == 0 {
            return Err(PedigreeError::InsufficientData {
                child: claim.child.clone(),
            });
        }
        let verdict = self.thresholds.verdict(discordant, compared);
        debug!(child = %claim.child, compared, discordant, %verdict, "pedigree verified");

        Ok(ConcordanceResult {
            claim: claim.clone(),
            concordant,
            discordant,
            compared,
            verdict,
        })
    }

    /// Verify independent claims on up to `workers` threads; results keep claim order.
    pub fn verify_all<G: GenotypeLookup + Sync + ?Sized>(
        &self,
        claims: &[PedigreeClaim],
        genotypes: &G,
        workers: usize,
    ) -> Vec<Result<ConcordanceResult, PedigreeError>> {
        if claims.is_empty() {
            return Vec::new();
        }
        let chunk = claims.len().div_ceil(workers.max(1));
        thread::scope(|scope| {
            let handles: Vec<_> = claims
                .chunks(chunk)
                .map(|part| {
                    scope.spawn(move || {
                        part.iter()
                            .map(|claim| self.verify(claim, genotypes))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .zip(claims.chunks(chunk))
                .flat_map(|(handle, part)| {
                    handle.join().unwrap_or_else(|_| {
                        part.iter()
                            .map(|claim| {
                                Err(PedigreeError::InvalidClaim {
                                    child: claim.child.clone(),
                                    reason: "verification worker panicked".to_string(),
                                })
                            })
                            .collect()
                    })
                })
                .collect()
        })
    }
}

fn check_claim(claim: &PedigreeClaim) -> Result<(), PedigreeError> {
    let invalid = |reason: String| PedigreeError::InvalidClaim {
        child: claim.child.clone(),
        reason,
    };
    let count = claim.parents.len();
    if count == 0 || count > 2 {
        return Err(invalid(format!("expected 1 or 2 parents, found {}", count)));
    }
    if count != claim.relationship.expected_parents() {
        return Err(invalid(format!(
            "relationship {} needs {} parent(s), found {}",
            claim.relationship,
            claim.relationship.expected_parents(),
            count
        )));
    }
    if claim.parents.iter().any(|parent| *parent == claim.child) {
        return Err(invalid("a sample cannot be its own parent".to_string()));
    }
    if count == 2 && claim.parents[0] == claim.parents[1] {
        return Err(invalid("both parents are the same sample".to_string()));
    }
    Ok(())
}

/// Dosage rows `[child, parent...]` for every SNP called in all samples.
/// Samples on the same map are aligned by position, otherwise joined by SNP id.
fn joined_dosages(child: &SampleGenotypes, parents: &[SampleGenotypes]) -> Vec<Vec<u8>> {
    let same_map = parents
        .iter()
        .all(|p| p.map_id == child.map_id && p.codes.len() == child.codes.len());

    let lookups: Vec<HashMap<&str, GenotypeCode>> = if same_map {
        Vec::new()
    } else {
        parents.iter().map(|p| p.iter().collect()).collect()
    };

    child
        .iter()
        .enumerate()
        .filter_map(|(idx, (snp, code))| {
            let mut row = Vec::with_capacity(parents.len() + 1);
            row.push(code.dosage()?);
            for (p_idx, parent) in parents.iter().enumerate() {
                let parent_code = if same_map {
                    parent.codes[idx]
                } else {
                    *lookups[p_idx].get(snp)?
                };
                row.push(parent_code.dosage()?);
            }
            Some(row)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map_registry::MapId;
    use crate::pedigree::{Relationship, Verdict};

    fn map(id: &str, n: usize) -> SnpMap {
        SnpMap::new(MapId::from(id), None, (0..n).map(|i| format!("SNP{}", i)).collect()).unwrap()
    }

    fn sample(id: &str, map: &SnpMap, digits: &str) -> (String, SampleGenotypes) {
        (
            id.to_string(),
            SampleGenotypes::from_digits(id.to_string(), map, digits).unwrap(),
        )
    }

    #[test]
    fn duo_rules() {
        assert!(duo_consistent(0, 1));
        assert!(duo_consistent(1, 2));
        assert!(duo_consistent(2, 2));
        assert!(!duo_consistent(0, 2));
        assert!(!duo_consistent(2, 0));
    }

    #[test]
    fn trio_rules() {
        assert!(trio_consistent(0, 2, 1));
        assert!(!trio_consistent(0, 0, 1));
        assert!(!trio_consistent(2, 2, 1));
        assert!(trio_consistent(1, 1, 0));
        assert!(trio_consistent(1, 1, 2));
        assert!(!trio_consistent(0, 1, 2));
    }

    #[test]
    fn concordant_duo_is_confirmed() {
        let m = map("40_a", 40);
        let genotypes: HashMap<_, _> = [
            sample("CALF", &m, &"1".repeat(40)),
            sample("SIRE", &m, &"2".repeat(40)),
        ]
        .into_iter()
        .collect();

        let result = PedigreeVerifier::default()
            .verify(&PedigreeClaim::duo("CALF", "SIRE", Relationship::Sire), &genotypes)
            .unwrap();
        assert_eq!((result.compared, result.discordant, result.concordant), (40, 0, 40));
        assert_eq!(result.verdict, Verdict::Confirmed);
    }

    #[test]
    fn no_calls_are_excluded_not_discordant() {
        let m = map("30_a", 30);
        let child = format!("{}{}", "2".repeat(25), "5".repeat(5));
        let parent = format!("{}{}", "5".repeat(3), "0".repeat(27));
        let genotypes: HashMap<_, _> =
            [sample("C", &m, &child), sample("P", &m, &parent)].into_iter().collect();

        let result = PedigreeVerifier::default()
            .verify(&PedigreeClaim::duo("C", "P", Relationship::Dam), &genotypes)
            .unwrap();
        assert_eq!(result.compared, 22);
        assert_eq!(result.discordant, 22);
        assert_eq!(result.verdict, Verdict::Excluded);
    }

    #[test]
    fn no_overlap_is_insufficient_data() {
        let m = map("4_a", 4);
        let genotypes: HashMap<_, _> =
            [sample("C", &m, "0055"), sample("P", &m, "5500")].into_iter().collect();
        assert_eq!(
            PedigreeVerifier::default().verify(&PedigreeClaim::duo("C", "P", Relationship::Sire), &genotypes),
            Err(PedigreeError::InsufficientData { child: "C".into() })
        );
    }

    #[test]
    fn few_compared_snps_are_inconclusive() {
        let m = map("5_a", 5);
        let genotypes: HashMap<_, _> =
            [sample("C", &m, "11111"), sample("P", &m, "11111")].into_iter().collect();
        let result = PedigreeVerifier::default()
            .verify(&PedigreeClaim::duo("C", "P", Relationship::Sire), &genotypes)
            .unwrap();
        assert_eq!(result.verdict, Verdict::Inconclusive);
    }

    #[test]
    fn trio_compares_only_fully_called_snps() {
        let m = map("40_a", 40);
        let mut child = "1".repeat(38);
        child.push_str("22");
        let sire = format!("{}{}", "0".repeat(39), "5");
        let dam = "2".repeat(40);
        let genotypes: HashMap<_, _> = [
            sample("C", &m, &child),
            sample("S", &m, &sire),
            sample("D", &m, &dam),
        ]
        .into_iter()
        .collect();

        let result = PedigreeVerifier::default()
            .verify(&PedigreeClaim::trio("C", "S", "D"), &genotypes)
            .unwrap();
        assert_eq!(result.compared, 39);
        assert_eq!(result.discordant, 1);
        assert_eq!(result.verdict, Verdict::Inconclusive);
    }

    #[test]
    fn samples_on_different_maps_join_by_snp() {
        let big = map("6_a", 6);
        let small = SnpMap::new(
            MapId::from("3_a"),
            None,
            vec!["SNP5".into(), "SNP0".into(), "OTHER".into()],
        )
        .unwrap();
        let genotypes: HashMap<_, _> =
            [sample("C", &big, "200002"), sample("P", &small, "001")].into_iter().collect();
        let verifier = PedigreeVerifier::new(Thresholds {
            min_compared_snps: 1,
            ..Thresholds::default()
        });
        let result = verifier
            .verify(&PedigreeClaim::duo("C", "P", Relationship::Sire), &genotypes)
            .unwrap();
        assert_eq!((result.compared, result.discordant), (2, 2));
        assert_eq!(result.verdict, Verdict::Excluded);
    }

    #[test]
    fn panel_restricts_comparison() {
        let m = map("4_a", 4);
        let panel = Arc::new(
            SnpMap::new(MapId::from("PANEL"), None, vec!["SNP0".into(), "SNP1".into()]).unwrap(),
        );
        let genotypes: HashMap<_, _> =
            [sample("C", &m, "1122"), sample("P", &m, "1100")].into_iter().collect();
        let verifier = PedigreeVerifier::new(Thresholds {
            min_compared_snps: 1,
            ..Thresholds::default()
        })
        .with_panel(panel);
        let result = verifier
            .verify(&PedigreeClaim::duo("C", "P", Relationship::Sire), &genotypes)
            .unwrap();
        assert_eq!((result.compared, result.discordant), (2, 0));
    }

    #[test]
    fn invalid_claims_are_rejected() {
        let m = map("2_a", 2);
        let genotypes: HashMap<_, _> = [sample("C", &m, "11")].into_iter().collect();
        let verifier = PedigreeVerifier::default();

        let own_parent = PedigreeClaim::duo("C", "C", Relationship::Sire);
        assert!(matches!(verifier.verify(&own_parent, &genotypes), Err(PedigreeError::InvalidClaim { .. })));

        let orphan = PedigreeClaim {
            child: "C".into(),
            parents: vec![],
            relationship: Relationship::Sire,
        };
        assert!(matches!(verifier.verify(&orphan, &genotypes), Err(PedigreeError::InvalidClaim { .. })));

        let mismatch = PedigreeClaim {
            child: "C".into(),
            parents: vec!["P".into()],
            relationship: Relationship::Parents,
        };
        assert!(matches!(verifier.verify(&mismatch, &genotypes), Err(PedigreeError::InvalidClaim { .. })));

        assert_eq!(
            verifier.verify(&PedigreeClaim::duo("C", "P", Relationship::Dam), &genotypes),
            Err(PedigreeError::MissingSample("P".into()))
        );
    }

    #[test]
    fn verify_all_keeps_claim_order() {
        let m = map("20_a", 20);
        let genotypes: HashMap<_, _> = [
            sample("C1", &m, &"1".repeat(20)),
            sample("C2", &m, &"2".repeat(20)),
            sample("P", &m, &"0".repeat(20)),
        ]
        .into_iter()
        .collect();
        let claims = vec![
            PedigreeClaim::duo("C1", "P", Relationship::Sire),
            PedigreeClaim::duo("C2", "P", Relationship::Sire),
            PedigreeClaim::duo("C3", "P", Relationship::Sire),
        ];
        let results = PedigreeVerifier::default().verify_all(&claims, &genotypes, 2);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().verdict, Verdict::Confirmed);
        assert_eq!(results[1].as_ref().unwrap().verdict, Verdict::Excluded);
        assert!(results[2].is_err());
    }
}
