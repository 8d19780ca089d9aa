mod common;

use common::{engine, map_upload, report_upload, snp_names};
use progen_tools::artifact::{ArtifactEntry, Provenance, UploadKind, UploadedArtifact};
use progen_tools::map_registry::MapId;
use progen_tools::pipeline::BatchPipeline;
use progen_tools::status::StatusKey;
use progen_tools::validation::{ArtifactOutcome, OutcomeDetail};

// End-to-end batches through the worker pool. Each upload ends in exactly one
// catalog status; maps settle before any report in the same batch is matched.

fn calls(sample: usize, snp: usize) -> &'static str {
    ["AA", "AB", "BB", "AB", "--"][(sample * 3 + snp) % 5]
}

#[test]
fn map_then_reports_in_one_batch() {
    let snps = snp_names(50);
    let batch = vec![
        report_upload("r1", "Bovine50.bpm", &["COW1", "COW2", "COW3"], &snps, calls),
        map_upload("m1", &snps, Provenance::default()),
    ];

    let pipeline = BatchPipeline::new(engine(), 4);
    let mut sink: Vec<ArtifactOutcome> = Vec::new();
    let report = pipeline.run(batch, &mut sink).expect("batch runs");

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.outcomes[0].upload_id, "r1");
    assert_eq!(report.outcomes[0].code(), "g_I");
    assert!(report.outcomes[0].has_milestone(StatusKey::g_D));
    assert_eq!(report.outcomes[1].code(), "m_E");
    // the sink sees the map first
    assert_eq!(sink[0].upload_id, "m1");

    let store = pipeline.engine().store();
    assert_eq!(store.len(), 3);
    let cow1 = store.get("COW1").expect("COW1 stored");
    assert_eq!(cow1.map_id, MapId::from("50_a"));
    assert_eq!(cow1.codes.len(), 50);
}

#[test]
fn reloading_the_same_samples_reports_overwrites() {
    let snps = snp_names(50);
    let pipeline = BatchPipeline::new(engine(), 2);
    let mut sink: Vec<ArtifactOutcome> = Vec::new();
    pipeline
        .run(
            vec![
                map_upload("m1", &snps, Provenance::default()),
                report_upload("r1", "Bovine50.bpm", &["COW1", "COW2"], &snps, calls),
            ],
            &mut sink,
        )
        .expect("first batch");

    let second = pipeline
        .run(
            vec![report_upload("r2", "Bovine50.bpm", &["COW2", "COW9"], &snps, calls)],
            &mut sink,
        )
        .expect("second batch");

    let outcome = &second.outcomes[0];
    assert_eq!(outcome.code(), "g_K");
    match &outcome.detail {
        Some(OutcomeDetail::GenotypesLoaded { summary, .. }) => {
            assert_eq!(summary.ready, 2);
            assert_eq!(summary.overwritten, 1);
            assert_eq!(summary.first_overwritten, vec!["COW2".to_string()]);
        }
        other => panic!("unexpected detail {:?}", other),
    }
    assert!(outcome.processing_notes().starts_with("2 genotypes ready to be uploaded."));
}

#[test]
fn report_missing_two_snps_of_declared_map() {
    let snps = snp_names(50);
    let declared = Provenance {
        map_id: Some(MapId::from("BOV50")),
        ..Provenance::default()
    };
    let pipeline = BatchPipeline::new(engine(), 2);
    let mut sink: Vec<ArtifactOutcome> = Vec::new();
    let report = pipeline
        .run(
            vec![
                map_upload("m1", &snps, declared.clone()),
                report_upload("r1", "Bovine50.bpm", &["COW1"], &snps[..48], calls).with_provenance(declared),
            ],
            &mut sink,
        )
        .expect("batch runs");

    assert_eq!(report.outcomes[0].code(), "m_E");
    let rejected = &report.outcomes[1];
    assert_eq!(rejected.code(), "g_N");
    assert!(!rejected.is_success());
    assert!(matches!(
        rejected.detail,
        Some(OutcomeDetail::MapMismatch { expected: 50, found: 48, missing: 2, .. })
    ));
    assert!(pipeline.engine().store().is_empty());
}

#[test]
fn rejected_maps_leave_the_registry_unchanged() {
    let mut snps = snp_names(10);
    snps[7] = snps[2].clone();
    let pipeline = BatchPipeline::new(engine(), 2);
    let mut sink: Vec<ArtifactOutcome> = Vec::new();
    let report = pipeline
        .run(
            vec![
                map_upload("dup", &snps, Provenance::default()),
                UploadedArtifact::new("two", UploadKind::Map, "MAP_two.zip")
                    .with_entry(ArtifactEntry::new("a.txt", "Index\tName\n1\tX\n"))
                    .with_entry(ArtifactEntry::new("b.txt", "Index\tName\n1\tY\n")),
                UploadedArtifact::new("empty", UploadKind::Map, "MAP_empty.txt")
                    .with_entry(ArtifactEntry::new("empty.txt", "")),
            ],
            &mut sink,
        )
        .expect("batch runs");

    let codes: Vec<&str> = report.outcomes.iter().map(|o| o.code()).collect();
    assert_eq!(codes, vec!["m_A", "m_C", "c_B"]);
    assert_eq!(report.rejected(), 3);
    assert!(pipeline.engine().maps().is_empty());
}

#[test]
fn declared_kind_must_match_content() {
    let snps = snp_names(12);
    let pipeline = BatchPipeline::new(engine(), 1);
    let mut sink: Vec<ArtifactOutcome> = Vec::new();

    let mut as_map = report_upload("r1", "Chip12.bpm", &["S1"], &snps, calls);
    as_map.kind = UploadKind::Map;
    let report = pipeline.run(vec![as_map], &mut sink).expect("batch runs");

    assert_eq!(report.outcomes[0].code(), "c_A");
    assert!(pipeline.engine().maps().is_empty());
}

#[test]
fn ambiguous_separators_are_rejected_without_registering() {
    // comma and semicolon both split every line into two consistent columns,
    // and neither yields a bare `Name` column
    let text = "Index,Name;Position\n1,rs00001;1200\n2,rs00002;1850\n3,rs00003;2210\n";
    let upload = UploadedArtifact::new("amb", UploadKind::Map, "MAP_amb.txt")
        .with_entry(ArtifactEntry::new("amb.txt", text));

    let pipeline = BatchPipeline::new(engine(), 1);
    let mut sink: Vec<ArtifactOutcome> = Vec::new();
    let report = pipeline.run(vec![upload], &mut sink).expect("batch runs");

    let outcome = &report.outcomes[0];
    assert_eq!(outcome.code(), "c_A");
    assert!(!outcome.is_success());
    assert!(outcome.processing_notes().contains("parse the header differently"));
    assert!(pipeline.engine().maps().is_empty());
}

#[test]
fn declared_id_on_a_known_map_resolves_later_reports() {
    let snps = snp_names(30);
    let pipeline = BatchPipeline::new(engine(), 2);
    let mut sink: Vec<ArtifactOutcome> = Vec::new();
    pipeline
        .run(vec![map_upload("m1", &snps, Provenance::default())], &mut sink)
        .expect("first batch");

    let declared = Provenance {
        map_id: Some(MapId::from("LAB_30K")),
        ..Provenance::default()
    };
    let report = pipeline
        .run(
            vec![
                map_upload("m2", &snps, declared.clone()),
                report_upload("r1", "Lab30.bpm", &["COW1"], &snps, calls).with_provenance(declared),
            ],
            &mut sink,
        )
        .expect("second batch");

    assert_eq!(report.outcomes[0].code(), "m_D");
    assert_eq!(report.outcomes[1].code(), "g_I");
    assert_eq!(pipeline.engine().maps().len(), 1);
    assert_eq!(pipeline.engine().store().get("COW1").expect("COW1 stored").map_id, MapId::from("30_a"));
}
