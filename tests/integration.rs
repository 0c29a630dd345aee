//! Integration tests for SegmentForge

use std::io::Write;

use polars::prelude::*;
use proptest::prelude::*;
use segmentforge::{
    generate_segment_explanations, standardize, ClusterPredictor, ClusterTrainer, KMeansConfig,
    ModelStore, RecordSet, RuleSegment, SegmentError, SegmentationConfig, Segmenter,
    StandardizedRecordSet, AGE, ANNUAL_INCOME, ML_SEGMENT_COLUMN, PC1_COLUMN, PC2_COLUMN,
    RULE_SEGMENT_COLUMN, SPENDING_SCORE,
};
use tempfile::{tempdir, NamedTempFile};

/// Create a test CSV file with sample customers
fn create_test_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "CustomerID,Gender,Age,Annual Income (k$),Spending Score (1-100)"
    )
    .unwrap();

    // Young high earners who spend a lot
    writeln!(file, "1,Female,23,88,82").unwrap();
    writeln!(file, "2,Male,27,95,77").unwrap();
    writeln!(file, "3,Female,25,79,90").unwrap();
    writeln!(file, "4,Male,29,101,85").unwrap();

    // Older low earners who spend little, one with a missing age
    writeln!(file, "5,Male,61,18,9").unwrap();
    writeln!(file, "6,Female,,22,14").unwrap();
    writeln!(file, "7,Male,66,15,6").unwrap();
    writeln!(file, "8,Female,58,25,11").unwrap();

    // Middle of the road
    writeln!(file, "9,Female,40,50,50").unwrap();
    writeln!(file, "10,Male,44,55,48").unwrap();
    writeln!(file, "11,Female,38,48,55").unwrap();
    writeln!(file, "12,Male,42,52,45").unwrap();

    file
}

fn segmenter(store: &ModelStore) -> Segmenter {
    Segmenter::new(SegmentationConfig::default().with_store(store.clone()))
}

#[test]
fn test_rule_based_reference_scenario() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Age,Annual Income (k$),Spending Score (1-100)").unwrap();
    writeln!(file, "25,80,70").unwrap();
    writeln!(file, "60,20,10").unwrap();
    writeln!(file, "40,50,50").unwrap();

    let dir = tempdir().unwrap();
    let result = segmenter(&ModelStore::new(dir.path()))
        .run_rule_based_segmentation(file.path())
        .unwrap();

    assert_eq!(
        result.labels,
        vec![
            RuleSegment::HighValue,
            RuleSegment::LowValue,
            RuleSegment::MediumValue
        ]
    );
    assert_eq!(result.summary.count(RuleSegment::HighValue), 1);
    assert_eq!(result.summary.count(RuleSegment::LowValue), 1);
    assert_eq!(result.summary.count(RuleSegment::MediumValue), 1);
    assert_eq!(result.summary.total(), 3);
}

#[test]
fn test_end_to_end_clustering() {
    let file = create_test_csv();
    let dir = tempdir().unwrap();
    let store = ModelStore::new(dir.path().join("models"));

    let original = RecordSet::from_csv(file.path()).unwrap();
    let result = segmenter(&store).run_ml_segmentation(file.path(), 3).unwrap();

    // Every row labeled, ids in range, summary conserved
    assert_eq!(result.data.len(), 12);
    assert!(result.labels.iter().all(|&label| label < 3));
    assert_eq!(result.summary.total(), 12);
    assert_eq!(result.summary.len(), 3);

    // The three generating groups come back as three clusters
    for group in result.labels.chunks(4) {
        assert!(group.iter().all(|&label| label == group[0]));
    }
    assert_ne!(result.labels[0], result.labels[4]);
    assert_ne!(result.labels[0], result.labels[8]);
    assert_ne!(result.labels[4], result.labels[8]);

    // Original columns survive untouched, new ones are appended
    let mut expected_columns = original.column_names();
    expected_columns.extend([ML_SEGMENT_COLUMN, PC1_COLUMN, PC2_COLUMN].map(String::from));
    assert_eq!(result.data.column_names(), expected_columns);
    for column in original.column_names() {
        assert_eq!(
            result.data.text_column(&column).unwrap(),
            original.text_column(&column).unwrap(),
            "column {} changed",
            column
        );
    }

    assert_eq!(result.model_path, store.handle());
    assert!(result.model_path.exists());
}

#[test]
fn test_labeled_output_round_trips_through_csv() {
    let file = create_test_csv();
    let dir = tempdir().unwrap();
    let result = segmenter(&ModelStore::new(dir.path()))
        .run_ml_segmentation(file.path(), 2)
        .unwrap();

    let output = dir.path().join("segmented_customers.csv");
    result.data.save_csv(&output).unwrap();

    let reloaded = RecordSet::from_csv(&output).unwrap();
    assert_eq!(reloaded.len(), 12);
    assert_eq!(reloaded.column_names(), result.data.column_names());
    let labels: Vec<Option<f64>> = result.labels.iter().map(|&l| Some(l as f64)).collect();
    assert_eq!(reloaded.numeric_column(ML_SEGMENT_COLUMN).unwrap(), labels);
}

#[test]
fn test_predict_before_training_fails() {
    let file = create_test_csv();
    let dir = tempdir().unwrap();
    let store = ModelStore::new(dir.path().join("never-written"));

    let records = RecordSet::from_csv(file.path()).unwrap();
    let standardized = standardize(&records).unwrap();

    let result =
        ClusterPredictor::new(store.clone()).predict(&records, &standardized, &store.handle());
    assert!(matches!(result, Err(SegmentError::ModelLoad { .. })));
}

#[test]
fn test_well_separated_groups_recovered() {
    let mut rows = Vec::new();
    for i in 0..10 {
        let jitter = i as f64 * 0.01;
        rows.extend_from_slice(&[-2.0 + jitter, -2.0 - jitter, -2.0 + jitter]);
    }
    for i in 0..10 {
        let jitter = i as f64 * 0.01;
        rows.extend_from_slice(&[2.0 - jitter, 2.0 + jitter, 2.0 - jitter]);
    }
    let features = ndarray::Array2::from_shape_vec((20, 3), rows).unwrap();
    let data = StandardizedRecordSet::from_features(features).unwrap();

    let dir = tempdir().unwrap();
    let store = ModelStore::new(dir.path());
    let handle = ClusterTrainer::new(store.clone(), KMeansConfig::default())
        .train(&data, 2)
        .unwrap();

    let ids: Vec<i64> = (0..20).collect();
    let original = RecordSet::from_frame(df!("CustomerID" => ids).unwrap());
    let labeled = ClusterPredictor::new(store)
        .predict(&original, &data, &handle)
        .unwrap();

    let first = labeled.labels[0];
    let second = labeled.labels[10];
    assert_ne!(first, second);
    assert!(labeled.labels[..10].iter().all(|&l| l == first));
    assert!(labeled.labels[10..].iter().all(|&l| l == second));
}

#[test]
fn test_missing_feature_column_fails_both_paths() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Age,Annual Income (k$)").unwrap();
    writeln!(file, "30,80").unwrap();
    writeln!(file, "40,20").unwrap();

    let dir = tempdir().unwrap();
    let segmenter = segmenter(&ModelStore::new(dir.path()));

    let rules = segmenter.run_rule_based_segmentation(file.path());
    assert!(
        matches!(rules, Err(SegmentError::MissingColumn { ref column }) if column == SPENDING_SCORE)
    );

    let clusters = segmenter.run_ml_segmentation(file.path(), 2);
    assert!(matches!(
        clusters,
        Err(SegmentError::MissingColumn { ref column }) if column == SPENDING_SCORE
    ));
}

#[test]
fn test_explanations_for_rule_segments() {
    let file = create_test_csv();
    let dir = tempdir().unwrap();
    let result = segmenter(&ModelStore::new(dir.path()))
        .run_rule_based_segmentation(file.path())
        .unwrap();

    let explanations = generate_segment_explanations(&result.data, RULE_SEGMENT_COLUMN).unwrap();
    assert_eq!(explanations.len(), 3);
    assert!(explanations["High Value"].ends_with("High-value, premium customers."));
    assert!(explanations["Low Value"].ends_with("Low engagement, price-sensitive customers."));
    assert!(explanations["Medium Value"].ends_with("Medium-value, balanced customers."));
}

#[test]
fn test_model_reused_on_new_records() {
    let file = create_test_csv();
    let dir = tempdir().unwrap();
    let store = ModelStore::new(dir.path());
    segmenter(&store).run_ml_segmentation(file.path(), 3).unwrap();

    // A later batch is standardized on its own statistics and scored with the saved model
    let batch = RecordSet::from_frame(
        df!(
            AGE => &[24i64, 63, 41],
            ANNUAL_INCOME => &[90i64, 19, 51],
            SPENDING_SCORE => &[84i64, 8, 49]
        )
        .unwrap(),
    );
    let standardized = standardize(&batch).unwrap();
    let labeled = ClusterPredictor::new(store).predict_active(&batch, &standardized).unwrap();

    assert_eq!(labeled.records.len(), 3);
    assert!(labeled.labels.iter().all(|&label| label < 3));
}

#[test]
fn test_late_decimal_income_loads_for_both_methods() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "CustomerID,Gender,Age,Annual Income (k$),Spending Score (1-100)"
    )
    .unwrap();
    for id in 1..=150 {
        let gender = if id % 2 == 0 { "Female" } else { "Male" };
        match id {
            120 => writeln!(file, "120,Female,33,45.5,60").unwrap(),
            135 => writeln!(file, "135,Male,NA,72,65").unwrap(),
            _ => writeln!(
                file,
                "{},{},{},{},{}",
                id,
                gender,
                18 + id % 50,
                15 + (id * 7) % 120,
                1 + (id * 13) % 99
            )
            .unwrap(),
        }
    }

    let dir = tempdir().unwrap();
    let segmenter = segmenter(&ModelStore::new(dir.path()));

    let rules = segmenter.run_rule_based_segmentation(file.path()).unwrap();
    assert_eq!(rules.data.len(), 150);
    assert_eq!(rules.labels[119], RuleSegment::MediumValue);
    assert_eq!(
        rules.data.numeric_column(ANNUAL_INCOME).unwrap()[119],
        Some(45.5)
    );

    let clusters = segmenter.run_ml_segmentation(file.path(), 3).unwrap();
    assert_eq!(clusters.data.len(), 150);
    assert_eq!(clusters.summary.total(), 150);
    assert!(clusters.labels.iter().all(|&label| label < 3));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_cluster_ids_bounded_and_summary_conserved(
        rows in prop::collection::vec((18i64..80, 10i64..140, 1i64..100), 8..30),
        k in 2usize..5
    ) {
        let ages: Vec<i64> = rows.iter().map(|r| r.0).collect();
        let incomes: Vec<i64> = rows.iter().map(|r| r.1).collect();
        let spendings: Vec<i64> = rows.iter().map(|r| r.2).collect();
        let records = RecordSet::from_frame(
            df!(AGE => ages, ANNUAL_INCOME => incomes, SPENDING_SCORE => spendings).unwrap(),
        );

        let dir = tempdir().unwrap();
        match segmenter(&ModelStore::new(dir.path())).run_cluster_based(&records, k) {
            Ok(result) => {
                prop_assert_eq!(result.data.len(), rows.len());
                prop_assert_eq!(result.summary.total(), rows.len());
                prop_assert!(result.labels.iter().all(|&label| label < k));
            }
            // Random columns can be constant or have fewer distinct rows than k
            Err(SegmentError::DegenerateInput { .. })
            | Err(SegmentError::InvalidParameter { .. }) => {}
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }
}
