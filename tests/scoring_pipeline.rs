//! End-to-end training and scoring scenarios

use fraud_risk_scoring::models::loader::{load_service, ModelArtifact};
use fraud_risk_scoring::models::normalizer::DEGENERATE_SCORE;
use fraud_risk_scoring::simulation::SyntheticDataset;
use fraud_risk_scoring::{
    FeatureExtractor, FeatureVector, ForestParams, ScoreNormalizer, ScoringError, ScoringService,
    TrainingParams,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

fn gaussian_cluster(rng: &mut StdRng, center: [f64; 3], n: usize) -> Vec<FeatureVector> {
    let noise = Normal::new(0.0, 0.5).unwrap();
    (0..n)
        .map(|_| {
            FeatureVector::new(center.iter().map(|c| c + noise.sample(&mut *rng)).collect())
        })
        .collect()
}

fn params(num_trees: usize, subsample_size: usize, seed: u64) -> TrainingParams {
    TrainingParams {
        forest: ForestParams::new(num_trees, subsample_size, seed),
        contamination: 0.01,
        workers: 0,
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[test]
fn far_cluster_scores_high_and_bulk_scores_low() {
    let mut rng = StdRng::seed_from_u64(2024);
    let mut data = gaussian_cluster(&mut rng, [5.0, 5.0, 2.0], 990);
    data.extend(gaussian_cluster(&mut rng, [15.0, 15.0, 10.0], 10));

    let service = ScoringService::train(&data, &params(100, 128, 42)).unwrap();
    let scores = service.batch_score(&data).unwrap();

    let near = mean(&scores[..990]);
    let far = mean(&scores[990..]);
    assert!(far >= 80.0, "far cluster mean {} below 80", far);
    assert!(near <= 20.0, "near cluster mean {} above 20", near);
}

#[test]
fn single_outlier_beats_every_cluster_point() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut data = gaussian_cluster(&mut rng, [5.0, 5.0, 2.0], 500);
    data.push(FeatureVector::from([30.0, 30.0, 30.0]));

    let service = ScoringService::train(&data, &params(100, 256, 42)).unwrap();
    let scores = service.batch_score(&data).unwrap();
    let outlier = scores[500];

    assert!(scores[..500].iter().all(|s| *s < outlier));
}

#[test]
fn identical_inputs_give_identical_scores() {
    let mut rng = StdRng::seed_from_u64(99);
    let data = gaussian_cluster(&mut rng, [0.0, 0.0, 0.0], 600);
    let query = FeatureVector::from([1.2, -0.4, 2.5]);

    let a = ScoringService::train(&data, &params(60, 128, 1234)).unwrap();
    let mut threaded = params(60, 128, 1234);
    threaded.workers = 3;
    let b = ScoringService::train(&data, &threaded).unwrap();

    assert_eq!(a.score(&query).unwrap(), b.score(&query).unwrap());
    assert_eq!(a.batch_score(&data).unwrap(), b.batch_score(&data).unwrap());
}

#[test]
fn scores_stay_in_range_far_outside_training_data() {
    let mut rng = StdRng::seed_from_u64(5);
    let data = gaussian_cluster(&mut rng, [5.0, 5.0, 2.0], 300);
    let service = ScoringService::train(&data, &params(50, 128, 42)).unwrap();

    for query in [
        [1e12, 1e12, 1e12],
        [-1e12, 0.0, 1e12],
        [5.0, 5.0, 2.0],
        [f64::MAX, f64::MIN, 0.0],
    ] {
        let score = service.score(&FeatureVector::from(query)).unwrap();
        assert!((0.0..=100.0).contains(&score), "score {} out of range", score);
    }
}

#[test]
fn longer_vector_is_a_dimension_mismatch() {
    let mut rng = StdRng::seed_from_u64(6);
    let data = gaussian_cluster(&mut rng, [5.0, 5.0, 2.0], 100);
    let service = ScoringService::train(&data, &params(10, 64, 42)).unwrap();

    let result = service.score(&FeatureVector::from([5.0, 5.0, 2.0, 0.0]));
    assert!(matches!(
        result,
        Err(ScoringError::DimensionMismatch { expected: 3, actual: 4 })
    ));
}

#[test]
fn unfitted_service_reports_not_fitted() {
    let service = ScoringService::unfitted();
    assert!(matches!(
        service.score(&FeatureVector::from([5.0, 5.0, 2.0])),
        Err(ScoringError::NotFitted)
    ));
}

#[test]
fn invalid_config_fails_before_training() {
    let mut rng = StdRng::seed_from_u64(8);
    let data = gaussian_cluster(&mut rng, [5.0, 5.0, 2.0], 50);

    assert!(matches!(
        ScoringService::train(&data, &params(0, 64, 1)),
        Err(ScoringError::Config(_))
    ));
    assert!(matches!(
        ScoringService::train(&data, &params(10, 1, 1)),
        Err(ScoringError::Config(_))
    ));
}

#[test]
fn normalizer_endpoints_and_degenerate_batch() {
    let normalizer = ScoreNormalizer::fit(&[0.31, 0.74, 0.52]).unwrap();
    assert_eq!(normalizer.apply(0.31), 0.0);
    assert_eq!(normalizer.apply(0.74), 100.0);

    let flat = ScoreNormalizer::fit(&[0.6; 8]).unwrap();
    assert_eq!(flat.apply(0.6), DEGENERATE_SCORE);
    assert_eq!(flat.apply(0.9), DEGENERATE_SCORE);
}

#[test]
fn persisted_model_reuses_frozen_scale() {
    let dataset = SyntheticDataset::generate(1000, 10, 42).unwrap();
    let vectors = FeatureExtractor::new().extract_batch(&dataset.transactions);
    let service = ScoringService::train(&vectors, &params(40, 128, 42)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("models").join("forest.json");
    ModelArtifact::from_service(&service).unwrap().save(&path).unwrap();
    let restored = load_service(&path).unwrap();

    let query = FeatureVector::from([14.0, 16.0, 9.5]);
    assert_eq!(service.score(&query).unwrap(), restored.score(&query).unwrap());
    assert_eq!(
        service.model_used().unwrap(),
        restored.model_used().unwrap()
    );
    assert_eq!(
        service.batch_score(&vectors[..50]).unwrap(),
        restored.batch_score(&vectors[..50]).unwrap()
    );
}

#[test]
fn loading_a_missing_artifact_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        load_service(dir.path().join("absent.json")),
        Err(ScoringError::Io(_))
    ));
}
