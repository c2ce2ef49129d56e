//! Fraud Risk Scoring - Main Entry Point
//!
//! `train` (default) fits the isolation forest on the configured dataset,
//! scores every transaction and persists the model and score ledger.
//! `score <tx_id>` looks a stored score up; `rescore <json vector>` scores
//! an ad-hoc feature vector against the persisted model.

use anyhow::{bail, Context, Result};
use fraud_risk_scoring::{
    config::{AppConfig, LoggingConfig},
    feature_extractor::FeatureExtractor,
    ledger::ScoreLedger,
    metrics::ScoringMetrics,
    models::{loader, ModelArtifact},
    simulation::SyntheticDataset,
    types::{FeatureVector, FraudAction, ScoreOutput},
    ScoringService,
};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let config_path = std::env::var("FRAUD_CONFIG").unwrap_or_else(|_| "config/config.toml".to_string());
    let config = if Path::new(&config_path).exists() {
        AppConfig::load_from_path(&config_path)?
    } else {
        AppConfig::default()
    };

    init_logging(&config.logging)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None | Some("train") => train(&config),
        Some("score") => match args.get(1) {
            Some(tx_id) => lookup(&config, tx_id),
            None => bail!("usage: fraud-risk-scoring score <transaction_id>"),
        },
        Some("rescore") => match args.get(1) {
            Some(vector) => rescore(&config, vector),
            None => bail!("usage: fraud-risk-scoring rescore '[amount, time_since_last, geo_distance]'"),
        },
        Some(other) => bail!("unknown command `{}` (expected train, score or rescore)", other),
    }
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("fraud_risk_scoring={}", logging.level).parse()?);

    match logging.format.as_str() {
        "json" => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    Ok(())
}

fn load_dataset(config: &AppConfig) -> Result<SyntheticDataset> {
    if let Some(path) = config.storage.dataset_path.as_deref() {
        if Path::new(path).exists() {
            info!(path = %path, "Loading dataset");
            return SyntheticDataset::load(path).with_context(|| format!("Failed to load dataset from {}", path));
        }
        warn!(path = %path, "Dataset file not found, simulating transactions instead");
    }

    let sim = &config.simulation;
    let mut dataset = SyntheticDataset::generate(sim.n_samples, sim.n_fraud, sim.seed)?;
    if sim.standardize {
        dataset.standardize();
    }
    Ok(dataset)
}

fn train(config: &AppConfig) -> Result<()> {
    info!("Starting fraud risk model training");

    let metrics = ScoringMetrics::new();
    let dataset = load_dataset(config)?;
    let extractor = FeatureExtractor::new();
    let vectors = extractor.extract_batch(&dataset.transactions);
    info!(
        transactions = vectors.len(),
        features = ?extractor.feature_names(),
        "Feature vectors extracted"
    );

    let fit_start = Instant::now();
    let service = ScoringService::train(&vectors, &config.training_params()).context("Model training failed")?;
    metrics.record_fit(fit_start.elapsed());

    let model_used = service.model_used()?;
    let mut ledger = ScoreLedger::new(model_used.clone(), config.action_policy());
    for (tx, vector) in dataset.transactions.iter().zip(&vectors) {
        let start = Instant::now();
        let score = service.score(vector)?;
        let record = ledger.record(&tx.transaction_id, score);
        metrics.record_score(start.elapsed(), score, record.action);
    }

    ModelArtifact::from_service(&service)?
        .save(&config.storage.model_path)
        .context("Failed to save model artifact")?;
    ledger
        .save(&config.storage.ledger_path)
        .context("Failed to save score ledger")?;

    info!(model = %model_used, "Top 5 highest risk transactions:");
    for record in ledger.top_risks(5) {
        info!(
            transaction_id = %record.transaction_id,
            fraud_score = record.raw_fraud_score,
            action = record.action.as_str(),
            "High risk transaction"
        );
    }
    info!("Top 5 lowest risk transactions:");
    for record in ledger.lowest_risks(5) {
        info!(
            transaction_id = %record.transaction_id,
            fraud_score = record.raw_fraud_score,
            action = record.action.as_str(),
            "Low risk transaction"
        );
    }

    report_detection(&dataset, &ledger);
    metrics.print_summary();
    Ok(())
}

/// Compare blocked transactions with the ground-truth labels
fn report_detection(dataset: &SyntheticDataset, ledger: &ScoreLedger) {
    let mut true_positives = 0usize;
    let mut false_positives = 0usize;
    let mut false_negatives = 0usize;

    for (tx, &is_fraud) in dataset.transactions.iter().zip(&dataset.labels) {
        let blocked = ledger
            .lookup(&tx.transaction_id)
            .map(|r| r.action == FraudAction::Blocked)
            .unwrap_or(false);
        match (blocked, is_fraud) {
            (true, true) => true_positives += 1,
            (true, false) => false_positives += 1,
            (false, true) => false_negatives += 1,
            (false, false) => {}
        }
    }

    let precision = ratio(true_positives, true_positives + false_positives);
    let recall = ratio(true_positives, true_positives + false_negatives);
    info!(
        true_positives,
        false_positives,
        false_negatives,
        precision = format!("{:.3}", precision),
        recall = format!("{:.3}", recall),
        "Detection summary at block threshold"
    );
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn lookup(config: &AppConfig, transaction_id: &str) -> Result<()> {
    let ledger = ScoreLedger::load(&config.storage.ledger_path, config.action_policy())
        .with_context(|| format!("Failed to load score ledger from {}", config.storage.ledger_path))?;
    let output = ledger.score_output(transaction_id)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn rescore(config: &AppConfig, vector: &str) -> Result<()> {
    let values: Vec<f64> = serde_json::from_str(vector).context("Feature vector must be a JSON array of numbers")?;
    let vector = FeatureVector::new(values);

    let service = loader::load_service(&config.storage.model_path)
        .with_context(|| format!("Failed to load model from {}", config.storage.model_path))?;
    let score = service.score(&vector)?;
    let output = ScoreOutput::new("adhoc", score, service.model_used()?);

    info!(
        fraud_score = score,
        outlier = service.is_outlier(&vector)?,
        byte_scale = output.to_byte_scale(),
        "Scored ad-hoc vector"
    );
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
