//! Scoring service combining the forest with its frozen normalizer

use crate::error::{Result, ScoringError};
use crate::models::forest::{ForestParams, IsolationForest};
use crate::models::normalizer::ScoreNormalizer;
use crate::types::{FeatureVector, ScoreOutput};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Version of the scoring model layout
pub const MODEL_VERSION: u32 = 1;

/// Parameters for a full training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    pub forest: ForestParams,
    /// Expected outlier fraction, in (0, 1). Only sets the outlier cut-off;
    /// the fraud score itself does not depend on it.
    pub contamination: f64,
    /// Worker threads for tree construction (0 uses the global rayon pool)
    pub workers: usize,
}

impl TrainingParams {
    pub fn validate(&self) -> Result<()> {
        self.forest.validate()?;
        if !(self.contamination > 0.0 && self.contamination < 1.0) {
            return Err(ScoringError::Config(format!(
                "contamination must be in (0, 1), got {}",
                self.contamination
            )));
        }
        Ok(())
    }
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            forest: ForestParams::default(),
            contamination: 0.01,
            workers: 0,
        }
    }
}

/// Identity and provenance of a fitted model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_id: String,
    pub version: u32,
    pub seed: u64,
    pub contamination: f64,
    pub created_at: DateTime<Utc>,
}

impl ModelInfo {
    fn new(seed: u64, contamination: f64) -> Self {
        Self {
            model_id: uuid::Uuid::new_v4().to_string(),
            version: MODEL_VERSION,
            seed,
            contamination,
            created_at: Utc::now(),
        }
    }

    /// Model identifier attached to every score output
    pub fn model_used(&self) -> String {
        format!("IsolationForest ensemble v{} seed {}", self.version, self.seed)
    }
}

/// Everything needed to score once training has completed
#[derive(Debug, Clone)]
pub struct FittedModel {
    pub forest: IsolationForest,
    pub normalizer: ScoreNormalizer,
    /// Fraud score above which a transaction counts as an outlier
    pub outlier_cutoff: f64,
    pub info: ModelInfo,
}

/// Scores feature vectors on the 0-100 fraud scale.
///
/// Read-only once fitted; share it behind an `Arc` to score from many
/// threads at once.
#[derive(Debug, Clone, Default)]
pub struct ScoringService {
    model: Option<FittedModel>,
}

impl ScoringService {
    /// A service with no model; every scoring call fails with `NotFitted`.
    pub fn unfitted() -> Self {
        Self { model: None }
    }

    /// Fit the forest and its normalizer on the same batch.
    ///
    /// Nothing is returned unless both succeed.
    pub fn train(data: &[FeatureVector], params: &TrainingParams) -> Result<Self> {
        params.validate()?;
        let start = Instant::now();

        let forest = if params.workers > 0 {
            IsolationForest::fit_with_workers(data, &params.forest, params.workers)?
        } else {
            IsolationForest::fit(data, &params.forest)?
        };

        let raw_scores = forest.anomaly_scores(data)?;
        let normalizer = ScoreNormalizer::fit(&raw_scores)?;
        let fraud_scores: Vec<f64> = raw_scores.iter().map(|&raw| normalizer.apply(raw)).collect();
        let outlier_cutoff = quantile(&fraud_scores, 1.0 - params.contamination);

        info!(
            min_raw = normalizer.min_raw(),
            max_raw = normalizer.max_raw(),
            outlier_cutoff,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Scoring model trained"
        );

        Ok(Self::from_model(FittedModel {
            info: ModelInfo::new(params.forest.seed, params.contamination),
            forest,
            normalizer,
            outlier_cutoff,
        }))
    }

    pub fn from_model(model: FittedModel) -> Self {
        Self { model: Some(model) }
    }

    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Result<&FittedModel> {
        self.model.as_ref().ok_or(ScoringError::NotFitted)
    }

    /// Fraud score in [0, 100] for one vector
    pub fn score(&self, vector: &FeatureVector) -> Result<f64> {
        let model = self.model()?;
        let raw = model.forest.anomaly_score(vector)?;
        let score = model.normalizer.apply(raw);
        debug!(raw, score, "Scored vector");
        Ok(score)
    }

    /// Fraud scores for a batch, same length and order as the input.
    ///
    /// Fails on the first vector that cannot be scored.
    pub fn batch_score(&self, vectors: &[FeatureVector]) -> Result<Vec<f64>> {
        let model = self.model()?;
        vectors
            .par_iter()
            .map(|v| Ok(model.normalizer.apply(model.forest.anomaly_score(v)?)))
            .collect()
    }

    /// Rounded score with the model identifier, ready for downstream consumers
    pub fn score_output(&self, transaction_id: &str, vector: &FeatureVector) -> Result<ScoreOutput> {
        let score = self.score(vector)?;
        Ok(ScoreOutput::new(transaction_id, score, self.model()?.info.model_used()))
    }

    /// Whether the vector scores above the contamination cut-off
    pub fn is_outlier(&self, vector: &FeatureVector) -> Result<bool> {
        let cutoff = self.model()?.outlier_cutoff;
        Ok(self.score(vector)? > cutoff)
    }

    pub fn model_used(&self) -> Result<String> {
        Ok(self.model()?.info.model_used())
    }
}

/// Linearly interpolated quantile `q` in [0, 1] of `values`.
pub(crate) fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (position - lower as f64)
}
