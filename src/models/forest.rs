//! Isolation forest ensemble
//!
//! Every tree is built from its own subsample drawn without replacement and
//! from its own random source seeded with `seed ^ tree_index`, so trees can
//! be built in any order on any thread and the forest is still reproducible.

use crate::error::{Result, ScoringError};
use crate::models::tree::{average_path_length, IsolationTree};
use crate::types::FeatureVector;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Parameters controlling forest construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    /// Number of trees in the ensemble
    pub num_trees: usize,
    /// Points drawn for each tree (capped at the training set size)
    pub subsample_size: usize,
    /// Maximum tree depth; `ceil(log2(sample size))` when unset
    pub max_depth: Option<usize>,
    /// Base seed; tree `i` uses `seed ^ i`
    pub seed: u64,
}

impl ForestParams {
    pub fn new(num_trees: usize, subsample_size: usize, seed: u64) -> Self {
        Self {
            num_trees,
            subsample_size,
            max_depth: None,
            seed,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_trees < 1 {
            return Err(ScoringError::Config("num_trees must be at least 1".to_string()));
        }
        if self.subsample_size < 2 {
            return Err(ScoringError::Config(format!(
                "subsample_size must be at least 2, got {}",
                self.subsample_size
            )));
        }
        if self.max_depth == Some(0) {
            return Err(ScoringError::Config("max_depth must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Default for ForestParams {
    fn default() -> Self {
        Self::new(100, 256, 42)
    }
}

/// Default depth limit for trees built from `sample_size` points
pub fn default_max_depth(sample_size: usize) -> usize {
    ((sample_size as f64).log2().ceil() as usize).max(1)
}

/// Ensemble of isolation trees. Immutable once fitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    /// Feature count every query vector must have
    dimensions: usize,
    /// Points each tree was built from
    subsample_size: usize,
    max_depth: usize,
    seed: u64,
}

impl IsolationForest {
    /// Build the ensemble from `data`.
    pub fn fit(data: &[FeatureVector], params: &ForestParams) -> Result<Self> {
        Self::fit_with_cancel(data, params, &AtomicBool::new(false))
    }

    /// Build the ensemble on a dedicated pool of `workers` threads.
    pub fn fit_with_workers(data: &[FeatureVector], params: &ForestParams, workers: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| ScoringError::Config(format!("failed to build worker pool: {}", e)))?;
        pool.install(|| Self::fit(data, params))
    }

    /// Build the ensemble, checking `cancel` before each tree.
    ///
    /// Trees completed before cancellation are kept and the smaller forest
    /// is returned; it fails with [`ScoringError::Cancelled`] only when no
    /// tree was finished.
    pub fn fit_with_cancel(data: &[FeatureVector], params: &ForestParams, cancel: &AtomicBool) -> Result<Self> {
        Self::fit_until(data, params, |_| cancel.load(Ordering::Relaxed))
    }

    /// Build the ensemble, skipping every tree index for which `stop` holds.
    fn fit_until<F>(data: &[FeatureVector], params: &ForestParams, stop: F) -> Result<Self>
    where
        F: Fn(usize) -> bool + Sync,
    {
        params.validate()?;
        let dimensions = validate_training_data(data)?;

        let sample_size = params.subsample_size.min(data.len());
        let max_depth = params.max_depth.unwrap_or_else(|| default_max_depth(sample_size));
        let start = Instant::now();

        info!(
            trees = params.num_trees,
            sample_size,
            max_depth,
            dimensions,
            points = data.len(),
            "Fitting isolation forest"
        );

        let trees: Vec<IsolationTree> = (0..params.num_trees)
            .into_par_iter()
            .map(|index| {
                if stop(index) {
                    return None;
                }
                Some(build_tree(data, index, sample_size, max_depth, params.seed))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect();

        if trees.is_empty() {
            warn!("Forest fit cancelled before any tree was built");
            return Err(ScoringError::Cancelled);
        }
        if trees.len() < params.num_trees {
            warn!(
                completed = trees.len(),
                requested = params.num_trees,
                "Forest fit cancelled, keeping completed trees"
            );
        }

        info!(
            trees = trees.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Isolation forest fitted"
        );

        Ok(Self {
            trees,
            dimensions,
            subsample_size: sample_size,
            max_depth,
            seed: params.seed,
        })
    }

    /// Raw anomaly score `2^(-E[h(x)] / c(ψ))`; higher means more anomalous.
    ///
    /// Close to 1 for points isolated after very few splits, around 0.5
    /// for points indistinguishable from the bulk, towards 0 for points
    /// deep inside dense regions.
    pub fn anomaly_score(&self, vector: &FeatureVector) -> Result<f64> {
        self.check_dimensions(vector)?;
        if self.trees.is_empty() {
            return Err(ScoringError::NotFitted);
        }

        let total: f64 = self
            .trees
            .iter()
            .map(|tree| tree.path_length(vector.values()))
            .sum();
        let avg_path_length = total / self.trees.len() as f64;

        Ok(2f64.powf(-avg_path_length / average_path_length(self.subsample_size)))
    }

    /// Anomaly scores for a batch, in input order.
    pub fn anomaly_scores(&self, vectors: &[FeatureVector]) -> Result<Vec<f64>> {
        vectors.par_iter().map(|v| self.anomaly_score(v)).collect()
    }

    /// Library-compatible decision function: negative for outliers.
    pub fn decision_function(&self, vector: &FeatureVector) -> Result<f64> {
        Ok(0.5 - self.anomaly_score(vector)?)
    }

    fn check_dimensions(&self, vector: &FeatureVector) -> Result<()> {
        if vector.dim() != self.dimensions {
            return Err(ScoringError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.dim(),
            });
        }
        Ok(())
    }

    pub fn trees(&self) -> &[IsolationTree] {
        &self.trees
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn subsample_size(&self) -> usize {
        self.subsample_size
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Structural check for a forest restored from storage
    pub fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(ScoringError::InvalidArtifact("forest has no trees".to_string()));
        }
        if self.dimensions == 0 {
            return Err(ScoringError::InvalidArtifact("forest has zero dimensions".to_string()));
        }
        if self.subsample_size < 2 {
            return Err(ScoringError::InvalidArtifact(format!(
                "subsample size {} is below 2",
                self.subsample_size
            )));
        }
        for (index, tree) in self.trees.iter().enumerate() {
            tree.validate(self.dimensions).map_err(|e| match e {
                ScoringError::InvalidArtifact(msg) => {
                    ScoringError::InvalidArtifact(format!("tree {}: {}", index, msg))
                }
                other => other,
            })?;
        }
        Ok(())
    }
}

fn build_tree(
    data: &[FeatureVector],
    index: usize,
    sample_size: usize,
    max_depth: usize,
    seed: u64,
) -> IsolationTree {
    let mut rng = StdRng::seed_from_u64(seed ^ index as u64);
    let sample: Vec<&FeatureVector> = rand::seq::index::sample(&mut rng, data.len(), sample_size)
        .into_iter()
        .map(|i| &data[i])
        .collect();

    let tree = IsolationTree::build(&sample, max_depth, &mut rng);
    debug!(tree = index, nodes = tree.nodes().len(), height = tree.height(), "Built isolation tree");
    tree
}

/// Returns the shared dimensionality of `data`.
fn validate_training_data(data: &[FeatureVector]) -> Result<usize> {
    if data.len() < 2 {
        return Err(ScoringError::Config(format!(
            "at least 2 training vectors are required, got {}",
            data.len()
        )));
    }

    let dimensions = data[0].dim();
    if dimensions == 0 {
        return Err(ScoringError::Config("feature vectors must have at least one feature".to_string()));
    }

    for (index, vector) in data.iter().enumerate() {
        if vector.dim() != dimensions {
            return Err(ScoringError::Config(format!(
                "training vector {} has {} features, expected {}",
                index,
                vector.dim(),
                dimensions
            )));
        }
        if !vector.is_finite() {
            return Err(ScoringError::Config(format!(
                "training vector {} contains a non-finite value",
                index
            )));
        }
    }

    Ok(dimensions)
}
