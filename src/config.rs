//! Configuration management for the fraud risk scoring engine

use crate::error::ScoringError;
use crate::ledger::ActionPolicy;
use crate::models::forest::ForestParams;
use crate::models::inference::TrainingParams;
use crate::types::score::RiskLevelThresholds;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub forest: ForestConfig,
    pub scoring: ScoringConfig,
    pub storage: StorageConfig,
    pub simulation: SimulationConfig,
    pub logging: LoggingConfig,
}

/// Isolation forest configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ForestConfig {
    /// Number of trees in the ensemble
    pub num_trees: usize,
    /// Points drawn per tree
    pub subsample_size: usize,
    /// Depth limit; defaults to ceil(log2(subsample_size))
    #[serde(default)]
    pub max_depth: Option<usize>,
    /// Base seed for per-tree random sources
    pub seed: u64,
    /// Expected outlier fraction (metadata and outlier cut-off only)
    pub contamination: f64,
    /// Worker threads for tree construction (0 = all cores)
    #[serde(default)]
    pub workers: usize,
}

/// Score interpretation configuration (0-100 scale)
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    /// Scores at or above this are blocked
    pub block_threshold: u8,
    /// Scores at or above this are flagged for review
    pub flag_threshold: u8,
    /// Risk level classification thresholds
    pub risk_levels: RiskLevelThresholds,
}

/// Storage locations
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Persisted model artifact
    pub model_path: String,
    /// Scored transaction ledger
    pub ledger_path: String,
    /// Dataset to train on; simulated when unset or missing
    #[serde(default)]
    pub dataset_path: Option<String>,
}

/// Synthetic data configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    pub n_samples: usize,
    pub n_fraud: usize,
    pub seed: u64,
    /// Z-score features before training
    #[serde(default = "default_standardize")]
    pub standardize: bool,
}

fn default_standardize() -> bool {
    true
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path.
    ///
    /// `FRAUD_`-prefixed environment variables override file values,
    /// e.g. `FRAUD_FOREST__NUM_TREES=200`.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("FRAUD").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject invalid parameters before any tree is built
    pub fn validate(&self) -> std::result::Result<(), ScoringError> {
        self.training_params().validate()?;
        if self.scoring.flag_threshold > self.scoring.block_threshold {
            return Err(ScoringError::Config(format!(
                "flag_threshold ({}) must not exceed block_threshold ({})",
                self.scoring.flag_threshold, self.scoring.block_threshold
            )));
        }
        if self.scoring.block_threshold > 100 {
            return Err(ScoringError::Config(format!(
                "block_threshold must be at most 100, got {}",
                self.scoring.block_threshold
            )));
        }
        Ok(())
    }

    pub fn training_params(&self) -> TrainingParams {
        TrainingParams {
            forest: ForestParams {
                num_trees: self.forest.num_trees,
                subsample_size: self.forest.subsample_size,
                max_depth: self.forest.max_depth,
                seed: self.forest.seed,
            },
            contamination: self.forest.contamination,
            workers: self.forest.workers,
        }
    }

    pub fn action_policy(&self) -> ActionPolicy {
        ActionPolicy {
            flag_threshold: self.scoring.flag_threshold,
            block_threshold: self.scoring.block_threshold,
            risk_levels: self.scoring.risk_levels.clone(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            forest: ForestConfig {
                num_trees: 100,
                subsample_size: 256,
                max_depth: None,
                seed: 42,
                contamination: 0.01,
                workers: 0,
            },
            scoring: ScoringConfig {
                block_threshold: 80,
                flag_threshold: 60,
                risk_levels: RiskLevelThresholds::default(),
            },
            storage: StorageConfig {
                model_path: "data/isolation_forest_model.json".to_string(),
                ledger_path: "data/transaction_scores.json".to_string(),
                dataset_path: None,
            },
            simulation: SimulationConfig {
                n_samples: 10000,
                n_fraud: 100,
                seed: 42,
                standardize: true,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}
