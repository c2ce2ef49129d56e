//! Fraud Risk Scoring Library
//!
//! Unsupervised fraud-risk scoring for transactions: an isolation forest
//! ensemble flags statistical outliers and a frozen min/max normalizer maps
//! their anomaly scores onto a stable 0-100 scale.

pub mod config;
pub mod error;
pub mod feature_extractor;
pub mod ledger;
pub mod metrics;
pub mod models;
pub mod simulation;
pub mod types;

pub use config::AppConfig;
pub use error::{Result, ScoringError};
pub use feature_extractor::FeatureExtractor;
pub use ledger::ScoreLedger;
pub use models::inference::ScoringService;
pub use models::{ForestParams, IsolationForest, IsolationTree, ModelArtifact, ScoreNormalizer, TrainingParams};
pub use types::{FeatureVector, FraudRecord, ScoreOutput, Transaction};
