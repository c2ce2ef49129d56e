//! Anomaly detection models

pub mod forest;
pub mod inference;
pub mod loader;
pub mod normalizer;
pub mod tree;

pub use forest::{ForestParams, IsolationForest};
pub use inference::{ScoringService, TrainingParams};
pub use loader::ModelArtifact;
pub use normalizer::{ScoreNormalizer, ScorePolarity};
pub use tree::IsolationTree;
