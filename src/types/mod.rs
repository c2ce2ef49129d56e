//! Type definitions for the fraud risk scoring engine

pub mod feature_vector;
pub mod score;
pub mod transaction;

pub use feature_vector::FeatureVector;
pub use score::{FraudAction, FraudRecord, RiskLevel, ScoreOutput};
pub use transaction::Transaction;
