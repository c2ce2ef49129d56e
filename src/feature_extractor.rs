//! Feature extraction for isolation forest scoring.
//!
//! Turns transactions into the fixed-order feature vectors the forest is
//! trained on. Values are expected to be standardized already.

use crate::types::{FeatureVector, Transaction};

/// Feature names in model input order
pub const FEATURE_NAMES: [&str; 3] = ["Amount", "TimeSinceLast", "GeoDistance"];

/// Feature extractor that transforms transactions into model input features.
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Create a new feature extractor.
    pub fn new() -> Self {
        Self
    }

    /// Extract the feature vector of a transaction.
    pub fn extract(&self, tx: &Transaction) -> FeatureVector {
        FeatureVector::new(vec![tx.amount, tx.time_since_last, tx.geo_distance])
    }

    /// Extract feature vectors for a batch, preserving order.
    pub fn extract_batch(&self, transactions: &[Transaction]) -> Vec<FeatureVector> {
        transactions.iter().map(|tx| self.extract(tx)).collect()
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_NAMES.len()
    }

    /// Get feature names.
    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}
