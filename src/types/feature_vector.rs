//! Standardized per-transaction feature vectors

use serde::{Deserialize, Serialize};
use std::ops::Index;

/// Fixed-arity tuple of standardized numeric features for one transaction.
///
/// Immutable once created. The dimensionality is fixed per deployment
/// (three in the default pipeline: amount, time since last transaction,
/// geographic distance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    /// Number of features
    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// True when every feature is a finite number
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

impl<const N: usize> From<[f64; N]> for FeatureVector {
    fn from(values: [f64; N]) -> Self {
        Self(values.to_vec())
    }
}

impl Index<usize> for FeatureVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl AsRef<[f64]> for FeatureVector {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_vector_access() {
        let v = FeatureVector::from([1.0, -0.5, 2.25]);
        assert_eq!(v.dim(), 3);
        assert_eq!(v[1], -0.5);
        assert!(v.is_finite());
    }

    #[test]
    fn test_non_finite_detected() {
        let v = FeatureVector::new(vec![1.0, f64::NAN]);
        assert!(!v.is_finite());
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let v = FeatureVector::from([1.0, 2.0]);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "[1.0,2.0]");
    }
}
