//! Synthetic transaction data for training and demos.
//!
//! Normal transactions are drawn around (5, 5, 2) and fraudulent ones
//! around (15, 15, 10), both with per-feature standard deviation 0.5.
//! Labels are ground truth for evaluation only; the forest never sees them.

use crate::error::{Result, ScoringError};
use crate::types::Transaction;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

pub const NORMAL_CENTER: [f64; 3] = [5.0, 5.0, 2.0];
pub const FRAUD_CENTER: [f64; 3] = [15.0, 15.0, 10.0];
pub const CLUSTER_STD_DEV: f64 = 0.5;

/// Simulated transactions with their ground-truth labels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticDataset {
    pub transactions: Vec<Transaction>,
    /// `true` for transactions drawn from the fraud cluster
    pub labels: Vec<bool>,
}

impl SyntheticDataset {
    /// Generate `n_samples` transactions of which the last `n_fraud` are fraud.
    pub fn generate(n_samples: usize, n_fraud: usize, seed: u64) -> Result<Self> {
        if n_fraud > n_samples {
            return Err(ScoringError::Config(format!(
                "n_fraud ({}) cannot exceed n_samples ({})",
                n_fraud, n_samples
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0, CLUSTER_STD_DEV)
            .map_err(|e| ScoringError::Config(format!("invalid noise distribution: {}", e)))?;

        let mut transactions = Vec::with_capacity(n_samples);
        let mut labels = Vec::with_capacity(n_samples);
        for i in 0..n_samples {
            let is_fraud = i >= n_samples - n_fraud;
            let center = if is_fraud { FRAUD_CENTER } else { NORMAL_CENTER };
            transactions.push(Transaction::new(
                format!("TX-{:05}", i),
                center[0] + noise.sample(&mut rng),
                center[1] + noise.sample(&mut rng),
                center[2] + noise.sample(&mut rng),
            ));
            labels.push(is_fraud);
        }

        info!(n_samples, n_fraud, seed, "Generated synthetic transactions");
        Ok(Self {
            transactions,
            labels,
        })
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Z-score every feature column in place, as the upstream scaler would.
    ///
    /// Columns with zero variance are only centered.
    pub fn standardize(&mut self) {
        let n = self.transactions.len();
        if n == 0 {
            return;
        }

        for column in 0..3 {
            let mean = self.transactions.iter().map(|tx| feature(tx, column)).sum::<f64>() / n as f64;
            let variance = self
                .transactions
                .iter()
                .map(|tx| (feature(tx, column) - mean).powi(2))
                .sum::<f64>()
                / n as f64;
            let std_dev = variance.sqrt();

            for tx in &mut self.transactions {
                let value = feature_mut(tx, column);
                *value -= mean;
                if std_dev > 0.0 {
                    *value /= std_dev;
                }
            }
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        serde_json::to_writer(BufWriter::new(File::create(path)?), self)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let dataset: Self = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        if dataset.labels.len() != dataset.transactions.len() {
            return Err(ScoringError::Config(format!(
                "dataset has {} transactions but {} labels",
                dataset.transactions.len(),
                dataset.labels.len()
            )));
        }
        Ok(dataset)
    }
}

fn feature(tx: &Transaction, column: usize) -> f64 {
    match column {
        0 => tx.amount,
        1 => tx.time_since_last,
        _ => tx.geo_distance,
    }
}

fn feature_mut(tx: &mut Transaction, column: usize) -> &mut f64 {
    match column {
        0 => &mut tx.amount,
        1 => &mut tx.time_since_last,
        _ => &mut tx.geo_distance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_layout() {
        let dataset = SyntheticDataset::generate(100, 10, 42).unwrap();

        assert_eq!(dataset.len(), 100);
        assert_eq!(dataset.labels.iter().filter(|&&l| l).count(), 10);
        assert!(dataset.labels[90..].iter().all(|&l| l));
        assert_eq!(dataset.transactions[0].transaction_id, "TX-00000");
        assert_eq!(dataset.transactions[99].transaction_id, "TX-00099");
        assert!(dataset.transactions[99].amount > 10.0);
        assert!(dataset.transactions[0].amount < 10.0);
    }

    #[test]
    fn test_generate_is_seeded() {
        let a = SyntheticDataset::generate(50, 5, 7).unwrap();
        let b = SyntheticDataset::generate(50, 5, 7).unwrap();
        assert_eq!(a.transactions, b.transactions);
    }

    #[test]
    fn test_too_many_fraud_rejected() {
        assert!(SyntheticDataset::generate(5, 6, 1).is_err());
    }

    #[test]
    fn test_standardize_zero_mean_unit_variance() {
        let mut dataset = SyntheticDataset::generate(500, 20, 3).unwrap();
        dataset.standardize();

        let n = dataset.len() as f64;
        let mean = dataset.transactions.iter().map(|t| t.geo_distance).sum::<f64>() / n;
        let var = dataset
            .transactions
            .iter()
            .map(|t| (t.geo_distance - mean).powi(2))
            .sum::<f64>()
            / n;
        assert!(mean.abs() < 1e-9);
        assert!((var - 1.0).abs() < 1e-9);
    }
}
