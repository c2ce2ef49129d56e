//! Key-value store of scored transactions for later lookup

use crate::error::{Result, ScoringError};
use crate::types::score::{round_score, RiskLevelThresholds};
use crate::types::{FraudAction, FraudRecord, RiskLevel, ScoreOutput};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{debug, info, warn};

/// Thresholds that turn a fraud score into an automated action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPolicy {
    pub flag_threshold: u8,
    pub block_threshold: u8,
    pub risk_levels: RiskLevelThresholds,
}

impl Default for ActionPolicy {
    fn default() -> Self {
        Self {
            flag_threshold: 60,
            block_threshold: 80,
            risk_levels: RiskLevelThresholds::default(),
        }
    }
}

/// Scored transactions keyed by transaction id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreLedger {
    model_used: String,
    records: HashMap<String, FraudRecord>,
    #[serde(skip)]
    policy: ActionPolicy,
}

impl ScoreLedger {
    pub fn new(model_used: impl Into<String>, policy: ActionPolicy) -> Self {
        Self {
            model_used: model_used.into(),
            records: HashMap::new(),
            policy,
        }
    }

    /// Store the score of a transaction.
    ///
    /// Rescoring an id replaces its earlier record and logs a warning.
    pub fn record(&mut self, transaction_id: &str, fraud_score: f64) -> &FraudRecord {
        let rounded = round_score(fraud_score);
        let record = FraudRecord {
            transaction_id: transaction_id.to_string(),
            fraud_score: rounded,
            raw_fraud_score: fraud_score,
            action: FraudAction::from_score(rounded, self.policy.flag_threshold, self.policy.block_threshold),
            risk_level: RiskLevel::from_score(fraud_score, &self.policy.risk_levels),
            timestamp: Utc::now(),
        };

        debug!(
            transaction_id = %record.transaction_id,
            fraud_score = record.fraud_score,
            action = record.action.as_str(),
            "Recorded fraud score"
        );

        if let Some(previous) = self.records.insert(transaction_id.to_string(), record) {
            warn!(
                transaction_id = %previous.transaction_id,
                previous_score = previous.fraud_score,
                "Transaction rescored, replacing earlier record"
            );
        }
        &self.records[transaction_id]
    }

    pub fn lookup(&self, transaction_id: &str) -> Result<&FraudRecord> {
        self.records
            .get(transaction_id)
            .ok_or_else(|| ScoringError::TransactionNotFound(transaction_id.to_string()))
    }

    /// Output for downstream consumers, or `TransactionNotFound`
    pub fn score_output(&self, transaction_id: &str) -> Result<ScoreOutput> {
        let record = self.lookup(transaction_id)?;
        Ok(ScoreOutput {
            transaction_id: record.transaction_id.clone(),
            score: record.fraud_score,
            model_used: self.model_used.clone(),
        })
    }

    /// The `n` highest-scoring records, highest first
    pub fn top_risks(&self, n: usize) -> Vec<&FraudRecord> {
        let mut records: Vec<&FraudRecord> = self.records.values().collect();
        records.sort_by(|a, b| {
            b.raw_fraud_score
                .total_cmp(&a.raw_fraud_score)
                .then_with(|| a.transaction_id.cmp(&b.transaction_id))
        });
        records.truncate(n);
        records
    }

    /// The `n` lowest-scoring records, lowest first
    pub fn lowest_risks(&self, n: usize) -> Vec<&FraudRecord> {
        let mut records: Vec<&FraudRecord> = self.records.values().collect();
        records.sort_by(|a, b| {
            a.raw_fraud_score
                .total_cmp(&b.raw_fraud_score)
                .then_with(|| a.transaction_id.cmp(&b.transaction_id))
        });
        records.truncate(n);
        records
    }

    /// Record counts per action
    pub fn action_counts(&self) -> HashMap<FraudAction, usize> {
        let mut counts = HashMap::new();
        for record in self.records.values() {
            *counts.entry(record.action).or_insert(0) += 1;
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn model_used(&self) -> &str {
        &self.model_used
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        serde_json::to_writer(BufWriter::new(File::create(path)?), self)?;
        info!(path = %path.display(), records = self.records.len(), "Score ledger saved");
        Ok(())
    }

    /// Load a saved ledger. The action policy only affects new records.
    pub fn load<P: AsRef<Path>>(path: P, policy: ActionPolicy) -> Result<Self> {
        let path = path.as_ref();
        let mut ledger: Self = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        ledger.policy = policy;
        info!(path = %path.display(), records = ledger.records.len(), "Score ledger loaded");
        Ok(ledger)
    }
}
