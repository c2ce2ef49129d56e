//! Fraud score records and the actions derived from them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Risk level classification on the 0-100 fraud score scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Determine risk level from score and thresholds
    pub fn from_score(score: f64, thresholds: &RiskLevelThresholds) -> Self {
        if score >= thresholds.critical {
            RiskLevel::Critical
        } else if score >= thresholds.high {
            RiskLevel::High
        } else if score >= thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Configurable risk level thresholds (0-100 scale)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLevelThresholds {
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for RiskLevelThresholds {
    fn default() -> Self {
        Self {
            medium: 50.0,
            high: 70.0,
            critical: 90.0,
        }
    }
}

/// Automated decision attached to a recorded score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FraudAction {
    Approved,
    Flagged,
    Blocked,
}

impl FraudAction {
    pub fn from_score(score: u8, flag_threshold: u8, block_threshold: u8) -> Self {
        if score >= block_threshold {
            FraudAction::Blocked
        } else if score >= flag_threshold {
            FraudAction::Flagged
        } else {
            FraudAction::Approved
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FraudAction::Approved => "approved",
            FraudAction::Flagged => "flagged",
            FraudAction::Blocked => "blocked",
        }
    }
}

/// Score handed to downstream consumers: an integer in [0, 100] plus the
/// identity of the model that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreOutput {
    pub transaction_id: String,
    pub score: u8,
    pub model_used: String,
}

impl ScoreOutput {
    /// Round a fraud score to the integer output scale
    pub fn new(transaction_id: impl Into<String>, fraud_score: f64, model_used: impl Into<String>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            score: round_score(fraud_score),
            model_used: model_used.into(),
        }
    }

    /// The score rescaled to a single byte (0-255)
    pub fn to_byte_scale(&self) -> u8 {
        ((self.score as f64) * 255.0 / 100.0).round() as u8
    }
}

/// Stored result for a scored transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudRecord {
    pub transaction_id: String,

    /// Integer fraud score (0-100)
    pub fraud_score: u8,

    /// Unrounded fraud score as produced by the normalizer
    pub raw_fraud_score: f64,

    pub action: FraudAction,

    pub risk_level: RiskLevel,

    pub timestamp: DateTime<Utc>,
}

/// Round and clamp a 0-100 fraud score into a byte
pub fn round_score(fraud_score: f64) -> u8 {
    fraud_score.round().clamp(0.0, 100.0) as u8
}
