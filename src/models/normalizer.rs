//! Mapping of raw anomaly scores onto the 0-100 fraud score scale

use crate::error::{Result, ScoringError};
use serde::{Deserialize, Serialize};

/// Fraud score returned for every input when the fit batch had zero spread
pub const DEGENERATE_SCORE: f64 = 50.0;

/// Which end of the raw score range marks an anomaly.
///
/// The forest's anomaly score is `HigherIsAnomalous`. Decision-function
/// style inputs, where negative values are outliers, are `LowerIsAnomalous`
/// and get inverted here rather than anywhere upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorePolarity {
    #[default]
    HigherIsAnomalous,
    LowerIsAnomalous,
}

/// Min/max reference points frozen at fit time.
///
/// The same instance must be persisted with the forest and reused for every
/// later query; a normalizer fitted on another batch puts scores on a
/// different scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreNormalizer {
    min_raw: f64,
    max_raw: f64,
    #[serde(default)]
    polarity: ScorePolarity,
}

impl ScoreNormalizer {
    /// Record the range of the fit-time raw scores (forest polarity).
    pub fn fit(raw_scores: &[f64]) -> Result<Self> {
        Self::fit_with_polarity(raw_scores, ScorePolarity::HigherIsAnomalous)
    }

    pub fn fit_with_polarity(raw_scores: &[f64], polarity: ScorePolarity) -> Result<Self> {
        if raw_scores.is_empty() {
            return Err(ScoringError::Config(
                "cannot fit normalizer on an empty score batch".to_string(),
            ));
        }
        if raw_scores.iter().any(|s| !s.is_finite()) {
            return Err(ScoringError::Config(
                "raw score batch contains a non-finite value".to_string(),
            ));
        }

        let (min_raw, max_raw) = raw_scores
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &s| {
                (min.min(s), max.max(s))
            });

        Ok(Self {
            min_raw,
            max_raw,
            polarity,
        })
    }

    /// Fraud score in [0, 100]. Raw values outside the fit range are clamped.
    pub fn apply(&self, raw: f64) -> f64 {
        let span = self.max_raw - self.min_raw;
        if span <= 0.0 {
            return DEGENERATE_SCORE;
        }

        let position = match self.polarity {
            ScorePolarity::HigherIsAnomalous => (raw - self.min_raw) / span,
            ScorePolarity::LowerIsAnomalous => (self.max_raw - raw) / span,
        };
        (100.0 * position).clamp(0.0, 100.0)
    }

    pub fn min_raw(&self) -> f64 {
        self.min_raw
    }

    pub fn max_raw(&self) -> f64 {
        self.max_raw
    }

    pub fn polarity(&self) -> ScorePolarity {
        self.polarity
    }

    /// True when the fit batch had no spread and every score maps to the midpoint
    pub fn is_degenerate(&self) -> bool {
        self.max_raw <= self.min_raw
    }

    /// Structural check for a normalizer restored from storage
    pub fn validate(&self) -> Result<()> {
        if !self.min_raw.is_finite() || !self.max_raw.is_finite() || self.min_raw > self.max_raw {
            return Err(ScoringError::InvalidArtifact(format!(
                "normalizer range [{}, {}] is invalid",
                self.min_raw, self.max_raw
            )));
        }
        Ok(())
    }
}
