//! Transaction records as delivered by the upstream feature pipeline

use serde::{Deserialize, Serialize};

/// A transaction with its already-standardized features.
///
/// The identifier is opaque to the scoring engine; it is only carried
/// through so results can be stored and looked up again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction identifier
    #[serde(alias = "tx_id")]
    pub transaction_id: String,

    /// Transaction value
    #[serde(alias = "Amount")]
    pub amount: f64,

    /// Time since the previous transaction of the same account
    #[serde(alias = "TimeSinceLast")]
    pub time_since_last: f64,

    /// Geographic distance from the usual location
    #[serde(alias = "GeoDistance")]
    pub geo_distance: f64,
}

impl Transaction {
    pub fn new(
        transaction_id: impl Into<String>,
        amount: f64,
        time_since_last: f64,
        geo_distance: f64,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            amount,
            time_since_last,
            geo_distance,
        }
    }
}
