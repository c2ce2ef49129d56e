//! Performance metrics and statistics tracking for fraud scoring.

use crate::types::FraudAction;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for training and scoring
pub struct ScoringMetrics {
    /// Total transactions scored
    pub transactions_scored: AtomicU64,
    /// Records by automated action
    actions: RwLock<HashMap<FraudAction, u64>>,
    /// Scoring times (in microseconds)
    scoring_times: RwLock<Vec<u64>>,
    /// Fraud score distribution in 10-point buckets
    score_buckets: RwLock<[u64; 10]>,
    /// Forest and normalizer fit time (in milliseconds)
    fit_time_ms: AtomicU64,
    /// Start time for rate calculation
    start_time: Instant,
}

impl ScoringMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            transactions_scored: AtomicU64::new(0),
            actions: RwLock::new(HashMap::new()),
            scoring_times: RwLock::new(Vec::with_capacity(1000)),
            score_buckets: RwLock::new([0; 10]),
            fit_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a scored transaction
    pub fn record_score(&self, scoring_time: Duration, fraud_score: f64, action: FraudAction) {
        self.transactions_scored.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.scoring_times.write() {
            times.push(scoring_time.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        let bucket = ((fraud_score / 10.0).max(0.0) as usize).min(9);
        if let Ok(mut buckets) = self.score_buckets.write() {
            buckets[bucket] += 1;
        }

        if let Ok(mut actions) = self.actions.write() {
            *actions.entry(action).or_insert(0) += 1;
        }
    }

    pub fn record_fit(&self, duration: Duration) {
        self.fit_time_ms.store(duration.as_millis() as u64, Ordering::Relaxed);
    }

    /// Get scoring time statistics
    pub fn get_scoring_stats(&self) -> ScoringStats {
        let Ok(times) = self.scoring_times.read() else {
            return ScoringStats::default();
        };
        if times.is_empty() {
            return ScoringStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ScoringStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: sorted[count - 1],
        }
    }

    /// Get current throughput (transactions per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.transactions_scored.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get score distribution
    pub fn get_score_distribution(&self) -> [u64; 10] {
        self.score_buckets.read().map(|b| *b).unwrap_or([0; 10])
    }

    /// Get record counts by action
    pub fn get_action_counts(&self) -> HashMap<FraudAction, u64> {
        self.actions.read().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn get_fit_time_ms(&self) -> u64 {
        self.fit_time_ms.load(Ordering::Relaxed)
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let tx_count = self.transactions_scored.load(Ordering::Relaxed);
        let stats = self.get_scoring_stats();
        let actions = self.get_action_counts();
        let score_dist = self.get_score_distribution();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║            FRAUD RISK SCORING - METRICS SUMMARY              ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Transactions Scored:    {:>8}  │  Throughput: {:>8.1} tx/s ║",
            tx_count,
            self.get_throughput()
        );
        info!("║ Model Fit Time:         {:>8} ms                            ║", self.get_fit_time_ms());
        info!(
            "║ Scoring Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5}    ║",
            stats.mean_us, stats.p50_us, stats.p95_us, stats.p99_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Actions:                                                     ║");
        for action in [FraudAction::Approved, FraudAction::Flagged, FraudAction::Blocked] {
            let count = actions.get(&action).copied().unwrap_or(0);
            let pct = if tx_count > 0 {
                (count as f64 / tx_count as f64) * 100.0
            } else {
                0.0
            };
            info!("║   {:10}: {:>6} ({:>5.1}%)", action.as_str(), count, pct);
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Fraud Score Distribution:                                    ║");
        let total: u64 = score_dist.iter().sum();
        for (i, &count) in score_dist.iter().enumerate() {
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!("║   {:>3}-{:<3}: {:>6} ({:>5.1}%) {}", i * 10, (i + 1) * 10, count, pct, bar);
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for ScoringMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoring time statistics
#[derive(Debug, Default)]
pub struct ScoringStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = ScoringMetrics::new();

        metrics.record_score(Duration::from_micros(100), 5.0, FraudAction::Approved);
        metrics.record_score(Duration::from_micros(200), 99.0, FraudAction::Blocked);
        metrics.record_score(Duration::from_micros(300), 100.0, FraudAction::Blocked);

        assert_eq!(metrics.transactions_scored.load(Ordering::Relaxed), 3);
        let dist = metrics.get_score_distribution();
        assert_eq!(dist[0], 1);
        assert_eq!(dist[9], 2);
        assert_eq!(metrics.get_action_counts()[&FraudAction::Blocked], 2);
    }

    #[test]
    fn test_scoring_stats() {
        let metrics = ScoringMetrics::new();
        for us in [100, 200, 300, 400] {
            metrics.record_score(Duration::from_micros(us), 50.0, FraudAction::Approved);
        }

        let stats = metrics.get_scoring_stats();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean_us, 250);
        assert_eq!(stats.max_us, 400);
    }

    #[test]
    fn test_empty_stats() {
        let metrics = ScoringMetrics::new();
        assert_eq!(metrics.get_scoring_stats().count, 0);
    }
}
