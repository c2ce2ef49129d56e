//! Synthetic Dataset Generator
//!
//! Writes simulated transactions (normal cluster plus a small fraud cluster)
//! as JSON for training runs.
//!
//! Usage: generate_dataset [output] [n_samples] [n_fraud] [seed] [--raw]

use fraud_risk_scoring::simulation::SyntheticDataset;
use tracing::info;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("generate_dataset=info".parse()?)
                .add_directive("fraud_risk_scoring=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let raw = args.iter().any(|a| a == "--raw");
    let positional: Vec<&str> = args
        .iter()
        .skip(1)
        .map(String::as_str)
        .filter(|a| !a.starts_with("--"))
        .collect();

    let output = positional.first().copied().unwrap_or("data/transactions.json");
    let n_samples: usize = positional.get(1).and_then(|s| s.parse().ok()).unwrap_or(10000);
    let n_fraud: usize = positional.get(2).and_then(|s| s.parse().ok()).unwrap_or(100);
    let seed: u64 = positional.get(3).and_then(|s| s.parse().ok()).unwrap_or(42);

    info!(
        output = %output,
        n_samples,
        n_fraud,
        seed,
        standardized = !raw,
        "Configuration loaded"
    );

    let mut dataset = SyntheticDataset::generate(n_samples, n_fraud, seed)?;
    if !raw {
        dataset.standardize();
    }
    dataset.save(output)?;

    if let Some(sample) = dataset.transactions.first() {
        info!("Sample transaction:\n{}", serde_json::to_string_pretty(sample)?);
    }
    info!(
        "Completed! Wrote {} transactions ({} legitimate, {} fraud) to {}",
        dataset.len(),
        n_samples - n_fraud,
        n_fraud,
        output
    );

    Ok(())
}
