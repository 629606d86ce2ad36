use anyhow::Result;
use std::path::PathBuf;

use toksum_encoder::FallbackEstimator;

use super::read_inputs;

pub fn handle(paths: Vec<PathBuf>, chars_per_token: f64) -> Result<()> {
    if chars_per_token <= 0.0 {
        anyhow::bail!("chars-per-token must be positive");
    }
    let estimator = FallbackEstimator::new(chars_per_token);

    let mut total = 0;
    for (label, content) in read_inputs(&paths)? {
        let count = estimator.estimate(&content);
        println!("{count:>10}  {label}");
        total += count;
    }
    println!("{total:>10}  total");

    Ok(())
}
