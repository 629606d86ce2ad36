use anyhow::Result;
use std::path::PathBuf;
use tracing::debug;

use toksum_config::Config;
use toksum_pool::TokenPool;

use super::read_inputs;

pub async fn handle(
    paths: Vec<PathBuf>,
    json: bool,
    pool_size: Option<usize>,
    config: &Config,
) -> Result<()> {
    let inputs = read_inputs(&paths)?;

    let mut pool_config = config.pool.clone();
    if let Some(size) = pool_size {
        pool_config.pool_size = size;
    }
    let pool = TokenPool::create(pool_config)?;

    let texts: Vec<&str> = inputs.iter().map(|(_, content)| content.as_str()).collect();
    let results = pool.count_tokens_batch(&texts).await;

    let stats = pool.stats().await;
    debug!(?stats, "counting finished");
    pool.terminate().await;

    if json || config.output.json {
        let entries: Vec<serde_json::Value> = inputs
            .iter()
            .zip(&results)
            .map(|((label, _), result)| {
                serde_json::json!({
                    "path": label,
                    "count": result.count,
                    "is_fallback": result.is_fallback,
                })
            })
            .collect();
        let total: usize = results.iter().map(|r| r.count).sum();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "files": entries,
                "total": total,
            }))?
        );
        return Ok(());
    }

    let mut total = 0;
    for ((label, _), result) in inputs.iter().zip(&results) {
        let marker = if result.is_fallback && config.output.mark_fallback {
            " (approx)"
        } else {
            ""
        };
        println!("{:>10}{}  {}", result.count, marker, label);
        total += result.count;
    }
    println!("{total:>10}  total");

    Ok(())
}
