pub mod count;
pub mod estimate;

use anyhow::Result;
use std::io::Read;
use std::path::PathBuf;

/// Resolve inputs to (label, content) pairs; stdin when no paths are given.
pub fn read_inputs(paths: &[PathBuf]) -> Result<Vec<(String, String)>> {
    if paths.is_empty() {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        return Ok(vec![("<stdin>".to_string(), content)]);
    }
    paths
        .iter()
        .map(|path| {
            let content = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
            Ok((path.display().to_string(), content))
        })
        .collect()
}
