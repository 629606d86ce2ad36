use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "toksum")]
#[command(about = "Token counting for LLM context budgets", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Count tokens in files (or stdin when no paths are given)
    Count {
        /// Files to count
        paths: Vec<PathBuf>,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Number of worker units (default from config)
        #[arg(long)]
        pool_size: Option<usize>,
    },

    /// Estimate tokens with the length heuristic only (no encoder)
    Estimate {
        /// Files to estimate
        paths: Vec<PathBuf>,

        /// Calibration constant
        #[arg(long, default_value = "4.0")]
        chars_per_token: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_args_parse() {
        let cli = Cli::try_parse_from(["toksum", "count", "a.txt", "b.txt", "--json"]).unwrap();
        match cli.command {
            Commands::Count { paths, json, .. } => {
                assert_eq!(paths.len(), 2);
                assert!(json);
            }
            _ => panic!("expected count command"),
        }
    }

    #[test]
    fn test_estimate_default_calibration() {
        let cli = Cli::try_parse_from(["toksum", "estimate", "a.txt"]).unwrap();
        match cli.command {
            Commands::Estimate {
                chars_per_token, ..
            } => assert_eq!(chars_per_token, 4.0),
            _ => panic!("expected estimate command"),
        }
    }
}
