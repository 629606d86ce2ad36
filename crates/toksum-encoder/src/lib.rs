//! Token encoders for toksum
//!
//! This crate contains:
//! - The [`EncoderAdapter`] seam over a pluggable exact tokenizer
//! - The tiktoken-backed exact encoder (cl100k_base)
//! - The always-available length-based [`FallbackEstimator`]

pub mod adapter;
pub mod fallback;

pub use adapter::{EncoderAdapter, EncoderFactory, TiktokenEncoder, tiktoken_factory};
pub use fallback::FallbackEstimator;
