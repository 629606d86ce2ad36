//! Exact encoder adapter

use std::sync::Arc;

use tiktoken_rs::CoreBPE;

/// A pluggable exact tokenizer: pure `text -> token count`.
///
/// Construction may fail (model files missing, allocation failure); counting
/// may fail per input. Both are reported, never panicked.
pub trait EncoderAdapter: Send {
    fn count(&self, text: &str) -> anyhow::Result<usize>;
}

/// Builds a fresh encoder inside an execution unit. Called once per unit
/// spawn and again on explicit re-initialization.
pub type EncoderFactory = Arc<dyn Fn() -> anyhow::Result<Box<dyn EncoderAdapter>> + Send + Sync>;

/// Exact encoder using tiktoken (cl100k_base encoding, GPT-4 / GPT-3.5-turbo).
pub struct TiktokenEncoder {
    bpe: CoreBPE,
}

impl TiktokenEncoder {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            bpe: tiktoken_rs::cl100k_base()?,
        })
    }
}

impl EncoderAdapter for TiktokenEncoder {
    fn count(&self, text: &str) -> anyhow::Result<usize> {
        Ok(self.bpe.encode_ordinary(text).len())
    }
}

/// The default factory: one cl100k_base encoder per unit.
pub fn tiktoken_factory() -> EncoderFactory {
    Arc::new(|| Ok(Box::new(TiktokenEncoder::new()?) as Box<dyn EncoderAdapter>))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_counting() {
        let encoder = TiktokenEncoder::new().unwrap();

        let count = encoder.count("Hello, world!").unwrap();
        assert!(count > 0 && count < 10);

        assert_eq!(encoder.count("").unwrap(), 0);
    }

    #[test]
    fn test_factory_builds_working_encoder() {
        let factory = tiktoken_factory();
        let encoder = factory().unwrap();
        assert!(encoder.count("some text").unwrap() > 0);
    }
}
