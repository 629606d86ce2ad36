//! Length-based fallback estimation
//!
//! Used whenever an exact encoder result is unavailable: no ready unit,
//! encoder error, timeout, load shedding, or a terminated pool. An
//! approximate count is always more useful to callers than a failure.

/// Deterministic `ceil(chars / chars_per_token)` heuristic.
#[derive(Debug, Clone, Copy)]
pub struct FallbackEstimator {
    chars_per_token: f64,
}

impl FallbackEstimator {
    pub fn new(chars_per_token: f64) -> Self {
        debug_assert!(chars_per_token > 0.0);
        Self { chars_per_token }
    }

    /// Estimate the token count of `text`. Pure and always succeeds.
    pub fn estimate(&self, text: &str) -> usize {
        self.estimate_chars(text.chars().count())
    }

    /// Estimate from a character count alone, for callers that already know
    /// the length and do not want to re-walk a large input.
    pub fn estimate_chars(&self, chars: usize) -> usize {
        (chars as f64 / self.chars_per_token).ceil() as usize
    }
}

impl Default for FallbackEstimator {
    fn default() -> Self {
        Self::new(4.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(FallbackEstimator::default().estimate(""), 0);
    }

    #[test]
    fn test_deterministic() {
        let est = FallbackEstimator::default();
        let text = "fn main() { println!(\"hello\"); }";
        assert_eq!(est.estimate(text), est.estimate(text));
    }

    #[test]
    fn test_calibration_arithmetic() {
        // 4000 chars at 4 chars/token -> exactly 1000
        let est = FallbackEstimator::new(4.0);
        let text = "a".repeat(4000);
        assert_eq!(est.estimate(&text), 1000);
    }

    #[test]
    fn test_rounds_up() {
        let est = FallbackEstimator::new(4.0);
        assert_eq!(est.estimate("abcde"), 2);
        assert_eq!(est.estimate("a"), 1);
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        let est = FallbackEstimator::new(1.0);
        // Four codepoints, twelve bytes
        assert_eq!(est.estimate("日本語テ"), 4);
    }
}
