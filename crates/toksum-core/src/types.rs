//! Caller-visible result and observability types

use serde::{Deserialize, Serialize};

/// One resolved token count.
///
/// `is_fallback` distinguishes an exact encoder result from the length-based
/// heuristic; approximate counts carry the reason the encoder result was
/// unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCount {
    pub count: usize,
    pub is_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FallbackReason>,
}

impl TokenCount {
    pub fn exact(count: usize) -> Self {
        Self {
            count,
            is_fallback: false,
            reason: None,
        }
    }

    pub fn fallback(count: usize, reason: FallbackReason) -> Self {
        Self {
            count,
            is_fallback: true,
            reason: Some(reason),
        }
    }
}

/// Why a count came from the fallback estimator instead of an encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// No execution unit has a working encoder.
    EncoderUnavailable,
    /// The encoder reported an error for this specific input.
    EncoderError,
    /// The job deadline expired before a response arrived.
    Timeout,
    /// The job queue was at capacity; the request was load-shed.
    QueueFull,
    /// The owning unit failed at the transport level mid-job.
    UnitFailure,
    /// The pool was terminated before or while the job was pending.
    Terminated,
    /// Batch member exceeded the input size ceiling.
    InputTooLarge,
}

/// Point-in-time view of pool capacity. No side effects to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolHealth {
    pub ready_units: usize,
    pub degraded_units: usize,
    pub queue_depth: usize,
}

/// Cumulative counters, reset only when the pool is recreated.
///
/// Observability only; the pool never consults these for control flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub total_processed: u64,
    pub total_failed: u64,
    pub total_fallback: u64,
    pub sum_latency_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_count_has_no_reason() {
        let tc = TokenCount::exact(42);
        assert_eq!(tc.count, 42);
        assert!(!tc.is_fallback);
        assert!(tc.reason.is_none());
    }

    #[test]
    fn test_fallback_count_is_tagged() {
        let tc = TokenCount::fallback(10, FallbackReason::Timeout);
        assert!(tc.is_fallback);
        assert_eq!(tc.reason, Some(FallbackReason::Timeout));
    }

    #[test]
    fn test_token_count_json_shape() {
        let tc = TokenCount::exact(7);
        let json = serde_json::to_value(&tc).unwrap();
        assert_eq!(json["count"], 7);
        assert_eq!(json["is_fallback"], false);
        // Exact counts omit the reason field entirely
        assert!(json.get("reason").is_none());

        let tc = TokenCount::fallback(3, FallbackReason::QueueFull);
        let json = serde_json::to_value(&tc).unwrap();
        assert_eq!(json["reason"], "queue_full");
    }
}
