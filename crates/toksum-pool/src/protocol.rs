//! Handshake protocol between the pool and its execution units
//!
//! Every request carries a unique correlation id; the matching response
//! embeds the same id. Responses may arrive out of order relative to
//! submission, so the pool resolves pending work purely by id. Unmatched ids
//! are dropped and logged, never fatal.

use std::fmt;

use uuid::Uuid;

use crate::transport::Payload;

/// Correlation id tying a response back to the request that triggered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifies one execution unit instance. Replacement units get fresh ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitId(pub u64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit-{}", self.0)
    }
}

/// Messages the pool sends to a unit.
#[derive(Debug)]
pub enum UnitRequest {
    /// Drive (or re-drive) encoder initialization. Idempotent: a unit that
    /// already holds an encoder answers success without rebuilding it.
    Init { id: CorrelationId },
    /// Count tokens in one text.
    Count { id: CorrelationId, text: Payload },
    /// Count tokens in several texts in one round trip.
    CountBatch {
        id: CorrelationId,
        texts: Vec<Payload>,
    },
    /// Liveness probe. Answerable in every state, including before the
    /// encoder is available.
    HealthCheck { id: CorrelationId },
}

/// Messages a unit sends back to the pool.
#[derive(Debug)]
pub enum UnitResponse {
    /// Unsolicited: encoder setup finished after spawn.
    Ready,
    Init {
        id: CorrelationId,
        success: bool,
    },
    Count {
        id: CorrelationId,
        count: usize,
    },
    /// Per-member outcome; `None` marks a member the encoder failed on.
    CountBatch {
        id: CorrelationId,
        counts: Vec<Option<usize>>,
    },
    Health {
        id: CorrelationId,
        healthy: bool,
    },
    /// Reported failure. Carries the triggering request id when there is
    /// one; `None` means the failure was not tied to a request (typically
    /// encoder setup at spawn).
    Error {
        id: Option<CorrelationId>,
        reason: String,
    },
}

/// A unit response paired with its origin, as delivered to the pool's
/// event channel.
#[derive(Debug)]
pub struct UnitEvent {
    pub unit: UnitId,
    pub response: UnitResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_ids_are_unique() {
        let a = CorrelationId::new();
        let b = CorrelationId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_unit_id_display() {
        assert_eq!(UnitId(3).to_string(), "unit-3");
    }
}
