//! Execution units
//!
//! A unit is one isolated worker owning one encoder instance, processing at
//! most one request at a time. The default implementation runs on a
//! dedicated OS thread (encoding is CPU-bound) and talks to the pool through
//! unbounded channels. Tests substitute task-backed units via [`UnitFactory`].

use tokio::sync::mpsc;
use tracing::{debug, warn};

use toksum_encoder::EncoderFactory;

use crate::protocol::{UnitEvent, UnitId, UnitRequest, UnitResponse};

/// Lifecycle of one unit instance as tracked by the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitLifecycle {
    Uninitialized,
    Initializing,
    Ready,
    /// Encoder failed to initialize or reported an error; the transport is
    /// still alive. Receives no jobs until it recovers on a health probe.
    Degraded,
    /// Transport-level failure. Terminal; the pool spawns a replacement.
    Dead,
}

/// Sending half of a unit's request channel. Dropping it shuts the unit down.
pub struct UnitHandle {
    tx: mpsc::UnboundedSender<UnitRequest>,
}

impl UnitHandle {
    pub fn new(tx: mpsc::UnboundedSender<UnitRequest>) -> Self {
        Self { tx }
    }

    /// Returns false when the unit is gone (transport failure).
    pub fn send(&self, request: UnitRequest) -> bool {
        self.tx.send(request).is_ok()
    }
}

/// Spawns execution units. The pool never knows how a unit is constructed;
/// the host environment supplies the strategy.
pub trait UnitFactory: Send + Sync + 'static {
    fn spawn_unit(&self, id: UnitId, events: mpsc::UnboundedSender<UnitEvent>) -> UnitHandle;
}

/// Default factory: one OS thread per unit, each building its own encoder
/// from the supplied [`EncoderFactory`].
pub struct EncoderUnitFactory {
    encoder_factory: EncoderFactory,
}

impl EncoderUnitFactory {
    pub fn new(encoder_factory: EncoderFactory) -> Self {
        Self { encoder_factory }
    }
}

impl UnitFactory for EncoderUnitFactory {
    fn spawn_unit(&self, id: UnitId, events: mpsc::UnboundedSender<UnitEvent>) -> UnitHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let factory = self.encoder_factory.clone();
        std::thread::Builder::new()
            .name(id.to_string())
            .spawn(move || run_unit(id, rx, events, factory))
            .expect("failed to spawn unit thread");
        UnitHandle::new(tx)
    }
}

fn run_unit(
    id: UnitId,
    mut rx: mpsc::UnboundedReceiver<UnitRequest>,
    events: mpsc::UnboundedSender<UnitEvent>,
    make_encoder: EncoderFactory,
) {
    // Encoder setup happens before any request is read. The pool sends
    // nothing to this unit until it reports in (jobs wait for Ready,
    // probes target Ready or Degraded units only), so no request sits
    // unanswered behind a slow setup.
    let mut encoder = match make_encoder() {
        Ok(enc) => {
            if events
                .send(UnitEvent {
                    unit: id,
                    response: UnitResponse::Ready,
                })
                .is_err()
            {
                return;
            }
            Some(enc)
        }
        Err(err) => {
            warn!(unit = %id, error = %err, "encoder initialization failed");
            let _ = events.send(UnitEvent {
                unit: id,
                response: UnitResponse::Error {
                    id: None,
                    reason: err.to_string(),
                },
            });
            None
        }
    };

    while let Some(request) = rx.blocking_recv() {
        let response = match request {
            UnitRequest::Init { id: corr } => {
                if encoder.is_none() {
                    encoder = match make_encoder() {
                        Ok(enc) => Some(enc),
                        Err(err) => {
                            debug!(unit = %id, error = %err, "encoder re-initialization failed");
                            None
                        }
                    };
                }
                UnitResponse::Init {
                    id: corr,
                    success: encoder.is_some(),
                }
            }
            UnitRequest::HealthCheck { id: corr } => UnitResponse::Health {
                id: corr,
                healthy: encoder.is_some(),
            },
            UnitRequest::Count { id: corr, text } => match encoder.as_ref() {
                Some(enc) => match enc.count(text.as_str()) {
                    Ok(count) => UnitResponse::Count { id: corr, count },
                    Err(err) => UnitResponse::Error {
                        id: Some(corr),
                        reason: err.to_string(),
                    },
                },
                None => UnitResponse::Error {
                    id: Some(corr),
                    reason: "encoder unavailable".to_string(),
                },
            },
            UnitRequest::CountBatch { id: corr, texts } => match encoder.as_ref() {
                Some(enc) => UnitResponse::CountBatch {
                    id: corr,
                    counts: texts.iter().map(|t| enc.count(t.as_str()).ok()).collect(),
                },
                None => UnitResponse::Error {
                    id: Some(corr),
                    reason: "encoder unavailable".to_string(),
                },
            },
        };

        if events.send(UnitEvent { unit: id, response }).is_err() {
            // Pool side is gone; nothing left to report to.
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::protocol::CorrelationId;
    use crate::transport::Payload;
    use toksum_encoder::EncoderAdapter;

    struct StubEncoder;

    impl EncoderAdapter for StubEncoder {
        fn count(&self, text: &str) -> anyhow::Result<usize> {
            if text.contains('\u{0}') {
                anyhow::bail!("cannot encode NUL");
            }
            Ok(text.split_whitespace().count())
        }
    }

    fn stub_factory() -> EncoderFactory {
        Arc::new(|| Ok(Box::new(StubEncoder) as Box<dyn EncoderAdapter>))
    }

    fn failing_factory() -> EncoderFactory {
        Arc::new(|| anyhow::bail!("model file missing"))
    }

    fn spawn(factory: EncoderFactory) -> (UnitHandle, mpsc::UnboundedReceiver<UnitEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let handle = EncoderUnitFactory::new(factory).spawn_unit(UnitId(0), events_tx);
        (handle, events_rx)
    }

    #[tokio::test]
    async fn test_ready_then_count() {
        let (handle, mut events) = spawn(stub_factory());

        let ev = events.recv().await.unwrap();
        assert!(matches!(ev.response, UnitResponse::Ready));

        let corr = CorrelationId::new();
        assert!(handle.send(UnitRequest::Count {
            id: corr,
            text: Payload::Inline("one two three".to_string()),
        }));

        let ev = events.recv().await.unwrap();
        match ev.response {
            UnitResponse::Count { id, count } => {
                assert_eq!(id, corr);
                assert_eq!(count, 3);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_init_is_idempotent_when_ready() {
        let (handle, mut events) = spawn(stub_factory());
        events.recv().await.unwrap(); // Ready

        for _ in 0..2 {
            let corr = CorrelationId::new();
            handle.send(UnitRequest::Init { id: corr });
            let ev = events.recv().await.unwrap();
            match ev.response {
                UnitResponse::Init { id, success } => {
                    assert_eq!(id, corr);
                    assert!(success);
                }
                other => panic!("unexpected response: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_failed_init_reports_error_and_unhealthy() {
        let (handle, mut events) = spawn(failing_factory());

        let ev = events.recv().await.unwrap();
        assert!(matches!(
            ev.response,
            UnitResponse::Error { id: None, .. }
        ));

        // Health checks stay answerable while degraded
        let corr = CorrelationId::new();
        handle.send(UnitRequest::HealthCheck { id: corr });
        let ev = events.recv().await.unwrap();
        match ev.response {
            UnitResponse::Health { id, healthy } => {
                assert_eq!(id, corr);
                assert!(!healthy);
            }
            other => panic!("unexpected response: {other:?}"),
        }

        // Counting without an encoder reports, never panics
        let corr = CorrelationId::new();
        handle.send(UnitRequest::Count {
            id: corr,
            text: Payload::Inline("text".to_string()),
        });
        let ev = events.recv().await.unwrap();
        assert!(matches!(
            ev.response,
            UnitResponse::Error { id: Some(i), .. } if i == corr
        ));
    }

    #[tokio::test]
    async fn test_batch_marks_failed_members_none() {
        let (handle, mut events) = spawn(stub_factory());
        events.recv().await.unwrap(); // Ready

        let corr = CorrelationId::new();
        handle.send(UnitRequest::CountBatch {
            id: corr,
            texts: vec![
                Payload::Inline("a b".to_string()),
                Payload::Inline("bad \u{0} input".to_string()),
                Payload::Inline("c".to_string()),
            ],
        });

        let ev = events.recv().await.unwrap();
        match ev.response {
            UnitResponse::CountBatch { id, counts } => {
                assert_eq!(id, corr);
                assert_eq!(counts, vec![Some(2), None, Some(1)]);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }
}
