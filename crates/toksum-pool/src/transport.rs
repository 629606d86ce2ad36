//! Payload transport strategies
//!
//! Moving a multi-megabyte text into a unit message by value doubles peak
//! memory. The shared strategy hands large texts over behind an `Arc`
//! instead. The pool must stay fully functional with the inline strategy,
//! which always copies.

use std::sync::Arc;

/// Text as carried inside a unit message.
#[derive(Debug, Clone)]
pub enum Payload {
    Inline(String),
    Shared(Arc<str>),
}

impl Payload {
    pub fn as_str(&self) -> &str {
        match self {
            Payload::Inline(s) => s,
            Payload::Shared(s) => s,
        }
    }

    pub fn len(&self) -> usize {
        self.as_str().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

/// How the pool packs a text for transfer to an execution unit.
pub trait TransportStrategy: Send + Sync + 'static {
    fn pack(&self, text: &Arc<str>) -> Payload;
}

/// Always copies the text into the message.
pub struct InlineTransport;

impl TransportStrategy for InlineTransport {
    fn pack(&self, text: &Arc<str>) -> Payload {
        Payload::Inline(text.to_string())
    }
}

/// Shares texts at or above a size threshold, copies smaller ones.
pub struct SharedTransport {
    pub threshold_bytes: usize,
}

impl TransportStrategy for SharedTransport {
    fn pack(&self, text: &Arc<str>) -> Payload {
        if text.len() >= self.threshold_bytes {
            Payload::Shared(Arc::clone(text))
        } else {
            Payload::Inline(text.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_always_copies() {
        let text: Arc<str> = Arc::from("hello");
        match InlineTransport.pack(&text) {
            Payload::Inline(s) => assert_eq!(s, "hello"),
            Payload::Shared(_) => panic!("inline transport produced a shared payload"),
        }
    }

    #[test]
    fn test_shared_respects_threshold() {
        let transport = SharedTransport { threshold_bytes: 8 };

        let small: Arc<str> = Arc::from("short");
        assert!(matches!(transport.pack(&small), Payload::Inline(_)));

        let large: Arc<str> = Arc::from("large enough payload");
        let packed = transport.pack(&large);
        assert!(matches!(packed, Payload::Shared(_)));
        assert_eq!(packed.as_str(), "large enough payload");
    }
}
