//! Tokenization worker pool
//!
//! Estimates model-token counts on background execution units without
//! blocking the caller. Units go through a handshake (spawn, encoder
//! initialization, readiness) before receiving work; jobs carry deadlines
//! and a bounded queue sheds load instead of queueing indefinitely. When an
//! exact count cannot be obtained, the caller still gets a usable
//! length-based estimate tagged as approximate.

pub mod pool;
pub mod protocol;
mod queue;
pub mod transport;
pub mod unit;

pub use pool::TokenPool;
pub use protocol::{CorrelationId, UnitEvent, UnitId, UnitRequest, UnitResponse};
pub use transport::{InlineTransport, Payload, SharedTransport, TransportStrategy};
pub use unit::{EncoderUnitFactory, UnitFactory, UnitHandle, UnitLifecycle};
