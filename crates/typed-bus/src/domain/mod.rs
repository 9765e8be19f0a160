//! Domain layer: the envelope, its framing, message identity and the
//! connection state machine. No I/O happens here.

pub mod codec;
pub mod envelope;
pub mod message;
pub mod state;

pub use codec::EnvelopeCodec;
pub use envelope::{Envelope, Properties};
pub use message::{Message, PayloadType};
pub use state::{ConnectionState, StateCell};
