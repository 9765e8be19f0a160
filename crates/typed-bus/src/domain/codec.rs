//! # Envelope Codec
//!
//! Structural framing of an [`Envelope`] into broker record bytes. This is
//! separate from serializing the application payload, which happens before
//! the envelope is built.
//!
//! ## Layout
//!
//! ```text
//! ┌────────┬─────────┬──────────────────────────────────────────────┐
//! │ magic  │ version │ body (bincode, varint ints, little endian)   │
//! │ "TB"   │ 0x01    │ payload_type │ Option<properties> │ payload │
//! └────────┴─────────┴──────────────────────────────────────────────┘
//! ```
//!
//! No compression or encryption happens at this layer.

use super::envelope::Envelope;
use crate::error::EnvelopeError;
use bincode::Options;

/// First two bytes of every framed envelope.
pub const ENVELOPE_MAGIC: [u8; 2] = *b"TB";

/// Current framing version.
pub const ENVELOPE_VERSION: u8 = 1;

/// Magic plus version byte.
pub const HEADER_LEN: usize = 3;

/// Largest envelope body accepted in either direction (64 MiB).
pub const MAX_ENVELOPE_BYTES: u64 = 64 * 1024 * 1024;

/// Encoder/decoder between [`Envelope`] values and record bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeCodec;

impl EnvelopeCodec {
    /// Frame an envelope.
    ///
    /// # Errors
    ///
    /// - `EnvelopeError::TooLarge` - body exceeds [`MAX_ENVELOPE_BYTES`]
    pub fn encode(envelope: &Envelope) -> Result<Vec<u8>, EnvelopeError> {
        let body_len = body_options()
            .serialized_size(envelope)
            .map_err(|e| map_bincode_error(&e, 0))?;

        let mut out = Vec::with_capacity(HEADER_LEN + body_len as usize);
        out.extend_from_slice(&ENVELOPE_MAGIC);
        out.push(ENVELOPE_VERSION);
        body_options()
            .serialize_into(&mut out, envelope)
            .map_err(|e| map_bincode_error(&e, 0))?;

        Ok(out)
    }

    /// Parse record bytes back into an envelope.
    ///
    /// # Errors
    ///
    /// - `EnvelopeError::Truncated` - input ends before the framing does
    /// - `EnvelopeError::BadMagic` - not produced by this codec
    /// - `EnvelopeError::UnsupportedVersion` - framing from a newer codec
    /// - `EnvelopeError::TooLarge` - a length prefix exceeds the size bound
    /// - `EnvelopeError::Malformed` - bad option tag, invalid UTF-8, trailing bytes
    pub fn decode(bytes: &[u8]) -> Result<Envelope, EnvelopeError> {
        if bytes.len() < HEADER_LEN {
            return Err(EnvelopeError::Truncated { len: bytes.len() });
        }

        let magic = [bytes[0], bytes[1]];
        if magic != ENVELOPE_MAGIC {
            return Err(EnvelopeError::BadMagic { found: magic });
        }

        let version = bytes[2];
        if version != ENVELOPE_VERSION {
            return Err(EnvelopeError::UnsupportedVersion {
                version,
                supported: ENVELOPE_VERSION,
            });
        }

        body_options()
            .deserialize(&bytes[HEADER_LEN..])
            .map_err(|e| map_bincode_error(&e, bytes.len()))
    }
}

fn body_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_limit(MAX_ENVELOPE_BYTES)
        .reject_trailing_bytes()
}

fn map_bincode_error(err: &bincode::ErrorKind, len: usize) -> EnvelopeError {
    match err {
        bincode::ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            EnvelopeError::Truncated { len }
        }
        bincode::ErrorKind::SizeLimit => EnvelopeError::TooLarge {
            max: MAX_ENVELOPE_BYTES,
        },
        other => EnvelopeError::Malformed(other.to_string()),
    }
}
