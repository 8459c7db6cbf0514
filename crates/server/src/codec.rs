//! At-rest encoding for message bodies.
//!
//! Messages persist a display copy and a separately-encoded copy. The
//! codec is NOT a confidentiality boundary: there is no key material and
//! no end-to-end guarantee. It exists so the stored representation can be
//! swapped (compression, envelope formats) without touching the pipeline.

use base64::{engine::general_purpose::STANDARD, Engine};

#[derive(Debug, thiserror::Error)]
#[error("failed to decode stored content: {0}")]
pub struct DecodeError(String);

pub trait ContentCodec: Send + Sync {
    fn encode(&self, plain: &str) -> String;
    fn decode(&self, encoded: &str) -> Result<String, DecodeError>;
}

/// Default codec: standard-alphabet base64 of the UTF-8 bytes.
pub struct Base64Codec;

impl ContentCodec for Base64Codec {
    fn encode(&self, plain: &str) -> String {
        STANDARD.encode(plain.as_bytes())
    }

    fn decode(&self, encoded: &str) -> Result<String, DecodeError> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| DecodeError(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| DecodeError(e.to_string()))
    }
}
