//! Serialized blobs for complex preference values
//!
//! A complex value is wrapped in a versioned envelope carrying an md5 checksum
//! of its CBOR encoding; the envelope is CBOR-encoded and then Base64 text
//! (standard alphabet, padded) so it fits in a native string entry.

use base64::{engine::general_purpose::STANDARD, Engine};
use ciborium::Value;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current envelope format version
pub const BLOB_VERSION: u32 = 1;

/// Blob encoding and decoding errors
#[derive(Debug, Error)]
pub enum BlobError {
    /// Stored text is not valid Base64
    #[error("Invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// CBOR encoding failed
    #[error("Encode error: {0}")]
    Encode(#[from] ciborium::ser::Error<std::io::Error>),

    /// CBOR decoding failed
    #[error("Decode error: {0}")]
    Decode(#[from] ciborium::de::Error<std::io::Error>),

    /// Blob was written by an incompatible format version
    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Version this build reads
        expected: u32,
        /// Version found in the blob
        found: u32,
    },

    /// Payload does not match its checksum
    #[error("Corruption detected: {0}")]
    Corruption(String),
}

/// Result type for blob operations
pub type Result<T> = std::result::Result<T, BlobError>;

#[derive(Debug, Serialize, Deserialize)]
struct BlobEnvelope {
    version: u32,
    checksum: String,
    data: Value,
}

impl BlobEnvelope {
    fn new(data: Value) -> Result<Self> {
        let checksum = checksum(&data)?;
        Ok(Self { version: BLOB_VERSION, checksum, data })
    }

    fn verify(&self) -> Result<()> {
        if self.version != BLOB_VERSION {
            return Err(BlobError::VersionMismatch { expected: BLOB_VERSION, found: self.version });
        }

        let computed = checksum(&self.data)?;
        if computed != self.checksum {
            return Err(BlobError::Corruption(format!(
                "Checksum mismatch: expected {}, got {}",
                self.checksum, computed
            )));
        }

        Ok(())
    }
}

fn checksum(data: &Value) -> Result<String> {
    let mut payload = Vec::new();
    ciborium::into_writer(data, &mut payload)?;
    Ok(format!("{:x}", md5::compute(&payload)))
}

/// Encode a structured value as blob text
pub fn encode(value: &Value) -> Result<String> {
    let envelope = BlobEnvelope::new(value.clone())?;
    let mut bytes = Vec::new();
    ciborium::into_writer(&envelope, &mut bytes)?;
    Ok(STANDARD.encode(bytes))
}

/// Decode blob text back into a structured value
pub fn decode(text: &str) -> Result<Value> {
    let bytes = STANDARD.decode(text.trim())?;
    let envelope: BlobEnvelope = ciborium::from_reader(bytes.as_slice())?;
    envelope.verify()?;
    Ok(envelope.data)
}
