use thiserror::Error;

/// Malformed or out-of-sequence traffic. Dropped and logged, never applied.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Unexpected origin {actual} (expected {expected})")]
    OriginMismatch { expected: String, actual: String },

    #[error("Stale sequence {sequence} (last accepted {last})")]
    StaleSequence { sequence: u64, last: u64 },

    #[error("Unsupported protocol version {0}")]
    UnsupportedVersion(u32),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        ProtocolError::Malformed(e.to_string())
    }
}
