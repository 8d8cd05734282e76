use thiserror::Error;

/// Comprehensive error handling for the witnessd evidence pipeline
#[derive(Error, Debug)]
pub enum WitnessError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid parameters: {reason}")]
    Params { reason: String },

    #[error("Invalid session certificate: {reason}")]
    InvalidCert { reason: String },

    #[error("Signature ordinal mismatch at index {index}: expected {expected}, got {actual}")]
    OrdinalMismatch {
        index: usize,
        expected: u64,
        actual: u64,
    },

    #[error("Signature verification failed at index {index}")]
    SignatureFailed { index: usize },

    #[error("Checkpoint {ordinal}: binding hash mismatch")]
    HashMismatch { ordinal: u64 },

    #[error("Checkpoint {ordinal}: broken chain link")]
    BrokenLink { ordinal: u64 },

    #[error("Checkpoint {ordinal}: VDF input mismatch")]
    VdfInputMismatch { ordinal: u64 },

    #[error("Checkpoint {ordinal}: VDF proof invalid")]
    VdfInvalid { ordinal: u64 },

    #[error("Checkpoint {ordinal}: missing VDF proof")]
    MissingVdf { ordinal: u64 },

    #[error("Ratchet has been wiped - session has ended")]
    RatchetWiped,

    #[error("No recovery data available for this session")]
    NoRecoveryData,

    #[error("Session recovery failed: {reason}")]
    SessionRecoveryFailed { reason: String },

    #[error("PUF backend unavailable: {reason}")]
    PufUnavailable { reason: String },

    #[error("PUF operation failed: {reason}")]
    Puf { reason: String },

    #[error("Invalid key migration record: {reason}")]
    InvalidMigration { reason: String },

    #[error("Verification deadline exceeded after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Decode error: {reason}")]
    Decode { reason: String },

    #[error("Key derivation failed: {reason}")]
    KeyDerivation { reason: String },
}

impl WitnessError {
    pub fn params(reason: impl Into<String>) -> Self {
        WitnessError::Params {
            reason: reason.into(),
        }
    }

    pub fn decode(reason: impl Into<String>) -> Self {
        WitnessError::Decode {
            reason: reason.into(),
        }
    }

    /// The checkpoint ordinal this error refers to, if any.
    pub fn ordinal(&self) -> Option<u64> {
        match self {
            WitnessError::HashMismatch { ordinal }
            | WitnessError::BrokenLink { ordinal }
            | WitnessError::VdfInputMismatch { ordinal }
            | WitnessError::VdfInvalid { ordinal }
            | WitnessError::MissingVdf { ordinal } => Some(*ordinal),
            _ => None,
        }
    }
}

/// Helper type alias for Results
pub type WitnessResult<T> = std::result::Result<T, WitnessError>;
