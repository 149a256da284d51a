//! Error types shared across the OT core
//!
//! All errors from the tomb sequence and the op-stream readers bubble
//! unmodified to the executor/composer/transformer caller; nothing is
//! recovered inside this crate. Out-of-order duplicate mutations are not an
//! error: the session layer logs and drops them.

use thiserror::Error;

/// Errors produced by the OT core
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OtError {
    /// A tomb-sequence walk ran past the end of the recorded runs.
    /// Always fatal to the current mutation pass.
    #[error("tomb sequence exhausted before the operation was satisfied")]
    SequenceExhausted,

    /// Two op streams could not be paired (different total lengths, or a
    /// non-insert op left over after the other stream ended).
    #[error("mismatched operations: {0}")]
    MismatchedOperations(String),

    /// An op kind not recognized in this context (e.g. an unknown wire shape
    /// routed to the text executor).
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The text buffer disagrees with its tomb sequence. Indicates a
    /// corrupted mutation history; fatal.
    #[error("text buffer out of sync with its tomb sequence")]
    BufferDesync,
}

/// Result type alias for OT operations
pub type Result<T> = std::result::Result<T, OtError>;
