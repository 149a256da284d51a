//! Cowrite Core - Operational transformation for concurrent plain text
//!
//! This is the consistency core of Cowrite. It implements:
//! - Tombstone-aware run-length character sequences
//! - Mutation execution against flat and paragraph-split text buffers
//! - Compose/transform algorithms that reconcile concurrent edits
//! - Per-document sequencing and outgoing-edit coalescing
//!
//! # Examples
//!
//! ```rust
//! use cowrite_core::ot::{Operation, SimpleText, TextOp};
//!
//! let mut text = SimpleText::new("abc");
//! let op = Operation::Text(vec![TextOp::Skip(1), TextOp::Delete(1), TextOp::Skip(1)]);
//! text.apply(&op).unwrap();
//!
//! assert_eq!(text.text(), "ac");
//! assert_eq!(text.tombs().runs(), &[1, -1, 1]);
//! ```

pub mod error;
pub mod ot;
pub mod session;

// Re-exports for convenience
pub use error::{OtError, Result};
pub use ot::{Mutation, Operation, TextOp, TombSequence};
pub use session::{PermaState, Session};

/// Document identifier type (the `perma` field on the wire)
pub type DocumentId = String;

/// Sub-entity identifier type within a document
pub type EntityId = String;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_import() {
        // Smoke test that modules compile
        let _doc_id: DocumentId = "doc-123".to_string();
        let _session = Session::new();
    }
}
