//! Transformer: reconcile two concurrent operations against the same base
//!
//! Given `op1` and `op2` generated concurrently against one base state,
//! produce `(op1', op2')` such that `op1` followed by `op2'` and `op2`
//! followed by `op1'` converge to the same document.
//!
//! An insert in either stream forces a skip of the same length into the
//! other stream's output: the other edit must step over the newly created
//! content without touching it. Skip/delete pairs need no adjustment since
//! the reader already aligned their lengths. Same-position concurrent inserts
//! are tie-broken by stream order: stream 1's insert always lands left of
//! stream 2's. That rule is deterministic as long as every replica feeds
//! the two ops in the same order (this core passes the remote op as stream
//! 1 everywhere).

use crate::error::Result;
use crate::ot::op::{Operation, TextOp};
use crate::ot::stream::TransformReader;

/// Transform two concurrent operations into their adjusted pair.
///
/// Applying `op1` then the returned second op yields the same document as
/// applying `op2` then the returned first op.
pub fn transform(op1: &Operation, op2: &Operation) -> Result<(Operation, Operation)> {
    let Operation::Text(ops1) = op1;
    let Operation::Text(ops2) = op2;
    let (out1, out2) = transform_text(ops1, ops2)?;
    Ok((Operation::Text(out1), Operation::Text(out2)))
}

fn transform_text(ops1: &[TextOp], ops2: &[TextOp]) -> Result<(Vec<TextOp>, Vec<TextOp>)> {
    let mut out1 = Vec::new();
    let mut out2 = Vec::new();
    let mut reader = TransformReader::new(ops1, ops2);
    while let Some((unit1, unit2)) = reader.read_pair()? {
        match (unit1, unit2) {
            (Some(op), None) if op.is_insert() => {
                out2.push(TextOp::Skip(op.len()));
                out1.push(op);
            }
            (None, Some(op)) if op.is_insert() => {
                out1.push(TextOp::Skip(op.len()));
                out2.push(op);
            }
            (unit1, unit2) => {
                // Aligned skip/delete pairs pass through unchanged
                if let Some(op) = unit1 {
                    out1.push(op);
                }
                if let Some(op) = unit2 {
                    out2.push(op);
                }
            }
        }
    }
    Ok((out1, out2))
}
