//! Composer: collapse two sequentially-applied operations into one
//!
//! `second` is applied after `first` (first's output is second's input).
//! The composed op has the same net effect as applying both in order. The
//! one interesting rule: content inserted by `first` and deleted by
//! `second` never needs to be materialized; it collapses to a tombstone
//! insert of the same length.

use crate::error::Result;
use crate::ot::op::{Operation, TextOp};
use crate::ot::stream::ComposeReader;

/// Compose `first` then `second` into one equivalent operation.
///
/// # Example
///
/// ```rust
/// use cowrite_core::ot::{compose, Operation, TextOp};
///
/// let first = Operation::Text(vec![TextOp::InsertChars("X".into())]);
/// let second = Operation::Text(vec![TextOp::Delete(1)]);
///
/// let composed = compose(&first, &second).unwrap();
/// assert_eq!(composed.text_ops(), &[TextOp::InsertTombs(1)]);
/// ```
pub fn compose(first: &Operation, second: &Operation) -> Result<Operation> {
    let Operation::Text(first_ops) = first;
    let Operation::Text(second_ops) = second;
    Ok(Operation::Text(compose_text(first_ops, second_ops)?))
}

fn compose_text(first: &[TextOp], second: &[TextOp]) -> Result<Vec<TextOp>> {
    let mut out = Vec::new();
    let mut reader = ComposeReader::new(first, second);
    while let Some((first_unit, second_unit)) = reader.read_pair()? {
        if let Some(op) = compose_unit(first_unit, second_unit) {
            if !op.is_empty() {
                out.push(op);
            }
        }
    }
    Ok(out)
}

fn compose_unit(first: Option<TextOp>, second: Option<TextOp>) -> Option<TextOp> {
    match (first, second) {
        (None, None) => None,
        // Standalone inserts from the second op land as-is
        (None, Some(second)) => Some(second),
        // Trailing inserts of the first op survive unchanged
        (Some(first), None) => Some(first),
        (Some(first), Some(second)) => match first {
            TextOp::InsertChars(_) | TextOp::InsertTombs(_) => match second {
                // Inserted then deleted: only the tombstones remain
                TextOp::Delete(_) => Some(TextOp::InsertTombs(first.len())),
                _ => Some(first),
            },
            // A delete stays a delete no matter what walks over it later
            TextOp::Delete(_) => Some(first),
            TextOp::Skip(_) => Some(second),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(ops: Vec<TextOp>) -> Operation {
        Operation::Text(ops)
    }

    #[test]
    fn test_insert_then_delete_collapses_to_tombs() {
        let first = text(vec![TextOp::InsertChars("X".into())]);
        let second = text(vec![TextOp::Delete(1)]);
        let composed = compose(&first, &second).unwrap();
        assert_eq!(composed.text_ops(), &[TextOp::InsertTombs(1)]);
    }

    #[test]
    fn test_insert_partially_deleted() {
        let first = text(vec![TextOp::InsertChars("ab".into())]);
        let second = text(vec![TextOp::Skip(1), TextOp::Delete(1)]);
        let composed = compose(&first, &second).unwrap();
        assert_eq!(
            composed.text_ops(),
            &[TextOp::InsertChars("a".into()), TextOp::InsertTombs(1)]
        );
    }

    #[test]
    fn test_two_typing_bursts_coalesce() {
        // "skip 2, type x" then "skip 3, type y" against base "ab"
        let first = text(vec![TextOp::Skip(2), TextOp::InsertChars("x".into())]);
        let second = text(vec![TextOp::Skip(3), TextOp::InsertChars("y".into())]);
        let composed = compose(&first, &second).unwrap();
        assert_eq!(
            composed.text_ops(),
            &[
                TextOp::Skip(2),
                TextOp::InsertChars("x".into()),
                TextOp::InsertChars("y".into()),
            ]
        );
    }

    #[test]
    fn test_delete_survives_second_ops() {
        let first = text(vec![TextOp::Delete(2), TextOp::Skip(1)]);
        let second = text(vec![TextOp::Skip(2), TextOp::Delete(1)]);
        let composed = compose(&first, &second).unwrap();
        assert_eq!(
            composed.text_ops(),
            &[TextOp::Delete(2), TextOp::Delete(1)]
        );
    }

    #[test]
    fn test_skip_takes_second_unit() {
        let first = text(vec![TextOp::Skip(3)]);
        let second = text(vec![TextOp::Skip(1), TextOp::Delete(2)]);
        let composed = compose(&first, &second).unwrap();
        assert_eq!(composed.text_ops(), &[TextOp::Skip(1), TextOp::Delete(2)]);
    }

    #[test]
    fn test_length_mismatch_is_an_error() {
        let first = text(vec![TextOp::Skip(3)]);
        let second = text(vec![TextOp::Skip(1)]);
        assert!(compose(&first, &second).is_err());
    }

    #[test]
    fn test_compose_with_empty_second() {
        let first = text(vec![TextOp::InsertChars("hi".into())]);
        let second = Operation::empty();
        let composed = compose(&first, &second).unwrap();
        assert_eq!(composed.text_ops(), first.text_ops());
    }

    mod properties {
        use super::*;
        use crate::ot::execute::SimpleText;
        use proptest::prelude::*;

        /// Build an op that consumes exactly `base` raw units
        fn build_op(base: usize, seeds: &[(u8, usize, String)]) -> Operation {
            let mut remaining = base;
            let mut ops = Vec::new();
            for (kind, n, s) in seeds {
                match kind % 4 {
                    0 => {
                        if !s.is_empty() {
                            ops.push(TextOp::InsertChars(s.clone()));
                        }
                    }
                    1 => ops.push(TextOp::InsertTombs(*n)),
                    2 => {
                        let m = (*n).min(remaining);
                        if m > 0 {
                            ops.push(TextOp::Skip(m));
                            remaining -= m;
                        }
                    }
                    _ => {
                        let m = (*n).min(remaining);
                        if m > 0 {
                            ops.push(TextOp::Delete(m));
                            remaining -= m;
                        }
                    }
                }
            }
            if remaining > 0 {
                ops.push(TextOp::Skip(remaining));
            }
            Operation::Text(ops)
        }

        fn seeds() -> impl Strategy<Value = Vec<(u8, usize, String)>> {
            prop::collection::vec((0u8..4, 1usize..4, "[a-z]{1,3}"), 0..6)
        }

        proptest! {
            #[test]
            fn prop_composed_op_matches_sequential_application(
                base in "[a-z]{0,8}",
                seeds1 in seeds(),
                seeds2 in seeds(),
            ) {
                let len = base.chars().count();
                let first = build_op(len, &seeds1);
                // The second op addresses the first op's output
                let out_len: usize = first.text_ops().iter().map(TextOp::len).sum();
                let second = build_op(out_len, &seeds2);
                let composed = compose(&first, &second).unwrap();

                let mut sequential = SimpleText::new(&base);
                sequential.apply(&first).unwrap();
                sequential.apply(&second).unwrap();
                let mut direct = SimpleText::new(&base);
                direct.apply(&composed).unwrap();

                prop_assert_eq!(sequential.text(), direct.text());
                prop_assert_eq!(sequential.tombs(), direct.tombs());
            }
        }
    }
}
