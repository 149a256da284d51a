//! Positioned op streams and pairwise alignment readers
//!
//! Compose and transform both walk two op lists in lock-step by content
//! position rather than by op index. [`OpStream`] is the splitting reader
//! over one list; the two pair readers encode which ops may stand alone:
//! for transform every insert goes first (both streams address the same
//! base), for compose only the second stream's inserts do (the first
//! stream's inserts are content the second op walks over).

use crate::error::{OtError, Result};
use crate::ot::op::TextOp;

/// Reader over one op list with a position inside the front op.
#[derive(Debug)]
pub struct OpStream<'a> {
    ops: &'a [TextOp],
    pos: usize,
    inside: usize,
}

impl<'a> OpStream<'a> {
    pub fn new(ops: &'a [TextOp]) -> Self {
        Self {
            ops,
            pos: 0,
            inside: 0,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.pos == self.ops.len()
    }

    /// The op at the front of the stream, if any
    pub fn front(&self) -> Option<&TextOp> {
        self.ops.get(self.pos)
    }

    /// Units left in the front op
    fn remaining(&self) -> usize {
        self.ops[self.pos].len() - self.inside
    }

    /// Read `len` units from the front op, splitting it if needed.
    /// `len` must not exceed the front op's remaining length.
    pub fn read(&mut self, len: usize) -> TextOp {
        let op = &self.ops[self.pos];
        let piece = match op {
            TextOp::InsertChars(s) => {
                if self.inside == 0 && len == op.len() {
                    TextOp::InsertChars(s.clone())
                } else {
                    TextOp::InsertChars(s.chars().skip(self.inside).take(len).collect())
                }
            }
            TextOp::InsertTombs(_) => TextOp::InsertTombs(len),
            TextOp::Skip(_) => TextOp::Skip(len),
            TextOp::Delete(_) => TextOp::Delete(len),
        };
        self.inside += len;
        if self.inside == op.len() {
            self.inside = 0;
            self.pos += 1;
        }
        piece
    }

    /// Read whatever remains of the front op
    pub fn read_rest(&mut self) -> TextOp {
        let rest = self.remaining();
        self.read(rest)
    }
}

/// One aligned read: up to one op piece from each stream. `None` on a side
/// means that side contributed nothing to this pair.
pub type OpPair = (Option<TextOp>, Option<TextOp>);

/// Pair reader for transformation: both streams address the same base state.
///
/// Rules, first match wins:
/// 1. Both streams exhausted: done.
/// 2. One exhausted: the other may only hold insert-kind ops from here on.
/// 3. An insert-kind op at the front of stream 1 is read whole and alone;
///    then the same check for stream 2. Stream 1 priority is the canonical
///    tie-break for same-position concurrent inserts.
/// 4. Otherwise both fronts consume base positions: read
///    `min(remaining, remaining)` units from each.
#[derive(Debug)]
pub struct TransformReader<'a> {
    s1: OpStream<'a>,
    s2: OpStream<'a>,
}

impl<'a> TransformReader<'a> {
    pub fn new(ops1: &'a [TextOp], ops2: &'a [TextOp]) -> Self {
        Self {
            s1: OpStream::new(ops1),
            s2: OpStream::new(ops2),
        }
    }

    pub fn read_pair(&mut self) -> Result<Option<OpPair>> {
        if self.s1.is_eof() && self.s2.is_eof() {
            return Ok(None);
        }
        if self.s1.is_eof() {
            if self.s2.front().is_some_and(TextOp::is_insert) {
                return Ok(Some((None, Some(self.s2.read_rest()))));
            }
            return Err(OtError::MismatchedOperations(
                "streams have different lengths".into(),
            ));
        }
        if self.s2.is_eof() {
            if self.s1.front().is_some_and(TextOp::is_insert) {
                return Ok(Some((Some(self.s1.read_rest()), None)));
            }
            return Err(OtError::MismatchedOperations(
                "streams have different lengths".into(),
            ));
        }
        if self.s1.front().is_some_and(TextOp::is_insert) {
            return Ok(Some((Some(self.s1.read_rest()), None)));
        }
        if self.s2.front().is_some_and(TextOp::is_insert) {
            return Ok(Some((None, Some(self.s2.read_rest()))));
        }
        let len = self.s1.remaining().min(self.s2.remaining());
        Ok(Some((Some(self.s1.read(len)), Some(self.s2.read(len)))))
    }
}

/// Pair reader for composition: the second stream addresses the output of
/// the first. The first stream's inserts are therefore content the second
/// op must walk over (they pair by length with the second's skip/delete);
/// only the second stream's inserts stand alone.
#[derive(Debug)]
pub struct ComposeReader<'a> {
    first: OpStream<'a>,
    second: OpStream<'a>,
}

impl<'a> ComposeReader<'a> {
    pub fn new(first: &'a [TextOp], second: &'a [TextOp]) -> Self {
        Self {
            first: OpStream::new(first),
            second: OpStream::new(second),
        }
    }

    pub fn read_pair(&mut self) -> Result<Option<OpPair>> {
        if self.first.is_eof() && self.second.is_eof() {
            return Ok(None);
        }
        if self.first.is_eof() {
            if self.second.front().is_some_and(TextOp::is_insert) {
                return Ok(Some((None, Some(self.second.read_rest()))));
            }
            return Err(OtError::MismatchedOperations(
                "second op outruns the first op's output".into(),
            ));
        }
        if self.second.is_eof() {
            if self.first.front().is_some_and(TextOp::is_insert) {
                return Ok(Some((Some(self.first.read_rest()), None)));
            }
            return Err(OtError::MismatchedOperations(
                "second op ends before the first op's output".into(),
            ));
        }
        if self.second.front().is_some_and(TextOp::is_insert) {
            return Ok(Some((None, Some(self.second.read_rest()))));
        }
        let len = self.first.remaining().min(self.second.remaining());
        Ok(Some((Some(self.first.read(len)), Some(self.second.read(len)))))
    }
}
