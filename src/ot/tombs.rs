//! Tombstone run-length sequence: the authoritative character-position map
//!
//! A document's character positions are recorded as a sequence of signed run
//! lengths: a positive run is that many live (visible) characters, a negative
//! run is that many buried (deleted but position-retaining) characters.
//! Deleting never removes positions, it flips live runs negative, so
//! offsets computed by concurrent editors stay resolvable.
//!
//! # Invariants
//!
//! - No run is zero
//! - Adjacent runs never share a sign (same-sign neighbors are merged)
//! - `total_len()` equals live count plus buried count at all times

use crate::error::{OtError, Result};
use serde::{Deserialize, Serialize};

/// Run-length sequence of live (positive) and buried (negative) runs.
///
/// # Example
///
/// ```rust
/// use cowrite_core::ot::TombSequence;
///
/// let mut seq = TombSequence::of_live(5);
/// let buried = seq.cursor().bury(2).unwrap();
///
/// assert_eq!(buried, 2);
/// assert_eq!(seq.runs(), &[-2, 3]);
/// assert_eq!(seq.live_len(), 3);
/// assert_eq!(seq.total_len(), 5);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TombSequence {
    runs: Vec<i64>,
}

impl TombSequence {
    /// Empty sequence (a document with no characters, live or buried)
    pub fn new() -> Self {
        Self { runs: Vec::new() }
    }

    /// Sequence covering `n` live characters
    pub fn of_live(n: usize) -> Self {
        if n == 0 {
            Self::new()
        } else {
            Self {
                runs: vec![n as i64],
            }
        }
    }

    /// The raw signed runs
    pub fn runs(&self) -> &[i64] {
        &self.runs
    }

    /// Total length: live plus buried characters
    pub fn total_len(&self) -> usize {
        self.runs.iter().map(|r| r.unsigned_abs() as usize).sum()
    }

    /// Number of live (visible) characters
    pub fn live_len(&self) -> usize {
        self.runs
            .iter()
            .filter(|r| **r > 0)
            .map(|r| *r as usize)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// A fresh cursor at position 0. One cursor per mutation pass; cursors
    /// are never persisted.
    pub fn cursor(&mut self) -> TombCursor<'_> {
        TombCursor {
            seq: self,
            pos: 0,
            inside: 0,
        }
    }

    /// A fresh read-only walker at position 0, for position queries
    pub fn walker(&self) -> TombWalker<'_> {
        TombWalker {
            seq: self,
            pos: 0,
            inside: 0,
        }
    }
}

/// Stateful cursor over a [`TombSequence`]: `(run index, offset-in-run)`.
///
/// All offsets handed to cursor operations are *raw* units (live and buried
/// both count). Any walk past the end of the run array
/// fails with [`OtError::SequenceExhausted`]; callers must abort the current
/// mutation pass on that.
#[derive(Debug)]
pub struct TombCursor<'a> {
    seq: &'a mut TombSequence,
    pos: usize,
    inside: usize,
}

impl TombCursor<'_> {
    /// Insert `n` live characters at the cursor.
    ///
    /// Inside a live run the run is extended. At the start of a buried run
    /// the insert merges into the end of the preceding live run when one
    /// exists; strictly inside a buried run the run splits into
    /// `[-left, n, -right]`. Zero-length inserts are no-ops.
    pub fn insert_live(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        loop {
            let runs = &mut self.seq.runs;
            if self.pos == runs.len() {
                // At end of sequence: merge into a trailing live run, else append
                if matches!(runs.last(), Some(last) if *last > 0) {
                    self.pos -= 1;
                    self.inside = runs[self.pos] as usize;
                    continue;
                }
                runs.push(n as i64);
                self.pos = runs.len() - 1;
                self.inside = n;
                return;
            }
            let run = runs[self.pos];
            if run > 0 {
                runs[self.pos] = run + n as i64;
                self.inside += n;
                return;
            }
            let len = run.unsigned_abs() as usize;
            if self.inside == len {
                // Fully past this buried run
                self.pos += 1;
                self.inside = 0;
                continue;
            }
            if self.inside == 0 {
                if self.pos > 0 {
                    // Preceding run is live by the adjacency invariant
                    self.pos -= 1;
                    self.inside = self.seq.runs[self.pos] as usize;
                    continue;
                }
                runs.insert(0, n as i64);
                self.pos = 0;
                self.inside = n;
                return;
            }
            // Split the buried run around the insert
            let right = (len - self.inside) as i64;
            runs[self.pos] = -(self.inside as i64);
            runs.insert(self.pos + 1, n as i64);
            runs.insert(self.pos + 2, -right);
            self.pos += 1;
            self.inside = n;
            return;
        }
    }

    /// Insert `n` buried characters at the cursor.
    ///
    /// Mirror image of [`insert_live`](Self::insert_live) with the polarity
    /// flipped; used when replaying content that is already known deleted.
    pub fn insert_tombs(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        loop {
            let runs = &mut self.seq.runs;
            if self.pos == runs.len() {
                if matches!(runs.last(), Some(last) if *last < 0) {
                    self.pos -= 1;
                    self.inside = runs[self.pos].unsigned_abs() as usize;
                    continue;
                }
                runs.push(-(n as i64));
                self.pos = runs.len() - 1;
                self.inside = n;
                return;
            }
            let run = runs[self.pos];
            if run < 0 {
                runs[self.pos] = run - n as i64;
                self.inside += n;
                return;
            }
            let len = run as usize;
            if self.inside == len {
                self.pos += 1;
                self.inside = 0;
                continue;
            }
            if self.inside == 0 {
                if self.pos > 0 {
                    self.pos -= 1;
                    self.inside = self.seq.runs[self.pos].unsigned_abs() as usize;
                    continue;
                }
                runs.insert(0, -(n as i64));
                self.pos = 0;
                self.inside = n;
                return;
            }
            let right = (len - self.inside) as i64;
            runs[self.pos] = self.inside as i64;
            runs.insert(self.pos + 1, -(n as i64));
            runs.insert(self.pos + 2, right);
            self.pos += 1;
            self.inside = n;
            return;
        }
    }

    /// Bury `n` raw units starting at the cursor, converting live characters
    /// into buried ones. Units that are already buried are stepped over
    /// without being counted. Returns the number of live characters actually
    /// buried.
    pub fn bury(&mut self, mut n: usize) -> Result<usize> {
        let mut buried = 0;
        while n > 0 {
            if self.pos == self.seq.runs.len() {
                return Err(OtError::SequenceExhausted);
            }
            let run = self.seq.runs[self.pos];
            if run < 0 {
                // Already buried: step over without re-burying
                let len = run.unsigned_abs() as usize;
                let m = n.min(len - self.inside);
                self.inside += m;
                n -= m;
                if self.inside == len && n > 0 {
                    self.pos += 1;
                    self.inside = 0;
                }
                continue;
            }
            let len = run as usize;
            if self.inside == len {
                self.pos += 1;
                self.inside = 0;
                continue;
            }
            let m = n.min(len - self.inside);
            n -= m;
            buried += m;
            let left = self.inside;
            let right = len - self.inside - m;
            let runs = &mut self.seq.runs;
            runs[self.pos] = -(m as i64);
            self.inside = m;
            if left > 0 {
                runs.insert(self.pos, left as i64);
                self.pos += 1;
            } else if self.pos > 0 {
                // No live remainder on the left: merge into the preceding
                // buried run to keep the adjacency invariant
                runs.remove(self.pos);
                self.pos -= 1;
                runs[self.pos] -= m as i64;
                self.inside = runs[self.pos].unsigned_abs() as usize;
            }
            if right > 0 {
                runs.insert(self.pos + 1, right as i64);
            } else if self.pos + 1 < runs.len() {
                // Buried run now touches the next buried run: merge
                runs[self.pos] += runs[self.pos + 1];
                runs.remove(self.pos + 1);
            }
        }
        Ok(buried)
    }

    /// Advance over `n` raw units (live and buried both count toward `n`).
    /// Returns how many of them were live characters, which is how far a
    /// visible text position moves.
    pub fn skip(&mut self, mut n: usize) -> Result<usize> {
        let mut lived = 0;
        while n > 0 {
            if self.pos >= self.seq.runs.len() {
                return Err(OtError::SequenceExhausted);
            }
            let run = self.seq.runs[self.pos];
            let len = run.unsigned_abs() as usize;
            if self.inside == len {
                self.pos += 1;
                self.inside = 0;
                continue;
            }
            let m = n.min(len - self.inside);
            self.inside += m;
            n -= m;
            if run > 0 {
                lived += m;
            }
        }
        Ok(lived)
    }

}

/// Read-only walk over a [`TombSequence`]: maps between visible offsets and
/// the raw op lengths that address them, without ever changing the runs.
/// Created per query via [`TombSequence::walker`].
#[derive(Debug)]
pub struct TombWalker<'a> {
    seq: &'a TombSequence,
    pos: usize,
    inside: usize,
}

impl TombWalker<'_> {
    /// Advance over `n` raw units, returning how many of them were live
    pub fn skip(&mut self, mut n: usize) -> Result<usize> {
        let mut lived = 0;
        while n > 0 {
            if self.pos >= self.seq.runs.len() {
                return Err(OtError::SequenceExhausted);
            }
            let run = self.seq.runs[self.pos];
            let len = run.unsigned_abs() as usize;
            if self.inside == len {
                self.pos += 1;
                self.inside = 0;
                continue;
            }
            let m = n.min(len - self.inside);
            self.inside += m;
            n -= m;
            if run > 0 {
                lived += m;
            }
        }
        Ok(lived)
    }

    /// Advance over `n` *visible* characters; buried runs along the way are
    /// stepped over for free. Returns the raw units advanced, i.e. the op
    /// length that covers those visible characters. Buried runs after the last
    /// visible character are not consumed.
    pub fn skip_visible(&mut self, mut n: usize) -> Result<usize> {
        let mut raw = 0;
        while n > 0 {
            if self.pos >= self.seq.runs.len() {
                return Err(OtError::SequenceExhausted);
            }
            let run = self.seq.runs[self.pos];
            let len = run.unsigned_abs() as usize;
            if self.inside == len {
                self.pos += 1;
                self.inside = 0;
                continue;
            }
            if run < 0 {
                raw += len - self.inside;
                self.pos += 1;
                self.inside = 0;
            } else {
                let m = n.min(len - self.inside);
                self.inside += m;
                raw += m;
                n -= m;
            }
        }
        Ok(raw)
    }

    /// Advance to the end of the sequence, returning the raw units remaining
    /// from the current position.
    pub fn skip_to_end(&mut self) -> usize {
        let mut raw = 0;
        while self.pos < self.seq.runs.len() {
            raw += self.seq.runs[self.pos].unsigned_abs() as usize - self.inside;
            self.inside = 0;
            self.pos += 1;
        }
        raw
    }
}
