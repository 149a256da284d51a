//! Mutation executor: drive an op list against a document state
//!
//! [`execute`] walks the ops of an [`Operation`] and dispatches each one to
//! a [`MutationPass`]. The pass owns the document representation; two are
//! provided here. [`SimpleText`] keeps the document as one string and suits
//! single-field values. [`ParagraphText`] keeps a paragraph list and reports
//! which paragraphs a mutation touched, so a renderer only redraws what
//! changed.
//!
//! Execution is not transactional. When an op fails mid-pass the earlier
//! ops have already been applied and the error is reported as-is; the
//! caller decides whether the state is still usable.

use crate::error::{OtError, Result};
use crate::ot::op::{Operation, TextOp};
use crate::ot::tombs::{TombCursor, TombSequence};

/// One pass of a mutation over a document representation.
///
/// Implementations hold a cursor into the document; `execute` calls the
/// methods in op order and always calls [`finish`](Self::finish) last, even
/// when an op failed.
pub trait MutationPass {
    /// Insert live characters at the cursor
    fn insert_chars(&mut self, chars: &str) -> Result<()>;
    /// Insert already-buried characters at the cursor
    fn insert_tombs(&mut self, n: usize) -> Result<()>;
    /// Advance over `n` raw units
    fn skip(&mut self, n: usize) -> Result<()>;
    /// Bury live characters within the next `n` raw units
    fn delete(&mut self, n: usize) -> Result<()>;
    /// Flush any buffered effects; called exactly once per pass
    fn finish(&mut self);
}

/// Run every op of `op` through `pass`, then finish the pass.
pub fn execute<P: MutationPass>(pass: &mut P, op: &Operation) -> Result<()> {
    let result = run_ops(pass, op);
    pass.finish();
    result
}

fn run_ops<P: MutationPass>(pass: &mut P, op: &Operation) -> Result<()> {
    for text_op in op.text_ops() {
        match text_op {
            TextOp::InsertChars(chars) => pass.insert_chars(chars)?,
            TextOp::InsertTombs(n) => pass.insert_tombs(*n)?,
            TextOp::Skip(n) => pass.skip(*n)?,
            TextOp::Delete(n) => pass.delete(*n)?,
        }
    }
    Ok(())
}

/// Byte index of the `idx`-th char, or the string's end
fn byte_index(s: &str, idx: usize) -> usize {
    s.char_indices().nth(idx).map_or(s.len(), |(i, _)| i)
}

/// Plain-text document: one string plus its tomb sequence.
///
/// # Example
///
/// ```rust
/// use cowrite_core::ot::{Operation, SimpleText, TextOp};
///
/// let mut doc = SimpleText::new("abc");
/// let op = Operation::Text(vec![
///     TextOp::Skip(1),
///     TextOp::Delete(1),
///     TextOp::Skip(1),
/// ]);
/// doc.apply(&op).unwrap();
///
/// assert_eq!(doc.text(), "ac");
/// assert_eq!(doc.tombs().runs(), &[1, -1, 1]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleText {
    text: String,
    tombs: TombSequence,
}

impl SimpleText {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            tombs: TombSequence::of_live(text.chars().count()),
        }
    }

    /// The visible text
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tombs(&self) -> &TombSequence {
        &self.tombs
    }

    /// Apply one operation to the document
    pub fn apply(&mut self, op: &Operation) -> Result<()> {
        let mut pass = SimplePass {
            text: &mut self.text,
            cursor: self.tombs.cursor(),
            pos: 0,
        };
        execute(&mut pass, op)
    }
}

/// Pass over a [`SimpleText`]: `pos` is the visible char position matching
/// the tomb cursor's raw position.
struct SimplePass<'a> {
    text: &'a mut String,
    cursor: TombCursor<'a>,
    pos: usize,
}

impl MutationPass for SimplePass<'_> {
    fn insert_chars(&mut self, chars: &str) -> Result<()> {
        if self.pos > self.text.chars().count() {
            return Err(OtError::BufferDesync);
        }
        let at = byte_index(self.text, self.pos);
        self.text.insert_str(at, chars);
        let n = chars.chars().count();
        self.cursor.insert_live(n);
        self.pos += n;
        Ok(())
    }

    fn insert_tombs(&mut self, n: usize) -> Result<()> {
        self.cursor.insert_tombs(n);
        Ok(())
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        self.pos += self.cursor.skip(n)?;
        Ok(())
    }

    fn delete(&mut self, n: usize) -> Result<()> {
        let buried = self.cursor.bury(n)?;
        if self.pos + buried > self.text.chars().count() {
            return Err(OtError::BufferDesync);
        }
        let start = byte_index(self.text, self.pos);
        let end = byte_index(self.text, self.pos + buried);
        self.text.replace_range(start..end, "");
        Ok(())
    }

    fn finish(&mut self) {}
}

/// A visible position in a paragraph document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub paragraph: usize,
    pub offset: usize,
}

/// A view-level effect of one mutation pass over a [`ParagraphText`].
///
/// Indexes refer to the paragraph list at the moment the event is emitted:
/// `Deleted(i)` names a paragraph that was just removed from slot `i`, and
/// later events use the post-removal numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphEvent {
    /// A new paragraph appeared at this index
    Inserted(usize),
    /// The paragraph at this index has new content
    Changed(usize),
    /// The paragraph at this index was removed (merged into its predecessor)
    Deleted(usize),
}

/// Paragraph-structured document: newline-free paragraph strings plus one
/// tomb sequence over the whole text, newlines included.
///
/// Applying a mutation reports [`ParagraphEvent`]s so a view can redraw
/// only the paragraphs that changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParagraphText {
    paragraphs: Vec<String>,
    tombs: TombSequence,
}

impl ParagraphText {
    pub fn new(text: &str) -> Self {
        Self {
            paragraphs: text.split('\n').map(String::from).collect(),
            tombs: TombSequence::of_live(text.chars().count()),
        }
    }

    pub fn paragraphs(&self) -> &[String] {
        &self.paragraphs
    }

    pub fn tombs(&self) -> &TombSequence {
        &self.tombs
    }

    /// The full visible text, paragraphs joined by newlines
    pub fn to_text(&self) -> String {
        self.paragraphs.join("\n")
    }

    /// Apply one operation, appending view events to `events`
    pub fn apply(&mut self, op: &Operation, events: &mut Vec<ParagraphEvent>) -> Result<()> {
        let mut pass = ParagraphPass {
            paragraphs: &mut self.paragraphs,
            cursor: self.tombs.cursor(),
            parag: 0,
            offset: 0,
            modified: false,
            events,
        };
        execute(&mut pass, op)
    }

    /// Visible char index of a position within the joined text
    fn visible_index(&self, pos: Position) -> usize {
        let before: usize = self
            .paragraphs
            .iter()
            .take(pos.paragraph)
            .map(|p| p.chars().count() + 1)
            .sum();
        before + pos.offset
    }

    /// Raw op length covering everything before `pos`
    pub fn raw_prefix(&self, pos: Position) -> Result<usize> {
        let visible = self.visible_index(pos);
        self.tombs.walker().skip_visible(visible)
    }

    /// Raw op length covering everything at and after `pos`
    pub fn raw_suffix(&self, pos: Position) -> Result<usize> {
        let visible = self.visible_index(pos);
        let mut walker = self.tombs.walker();
        walker.skip_visible(visible)?;
        Ok(walker.skip_to_end())
    }

    /// Raw op length covering the visible range `from..to`
    pub fn raw_between(&self, from: Position, to: Position) -> Result<usize> {
        let start = self.visible_index(from);
        let end = self.visible_index(to);
        let mut walker = self.tombs.walker();
        walker.skip_visible(start)?;
        walker.skip_visible(end - start)
    }

    /// Build the operation that inserts `text` at `pos`
    pub fn insert_op(&self, pos: Position, text: &str) -> Result<Operation> {
        let visible = self.visible_index(pos);
        let mut walker = self.tombs.walker();
        let pre = walker.skip_visible(visible)?;
        let post = walker.skip_to_end();
        let mut ops = Vec::new();
        if pre > 0 {
            ops.push(TextOp::Skip(pre));
        }
        ops.push(TextOp::InsertChars(text.to_string()));
        if post > 0 {
            ops.push(TextOp::Skip(post));
        }
        Ok(Operation::Text(ops))
    }

    /// Build the operation that deletes the visible range `from..to`
    pub fn delete_op(&self, from: Position, to: Position) -> Result<Operation> {
        let start = self.visible_index(from);
        let end = self.visible_index(to);
        let mut walker = self.tombs.walker();
        let pre = walker.skip_visible(start)?;
        let mid = walker.skip_visible(end - start)?;
        let post = walker.skip_to_end();
        let mut ops = Vec::new();
        if pre > 0 {
            ops.push(TextOp::Skip(pre));
        }
        if mid > 0 {
            ops.push(TextOp::Delete(mid));
        }
        if post > 0 {
            ops.push(TextOp::Skip(post));
        }
        Ok(Operation::Text(ops))
    }
}

/// Pass over a [`ParagraphText`]: `(parag, offset)` is the visible position
/// matching the tomb cursor's raw position. `modified` defers the `Changed`
/// event for the current paragraph until the cursor leaves it.
struct ParagraphPass<'a> {
    paragraphs: &'a mut Vec<String>,
    cursor: TombCursor<'a>,
    parag: usize,
    offset: usize,
    modified: bool,
    events: &'a mut Vec<ParagraphEvent>,
}

impl ParagraphPass<'_> {
    fn current(&mut self) -> Result<&mut String> {
        self.paragraphs
            .get_mut(self.parag)
            .ok_or(OtError::BufferDesync)
    }

    fn current_len(&self) -> Result<usize> {
        self.paragraphs
            .get(self.parag)
            .map(|p| p.chars().count())
            .ok_or(OtError::BufferDesync)
    }

    fn flush_changed(&mut self) {
        if self.modified {
            self.events.push(ParagraphEvent::Changed(self.parag));
            self.modified = false;
        }
    }
}

impl MutationPass for ParagraphPass<'_> {
    fn insert_chars(&mut self, chars: &str) -> Result<()> {
        self.cursor.insert_live(chars.chars().count());
        for (i, segment) in chars.split('\n').enumerate() {
            if i > 0 {
                // Newline: split the current paragraph at the cursor
                let offset = self.offset;
                let current = self.current()?;
                let at = byte_index(current, offset);
                let tail = current.split_off(at);
                self.events.push(ParagraphEvent::Changed(self.parag));
                self.modified = false;
                self.paragraphs
                    .insert(self.parag + 1, format!("{segment}{tail}"));
                self.events.push(ParagraphEvent::Inserted(self.parag + 1));
                self.parag += 1;
                self.offset = segment.chars().count();
            } else if !segment.is_empty() {
                let offset = self.offset;
                if offset > self.current_len()? {
                    return Err(OtError::BufferDesync);
                }
                let current = self.current()?;
                let at = byte_index(current, offset);
                current.insert_str(at, segment);
                self.offset += segment.chars().count();
                self.modified = true;
            }
        }
        Ok(())
    }

    fn insert_tombs(&mut self, n: usize) -> Result<()> {
        self.cursor.insert_tombs(n);
        Ok(())
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        let mut chars = self.cursor.skip(n)?;
        while chars > 0 {
            let len = self.current_len()?;
            if self.offset == len {
                // Crossing a paragraph boundary consumes the newline
                self.flush_changed();
                self.parag += 1;
                self.offset = 0;
                chars -= 1;
            } else {
                let m = chars.min(len - self.offset);
                self.offset += m;
                chars -= m;
            }
        }
        Ok(())
    }

    fn delete(&mut self, n: usize) -> Result<()> {
        let mut buried = self.cursor.bury(n)?;
        while buried > 0 {
            let len = self.current_len()?;
            self.modified = true;
            if self.offset == len {
                // Deleting the newline merges the next paragraph in
                if self.parag + 1 >= self.paragraphs.len() {
                    return Err(OtError::BufferDesync);
                }
                let next = self.paragraphs.remove(self.parag + 1);
                self.paragraphs[self.parag].push_str(&next);
                self.events.push(ParagraphEvent::Deleted(self.parag + 1));
                buried -= 1;
            } else {
                let m = buried.min(len - self.offset);
                let offset = self.offset;
                let current = self.current()?;
                let start = byte_index(current, offset);
                let end = byte_index(current, offset + m);
                current.replace_range(start..end, "");
                buried -= m;
            }
        }
        Ok(())
    }

    fn finish(&mut self) {
        self.flush_changed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(ops: Vec<TextOp>) -> Operation {
        Operation::Text(ops)
    }

    #[test]
    fn test_simple_text_delete_middle() {
        let mut doc = SimpleText::new("abc");
        let op = text(vec![TextOp::Skip(1), TextOp::Delete(1), TextOp::Skip(1)]);
        doc.apply(&op).unwrap();
        assert_eq!(doc.text(), "ac");
        assert_eq!(doc.tombs().runs(), &[1, -1, 1]);
    }

    #[test]
    fn test_simple_text_insert_and_skip() {
        let mut doc = SimpleText::new("héllo");
        let op = text(vec![
            TextOp::Skip(2),
            TextOp::InsertChars("xy".into()),
            TextOp::Skip(3),
        ]);
        doc.apply(&op).unwrap();
        assert_eq!(doc.text(), "héxyllo");
        assert_eq!(doc.tombs().runs(), &[7]);
    }

    #[test]
    fn test_simple_text_skip_steps_over_tombs() {
        let mut doc = SimpleText::new("abc");
        doc.apply(&text(vec![
            TextOp::Skip(1),
            TextOp::Delete(1),
            TextOp::Skip(1),
        ]))
        .unwrap();
        // Raw positions still address the buried "b"
        doc.apply(&text(vec![
            TextOp::Skip(2),
            TextOp::InsertChars("X".into()),
            TextOp::Skip(1),
        ]))
        .unwrap();
        assert_eq!(doc.text(), "aXc");
        assert_eq!(doc.tombs().runs(), &[1, -1, 2]);
    }

    #[test]
    fn test_simple_text_insert_tombs_is_invisible() {
        let mut doc = SimpleText::new("ab");
        let op = text(vec![
            TextOp::Skip(1),
            TextOp::InsertTombs(3),
            TextOp::Skip(1),
        ]);
        doc.apply(&op).unwrap();
        assert_eq!(doc.text(), "ab");
        assert_eq!(doc.tombs().runs(), &[1, -3, 1]);
    }

    #[test]
    fn test_empty_operation_leaves_document_unchanged() {
        let mut doc = SimpleText::new("abc");
        doc.apply(&text(vec![
            TextOp::Skip(1),
            TextOp::Delete(1),
            TextOp::InsertChars("x".into()),
            TextOp::Skip(1),
        ]))
        .unwrap();
        let before = doc.clone();

        doc.apply(&Operation::empty()).unwrap();
        assert_eq!(doc, before);

        // A zero-length skip is just as much of a no-op
        doc.apply(&text(vec![TextOp::Skip(0)])).unwrap();
        assert_eq!(doc.text(), before.text());
        assert_eq!(doc.tombs().runs(), before.tombs().runs());
    }

    #[test]
    fn test_simple_text_overlong_op_fails_after_partial_apply() {
        let mut doc = SimpleText::new("ab");
        let op = text(vec![TextOp::Delete(1), TextOp::Skip(5)]);
        assert_eq!(doc.apply(&op), Err(OtError::SequenceExhausted));
        // The delete before the failing skip already landed
        assert_eq!(doc.text(), "b");
    }

    #[test]
    fn test_paragraph_text_splits_on_newlines() {
        let doc = ParagraphText::new("ab\ncd\n");
        assert_eq!(doc.paragraphs(), &["ab", "cd", ""]);
        assert_eq!(doc.tombs().runs(), &[6]);
        assert_eq!(doc.to_text(), "ab\ncd\n");
    }

    #[test]
    fn test_paragraph_insert_within_one_paragraph() {
        let mut doc = ParagraphText::new("ab\ncd");
        let mut events = Vec::new();
        let op = text(vec![
            TextOp::Skip(4),
            TextOp::InsertChars("X".into()),
            TextOp::Skip(1),
        ]);
        doc.apply(&op, &mut events).unwrap();
        assert_eq!(doc.paragraphs(), &["ab", "cXd"]);
        assert_eq!(events, vec![ParagraphEvent::Changed(1)]);
    }

    #[test]
    fn test_paragraph_insert_newline_splits_paragraph() {
        let mut doc = ParagraphText::new("abcd");
        let mut events = Vec::new();
        let op = text(vec![
            TextOp::Skip(2),
            TextOp::InsertChars("\n".into()),
            TextOp::Skip(2),
        ]);
        doc.apply(&op, &mut events).unwrap();
        assert_eq!(doc.paragraphs(), &["ab", "cd"]);
        assert_eq!(
            events,
            vec![ParagraphEvent::Changed(0), ParagraphEvent::Inserted(1)]
        );
        assert_eq!(doc.tombs().runs(), &[5]);
    }

    #[test]
    fn test_paragraph_multiline_insert() {
        let mut doc = ParagraphText::new("ab");
        let mut events = Vec::new();
        let op = text(vec![
            TextOp::Skip(1),
            TextOp::InsertChars("X\nY".into()),
            TextOp::Skip(1),
        ]);
        doc.apply(&op, &mut events).unwrap();
        assert_eq!(doc.paragraphs(), &["aX", "Yb"]);
        assert_eq!(
            events,
            vec![ParagraphEvent::Changed(0), ParagraphEvent::Inserted(1)]
        );
    }

    #[test]
    fn test_paragraph_delete_newline_merges() {
        let mut doc = ParagraphText::new("ab\ncd");
        let mut events = Vec::new();
        let op = text(vec![TextOp::Skip(2), TextOp::Delete(1), TextOp::Skip(2)]);
        doc.apply(&op, &mut events).unwrap();
        assert_eq!(doc.paragraphs(), &["abcd"]);
        assert_eq!(
            events,
            vec![ParagraphEvent::Deleted(1), ParagraphEvent::Changed(0)]
        );
        assert_eq!(doc.tombs().runs(), &[2, -1, 2]);
    }

    #[test]
    fn test_paragraph_delete_spanning_paragraphs() {
        let mut doc = ParagraphText::new("ab\ncd\nef");
        let mut events = Vec::new();
        // Delete "b\ncd\ne": one paragraph remains
        let op = text(vec![TextOp::Skip(1), TextOp::Delete(6), TextOp::Skip(1)]);
        doc.apply(&op, &mut events).unwrap();
        assert_eq!(doc.paragraphs(), &["af"]);
        assert_eq!(
            events,
            vec![
                ParagraphEvent::Deleted(1),
                ParagraphEvent::Deleted(1),
                ParagraphEvent::Changed(0)
            ]
        );
    }

    #[test]
    fn test_paragraph_changed_flushed_before_moving_on() {
        let mut doc = ParagraphText::new("ab\ncd");
        let mut events = Vec::new();
        let op = text(vec![
            TextOp::InsertChars("X".into()),
            TextOp::Skip(4),
            TextOp::InsertChars("Y".into()),
            TextOp::Skip(1),
        ]);
        doc.apply(&op, &mut events).unwrap();
        assert_eq!(doc.paragraphs(), &["Xab", "cYd"]);
        assert_eq!(
            events,
            vec![ParagraphEvent::Changed(0), ParagraphEvent::Changed(1)]
        );
    }

    #[test]
    fn test_raw_prefix_counts_buried_positions() {
        let mut doc = ParagraphText::new("ab\ncd");
        let mut events = Vec::new();
        // Bury "b": raw positions shift relative to visible ones
        doc.apply(
            &text(vec![TextOp::Skip(1), TextOp::Delete(1), TextOp::Skip(3)]),
            &mut events,
        )
        .unwrap();
        assert_eq!(doc.tombs().runs(), &[1, -1, 3]);

        let pos = Position {
            paragraph: 1,
            offset: 1,
        };
        // Visible prefix "a\nc" is 3 chars but spans 4 raw units
        assert_eq!(doc.raw_prefix(pos).unwrap(), 4);
        assert_eq!(doc.raw_suffix(pos).unwrap(), 1);
    }

    #[test]
    fn test_raw_between() {
        let mut doc = ParagraphText::new("ab\ncd");
        let mut events = Vec::new();
        doc.apply(
            &text(vec![TextOp::Skip(1), TextOp::Delete(1), TextOp::Skip(3)]),
            &mut events,
        )
        .unwrap();

        let from = Position {
            paragraph: 0,
            offset: 0,
        };
        let to = Position {
            paragraph: 1,
            offset: 0,
        };
        // "a\n" visibly, but the buried "b" sits in between
        assert_eq!(doc.raw_between(from, to).unwrap(), 3);
    }

    #[test]
    fn test_insert_op_round_trips_through_apply() {
        let mut doc = ParagraphText::new("ab\ncd");
        let mut events = Vec::new();
        doc.apply(
            &text(vec![TextOp::Skip(1), TextOp::Delete(1), TextOp::Skip(3)]),
            &mut events,
        )
        .unwrap();

        let pos = Position {
            paragraph: 1,
            offset: 1,
        };
        let op = doc.insert_op(pos, "X").unwrap();
        assert_eq!(
            op.text_ops(),
            &[
                TextOp::Skip(4),
                TextOp::InsertChars("X".into()),
                TextOp::Skip(1)
            ]
        );

        let mut events = Vec::new();
        doc.apply(&op, &mut events).unwrap();
        assert_eq!(doc.paragraphs(), &["a", "cXd"]);
    }

    #[test]
    fn test_delete_op_covers_buried_gap() {
        let mut doc = ParagraphText::new("ab\ncd");
        let mut events = Vec::new();
        doc.apply(
            &text(vec![TextOp::Skip(1), TextOp::Delete(1), TextOp::Skip(3)]),
            &mut events,
        )
        .unwrap();

        // Delete visible "a\nc" (which straddles the buried "b")
        let from = Position {
            paragraph: 0,
            offset: 0,
        };
        let to = Position {
            paragraph: 1,
            offset: 1,
        };
        let op = doc.delete_op(from, to).unwrap();
        assert_eq!(op.text_ops(), &[TextOp::Delete(4), TextOp::Skip(1)]);

        let mut events = Vec::new();
        doc.apply(&op, &mut events).unwrap();
        assert_eq!(doc.paragraphs(), &["d"]);
    }

    #[test]
    fn test_position_queries_work_through_shared_references() {
        let mut doc = ParagraphText::new("ab\ncd");
        let mut events = Vec::new();
        doc.apply(
            &text(vec![TextOp::Skip(1), TextOp::Delete(1), TextOp::Skip(3)]),
            &mut events,
        )
        .unwrap();

        let shared: &ParagraphText = &doc;
        let pos = Position {
            paragraph: 1,
            offset: 1,
        };
        assert_eq!(shared.raw_prefix(pos).unwrap(), 4);
        assert_eq!(shared.raw_suffix(pos).unwrap(), 1);
        let op = shared.insert_op(pos, "X").unwrap();
        assert_eq!(
            op.text_ops(),
            &[
                TextOp::Skip(4),
                TextOp::InsertChars("X".into()),
                TextOp::Skip(1)
            ]
        );
    }

    #[test]
    fn test_insert_op_into_empty_document() {
        let doc = ParagraphText::new("");
        let pos = Position {
            paragraph: 0,
            offset: 0,
        };
        let op = doc.insert_op(pos, "hi").unwrap();
        assert_eq!(op.text_ops(), &[TextOp::InsertChars("hi".into())]);
    }
}
