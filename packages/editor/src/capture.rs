//! # Edit Capture
//!
//! Turns input events into minimal operations. One transition per event, no
//! buffering between events.
//!
//! Each handler reads the current selection and document, computes the
//! operations, then commits them through the same `Document::apply` path remote
//! batches use. The selection is left on the post-edit cursor.
//!
//! ## Highlighted ranges
//!
//! Within one block a highlighted range is a single delete. Across blocks it is
//! one delete per block of the key range, in document order:
//!
//! ```text
//! first     delete{first, start, TO_END}
//! interior  delete{key, WHOLE_BLOCK, len}
//! last      delete{last, 0, end}
//! ```

use tracing::debug;

use crate::block::{BlockType, InlineStyle};
use crate::errors::EditorError;
use crate::operations::{Operation, TO_END, WHOLE_BLOCK};
use crate::selection::{Position, Selection};
use crate::session::EditSession;

/// Characters that end a word for word-wise deletion, besides whitespace
const WORD_BREAKS: &[char] = &[
    '.', ',', ';', ':', '!', '?', '\'', '"', '`', '(', ')', '[', ']', '{', '}', '<', '>', '-',
    '_', '/', '\\', '|', '@', '#', '$', '%', '^', '&', '*', '+', '=', '~', '\u{2014}', '\u{2013}',
    '\u{2026}', '\u{201c}', '\u{201d}', '\u{2018}', '\u{2019}',
];

/// Raw input events from the editing surface
#[derive(Debug, Clone, PartialEq)]
pub enum EditEvent {
    InsertChar(char),
    /// Pasted text; line breaks split blocks
    InsertText(String),
    Backspace,
    BackspaceWord,
    DeleteForward,
    /// Enter
    Split,
    SetBlockType(BlockType),
    SetInlineStyle(InlineStyle),
    MoveCursor(Selection),
}

impl EditEvent {
    /// Whether the event changes content
    pub fn is_edit(&self) -> bool {
        !matches!(self, EditEvent::MoveCursor(_))
    }
}

/// What one event produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditOutcome {
    /// Operations applied and queued, in order
    pub operations: Vec<Operation>,

    /// Pending operations should be sent now rather than on the next tick
    pub flush_requested: bool,
}

impl EditOutcome {
    fn edited(operations: Vec<Operation>) -> Self {
        Self {
            operations,
            flush_requested: false,
        }
    }
}

pub fn is_word_break(c: char) -> bool {
    c.is_whitespace() || WORD_BREAKS.contains(&c)
}

/// Chars a word-wise backspace removes from the end of `before`: any run of
/// break characters right before the cursor, then the word ahead of it.
pub fn word_delete_length(before: &[char]) -> usize {
    let mut i = before.len();
    while i > 0 && is_word_break(before[i - 1]) {
        i -= 1;
    }
    while i > 0 && !is_word_break(before[i - 1]) {
        i -= 1;
    }
    before.len() - i
}

impl EditSession {
    /// Handle one input event
    pub fn handle(&mut self, event: EditEvent) -> Result<EditOutcome, EditorError> {
        if event.is_edit() && self.is_read_only() {
            return Err(EditorError::ReadOnly);
        }

        let outcome = match event {
            EditEvent::InsertChar(ch) => EditOutcome::edited(self.insert(&ch.to_string())?),
            EditEvent::InsertText(text) => {
                EditOutcome::edited(self.insert(&text.replace("\r\n", "\n"))?)
            }
            EditEvent::Backspace => EditOutcome::edited(self.backspace(false)?),
            EditEvent::BackspaceWord => EditOutcome::edited(self.backspace(true)?),
            EditEvent::DeleteForward => EditOutcome::edited(self.delete_forward()?),
            EditEvent::Split => EditOutcome::edited(self.split()?),
            EditEvent::SetBlockType(block_type) => {
                EditOutcome::edited(self.set_block_type(block_type)?)
            }
            EditEvent::SetInlineStyle(style) => EditOutcome::edited(self.set_inline_style(style)?),
            EditEvent::MoveCursor(selection) => {
                self.move_cursor(selection);
                EditOutcome {
                    operations: Vec::new(),
                    flush_requested: true,
                }
            }
        };

        debug!(
            "Captured {} operation(s), {} pending",
            outcome.operations.len(),
            self.pending_count()
        );
        Ok(outcome)
    }

    fn current(&self) -> Selection {
        self.selection.resolve(&self.document)
    }

    fn insert(&mut self, text: &str) -> Result<Vec<Operation>, EditorError> {
        let mut emitted = Vec::new();

        let selection = self.current();
        if !selection.is_collapsed() {
            emitted.extend(self.delete_highlighted(&selection)?);
        }

        let mut cursor = self.current().focus();
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                let new_key = self.document.generate_key();
                emitted.extend(self.commit(vec![Operation::SplitBlock {
                    block: cursor.key.clone(),
                    new_block: new_key.clone(),
                    position: cursor.offset,
                }])?);
                cursor = Position::new(new_key, 0);
            }
            if !line.is_empty() {
                emitted.extend(self.commit(vec![Operation::insert(
                    cursor.key.clone(),
                    cursor.offset,
                    line,
                )])?);
                cursor.offset += line.chars().count();
            }
        }

        self.selection.collapse_to(cursor);
        Ok(emitted)
    }

    fn backspace(&mut self, word: bool) -> Result<Vec<Operation>, EditorError> {
        let selection = self.current();
        if !selection.is_collapsed() {
            return self.delete_highlighted(&selection);
        }

        let Position { key, offset } = selection.focus();
        if offset == 0 {
            // Start of the document: nothing to merge with
            let Some(previous) = self.document.block_before(&key) else {
                return Ok(Vec::new());
            };
            let join = Position::new(previous.key.clone(), previous.len());
            let ops = self.commit(vec![Operation::delete(
                join.key.clone(),
                join.offset as i64,
                1,
            )])?;
            self.selection.collapse_to(join);
            return Ok(ops);
        }

        let length = match (word, self.document.block(&key)) {
            (true, Some(block)) => word_delete_length(&block.chars()[..offset]),
            _ => 1,
        };
        let start = offset - length;
        let ops = self.commit(vec![Operation::delete(
            key.clone(),
            start as i64,
            length as i64,
        )])?;
        self.selection.collapse_to(Position::new(key, start));
        Ok(ops)
    }

    fn delete_forward(&mut self) -> Result<Vec<Operation>, EditorError> {
        let selection = self.current();
        if !selection.is_collapsed() {
            return self.delete_highlighted(&selection);
        }

        let cursor = selection.focus();
        let len = self
            .document
            .block(&cursor.key)
            .map(|b| b.len())
            .unwrap_or_default();
        let has_next = self.document.block_after(&cursor.key).is_some();

        if cursor.offset >= len && !has_next {
            return Ok(Vec::new());
        }

        let ops = self.commit(vec![Operation::delete(
            cursor.key.clone(),
            cursor.offset as i64,
            1,
        )])?;
        self.selection.collapse_to(cursor);
        Ok(ops)
    }

    fn split(&mut self) -> Result<Vec<Operation>, EditorError> {
        let mut emitted = Vec::new();

        let selection = self.current();
        if !selection.is_collapsed() {
            emitted.extend(self.delete_highlighted(&selection)?);
        }

        let cursor = self.current().focus();
        let new_key = self.document.generate_key();
        emitted.extend(self.commit(vec![Operation::SplitBlock {
            block: cursor.key,
            new_block: new_key.clone(),
            position: cursor.offset,
        }])?);

        self.selection.collapse_to(Position::new(new_key, 0));
        Ok(emitted)
    }

    fn set_block_type(&mut self, block_type: BlockType) -> Result<Vec<Operation>, EditorError> {
        let ops = self
            .selection
            .key_range(&self.document)
            .into_iter()
            .map(|block| Operation::SetBlockType {
                block,
                new_block_type: block_type,
            })
            .collect();
        self.commit(ops)
    }

    fn set_inline_style(&mut self, style: InlineStyle) -> Result<Vec<Operation>, EditorError> {
        let selection = self.current();
        if selection.is_collapsed() {
            return Ok(Vec::new());
        }

        let (start, end) = selection.ordered(&self.document);
        let ops = self
            .selection
            .key_range(&self.document)
            .into_iter()
            .map(|block| {
                let position = if block == start.key { start.offset } else { 0 };
                let offset = if block == end.key {
                    end.offset as i64
                } else {
                    TO_END
                };
                Operation::SetInlineStyle {
                    block,
                    position,
                    offset,
                    style,
                }
            })
            .collect();

        let ops = self.commit(ops)?;
        self.selection.set_selection(selection);
        Ok(ops)
    }

    fn move_cursor(&mut self, selection: Selection) {
        self.selection.set_selection(selection);
        let resolved = self.current();
        self.selection.set_selection(resolved);
    }

    /// Delete the highlighted range and collapse the cursor to its start
    fn delete_highlighted(&mut self, selection: &Selection) -> Result<Vec<Operation>, EditorError> {
        let (start, end) = selection.ordered(&self.document);

        let ops = if start.key == end.key {
            vec![Operation::delete(
                start.key.clone(),
                start.offset as i64,
                (end.offset - start.offset) as i64,
            )]
        } else {
            let keys = self.selection.key_range(&self.document);
            let last = keys.len() - 1;
            keys.into_iter()
                .enumerate()
                .map(|(i, key)| {
                    if i == 0 {
                        Operation::delete(key, start.offset as i64, TO_END)
                    } else if i == last {
                        Operation::delete(key, 0, end.offset as i64)
                    } else {
                        let len = self.document.block(&key).map(|b| b.len()).unwrap_or(0);
                        Operation::delete(key, WHOLE_BLOCK, len as i64)
                    }
                })
                .collect()
        };

        let ops = self.commit(ops)?;
        self.selection.collapse_to(start);
        Ok(ops)
    }
}
