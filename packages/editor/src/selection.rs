//! # Selection Tracking
//!
//! Anchor is where the selection gesture started, focus is where it currently
//! ends. `is_backward` is true when the focus precedes the anchor in document
//! order. A collapsed selection is a cursor.

use serde::{Deserialize, Serialize};

use crate::block::BlockKey;
use crate::document::Document;

/// A point in the document: block plus char offset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub key: BlockKey,
    pub offset: usize,
}

impl Position {
    pub fn new(key: impl Into<BlockKey>, offset: usize) -> Self {
        Self {
            key: key.into(),
            offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub anchor_key: BlockKey,
    pub anchor_offset: usize,
    pub focus_key: BlockKey,
    pub focus_offset: usize,
    pub is_backward: bool,
}

impl Selection {
    /// Cursor at `offset` in `key`
    pub fn collapsed(key: impl Into<BlockKey>, offset: usize) -> Self {
        let key = key.into();
        Self {
            anchor_key: key.clone(),
            anchor_offset: offset,
            focus_key: key,
            focus_offset: offset,
            is_backward: false,
        }
    }

    /// Selection from `anchor` to `focus`, with direction taken from document order
    pub fn between(anchor: Position, focus: Position, doc: &Document) -> Self {
        let is_backward = order(doc, &focus) < order(doc, &anchor);
        Self {
            anchor_key: anchor.key,
            anchor_offset: anchor.offset,
            focus_key: focus.key,
            focus_offset: focus.offset,
            is_backward,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor_key == self.focus_key && self.anchor_offset == self.focus_offset
    }

    pub fn anchor(&self) -> Position {
        Position::new(self.anchor_key.clone(), self.anchor_offset)
    }

    pub fn focus(&self) -> Position {
        Position::new(self.focus_key.clone(), self.focus_offset)
    }

    /// Endpoints in document order, `(start, end)`
    pub fn ordered(&self, doc: &Document) -> (Position, Position) {
        let anchor = self.anchor();
        let focus = self.focus();
        if order(doc, &focus) < order(doc, &anchor) {
            (focus, anchor)
        } else {
            (anchor, focus)
        }
    }
}

/// Sort key of a position in document order; unknown blocks sort last
fn order(doc: &Document, position: &Position) -> (usize, usize) {
    (
        doc.index_of(&position.key).unwrap_or(usize::MAX),
        position.offset,
    )
}

/// Tracks the local selection over the content model
#[derive(Debug, Clone)]
pub struct SelectionTracker {
    current: Selection,
}

impl SelectionTracker {
    pub fn new(selection: Selection) -> Self {
        Self { current: selection }
    }

    /// Cursor at the end of the document
    pub fn at_end(doc: &Document) -> Self {
        let last = doc.last_block();
        Self::new(Selection::collapsed(last.key.clone(), last.len()))
    }

    pub fn current_selection(&self) -> &Selection {
        &self.current
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.current = selection;
    }

    /// Collapse to a cursor at `position`
    pub fn collapse_to(&mut self, position: Position) {
        self.current = Selection::collapsed(position.key, position.offset);
    }

    /// Keys from the earlier endpoint to the later one, inclusive, in document
    /// order. Direction of the selection does not matter.
    pub fn key_range(&self, doc: &Document) -> Vec<BlockKey> {
        let selection = self.resolve(doc);
        let anchor = doc.index_of(&selection.anchor_key).unwrap_or(0);
        let focus = doc.index_of(&selection.focus_key).unwrap_or(0);
        let (from, to) = (anchor.min(focus), anchor.max(focus));

        doc.blocks()[from..=to]
            .iter()
            .map(|b| b.key.clone())
            .collect()
    }

    /// The current selection clamped onto `doc`.
    ///
    /// Remote edits never move the local cursor, so the stored selection can
    /// name a block that was merged away or an offset past a shortened block.
    /// Unknown blocks resolve to the end of the document.
    pub fn resolve(&self, doc: &Document) -> Selection {
        let anchor = clamp(doc, self.current.anchor());
        let focus = clamp(doc, self.current.focus());
        Selection::between(anchor, focus, doc)
    }
}

fn clamp(doc: &Document, position: Position) -> Position {
    match doc.block(&position.key) {
        Some(block) => Position::new(position.key, position.offset.min(block.len())),
        None => {
            let last = doc.last_block();
            Position::new(last.key.clone(), last.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;

    fn doc() -> Document {
        Document::from_blocks(vec![
            Block::with_text("a", "one"),
            Block::with_text("b", "two"),
            Block::with_text("c", "three"),
            Block::with_text("d", "four"),
        ])
        .unwrap()
    }

    #[test]
    fn test_key_range_backward_is_document_order() {
        let doc = doc();
        let selection = Selection::between(Position::new("d", 2), Position::new("b", 1), &doc);
        assert!(selection.is_backward);

        let tracker = SelectionTracker::new(selection);
        assert_eq!(tracker.key_range(&doc), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_key_range_collapsed_is_single_block() {
        let doc = doc();
        let tracker = SelectionTracker::new(Selection::collapsed("c", 1));
        assert_eq!(tracker.key_range(&doc), vec!["c"]);
    }

    #[test]
    fn test_ordered_normalizes_same_block_backward() {
        let doc = doc();
        let selection = Selection::between(Position::new("c", 4), Position::new("c", 1), &doc);
        assert!(selection.is_backward);

        let (start, end) = selection.ordered(&doc);
        assert_eq!(start, Position::new("c", 1));
        assert_eq!(end, Position::new("c", 4));
    }

    #[test]
    fn test_resolve_clamps_stale_positions() {
        let doc = doc();
        let tracker = SelectionTracker::new(Selection {
            anchor_key: "a".to_string(),
            anchor_offset: 40,
            focus_key: "gone".to_string(),
            focus_offset: 1,
            is_backward: false,
        });

        let resolved = tracker.resolve(&doc);
        assert_eq!(resolved.anchor(), Position::new("a", 3));
        assert_eq!(resolved.focus(), Position::new("d", 4));
    }

    #[test]
    fn test_selection_wire_shape() {
        let json = serde_json::to_value(Selection::collapsed("a", 2)).unwrap();
        assert_eq!(json["anchorKey"], "a");
        assert_eq!(json["focusOffset"], 2);
        assert_eq!(json["isBackward"], false);
    }
}
