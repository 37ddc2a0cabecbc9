//! # Operations
//!
//! Minimal, typed descriptions of a single content mutation. Operations are the
//! only unit of synchronization: local edits are captured as operations and
//! remote peers replay the exact same operations against their own copy.
//!
//! ## Sentinels
//!
//! Two offsets are signed on the wire so they can carry `-1`:
//!
//! - `Delete.position == WHOLE_BLOCK`: remove the whole block
//! - `Delete.offset == TO_END` / `SetInlineStyle.offset == TO_END`: to end of block
//!
//! A delete that runs past the end of its block consumes the block boundary and
//! joins the following block, so `delete{prev, len(prev), 1}` is "merge with next".

use serde::{Deserialize, Serialize};

use crate::block::{BlockKey, BlockType, InlineStyle};

/// `offset` sentinel: through the end of the block
pub const TO_END: i64 = -1;

/// `position` sentinel for deletes: the entire block is merged away
pub const WHOLE_BLOCK: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Operation {
    /// Insert `text` at `position` in `block`
    Insert {
        block: BlockKey,
        position: usize,
        text: String,
    },

    /// Remove `offset` chars starting at `position` in `block`
    Delete {
        block: BlockKey,
        position: i64,
        offset: i64,
    },

    /// Move the tail of `block` from `position` into `new_block`, placed right after it
    SplitBlock {
        block: BlockKey,
        #[serde(rename = "newBlock")]
        new_block: BlockKey,
        position: usize,
    },

    SetBlockType {
        block: BlockKey,
        #[serde(rename = "newBlockType")]
        new_block_type: BlockType,
    },

    /// Apply `style` to `[position, offset)`; `offset == TO_END` styles to end of block
    SetInlineStyle {
        block: BlockKey,
        position: usize,
        offset: i64,
        style: InlineStyle,
    },
}

impl Operation {
    pub fn insert(block: impl Into<BlockKey>, position: usize, text: impl Into<String>) -> Self {
        Operation::Insert {
            block: block.into(),
            position,
            text: text.into(),
        }
    }

    pub fn delete(block: impl Into<BlockKey>, position: i64, offset: i64) -> Self {
        Operation::Delete {
            block: block.into(),
            position,
            offset,
        }
    }

    /// Block the operation targets
    pub fn block(&self) -> &str {
        match self {
            Operation::Insert { block, .. }
            | Operation::Delete { block, .. }
            | Operation::SplitBlock { block, .. }
            | Operation::SetBlockType { block, .. }
            | Operation::SetInlineStyle { block, .. } => block,
        }
    }

    /// Debug name matching the wire `type`
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Insert { .. } => "insert",
            Operation::Delete { .. } => "delete",
            Operation::SplitBlock { .. } => "split-block",
            Operation::SetBlockType { .. } => "set-block-type",
            Operation::SetInlineStyle { .. } => "set-inline-style",
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Operation::Delete { .. })
    }
}
