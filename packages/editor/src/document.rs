//! # Content Model
//!
//! The ordered, non-empty sequence of blocks the editing surface renders.
//!
//! Every mutation goes through [`Document::apply`], whether it was captured
//! locally or received from a remote peer, so both paths share one
//! implementation. Each `apply_*` validates before touching anything: an error
//! leaves the document exactly as it was.
//!
//! ## Multi-block deletes
//!
//! A highlighted range over several blocks is sent as one delete per block:
//!
//! ```text
//! delete{first, start, TO_END}     truncate the first block
//! delete{mid, WHOLE_BLOCK, len}    remove each interior block
//! delete{last, 0, end}             drop the head of the last block and
//!                                  join its remainder onto `first`
//! ```
//!
//! The document remembers which block the `TO_END` delete truncated; the next
//! delete at position 0 of the block immediately after it performs the join.
//! Any non-delete operation forgets it.

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::block::{Block, BlockKey, BlockType, InlineStyle};
use crate::errors::ModelError;
use crate::operations::{Operation, TO_END, WHOLE_BLOCK};

const KEY_LENGTH: usize = 5;

#[derive(Debug, Clone)]
pub struct Document {
    blocks: Vec<Block>,

    /// Incremented on every applied operation
    version: u64,

    /// Block truncated by the last `TO_END` delete, awaiting its join
    open_range: Option<BlockKey>,
}

impl Document {
    /// Single empty plain block with a fresh key
    pub fn new() -> Self {
        Self::with_block(Block::new(random_key()))
    }

    pub fn with_block(block: Block) -> Self {
        Self {
            blocks: vec![block],
            version: 0,
            open_range: None,
        }
    }

    /// Build a document from loaded blocks, checking keys and style ranges
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, ModelError> {
        if blocks.is_empty() {
            return Ok(Self::new());
        }

        let mut seen = std::collections::HashSet::new();
        let mut blocks = blocks;
        for block in &mut blocks {
            if !seen.insert(block.key.clone()) {
                return Err(ModelError::DuplicateKey(block.key.clone()));
            }
            let len = block.len();
            if let Some(bad) = block.styles.iter().find(|r| r.start > r.end || r.end > len) {
                return Err(ModelError::InvalidContent(format!(
                    "style range {}..{} exceeds block {} of length {}",
                    bad.start, bad.end, block.key, len
                )));
            }
            block.normalize_styles();
        }

        Ok(Self {
            blocks,
            version: 0,
            open_range: None,
        })
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn block(&self, key: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.key == key)
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.blocks.iter().position(|b| b.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index_of(key).is_some()
    }

    pub fn first_block(&self) -> &Block {
        &self.blocks[0]
    }

    pub fn last_block(&self) -> &Block {
        &self.blocks[self.blocks.len() - 1]
    }

    /// Block before `key` in document order
    pub fn block_before(&self, key: &str) -> Option<&Block> {
        match self.index_of(key) {
            Some(i) if i > 0 => self.blocks.get(i - 1),
            _ => None,
        }
    }

    /// Block after `key` in document order
    pub fn block_after(&self, key: &str) -> Option<&Block> {
        self.index_of(key).and_then(|i| self.blocks.get(i + 1))
    }

    /// Text of all blocks joined by newlines
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Generate a block key not used by any block in this document
    pub fn generate_key(&self) -> BlockKey {
        loop {
            let key = random_key();
            if !self.contains(&key) {
                return key;
            }
        }
    }

    /// Apply one operation
    pub fn apply(&mut self, op: &Operation) -> Result<(), ModelError> {
        if !op.is_delete() {
            self.open_range = None;
        }

        match op {
            Operation::Insert {
                block,
                position,
                text,
            } => self.apply_insert(block, *position, text),

            Operation::Delete {
                block,
                position,
                offset,
            } => self.apply_delete(block, *position, *offset),

            Operation::SplitBlock {
                block,
                new_block,
                position,
            } => self.apply_split(block, new_block, *position),

            Operation::SetBlockType {
                block,
                new_block_type,
            } => self.apply_set_block_type(block, *new_block_type),

            Operation::SetInlineStyle {
                block,
                position,
                offset,
                style,
            } => self.apply_set_inline_style(block, *position, *offset, *style),
        }?;

        self.version += 1;
        Ok(())
    }

    pub fn apply_insert(&mut self, key: &str, position: usize, text: &str) -> Result<(), ModelError> {
        let index = self.require(key)?;
        let block = &mut self.blocks[index];
        check_offset(block, position as i64)?;

        block.insert_text(position, text);
        Ok(())
    }

    pub fn apply_delete(&mut self, key: &str, position: i64, offset: i64) -> Result<(), ModelError> {
        let index = self.require(key)?;

        if position == WHOLE_BLOCK {
            return self.remove_block(index);
        }

        let len = self.blocks[index].len();
        check_offset(&self.blocks[index], position)?;
        let position = position as usize;

        if offset == TO_END {
            self.blocks[index].remove_range(position, len);
            self.open_range = Some(key.to_string());
            return Ok(());
        }
        if offset < 0 {
            return Err(out_of_range(&self.blocks[index], offset));
        }
        let offset = offset as usize;

        // Closing delete of a multi-block range
        if position == 0 && self.closes_open_range(index) {
            if offset > len {
                return Err(out_of_range(&self.blocks[index], offset as i64));
            }
            self.open_range = None;
            let mut last = self.blocks.remove(index);
            last.remove_range(0, offset);
            self.blocks[index - 1].append(last);
            return Ok(());
        }
        self.open_range = None;

        if offset > self.deletable_from(index, position) {
            return Err(out_of_range(&self.blocks[index], (position + offset) as i64));
        }

        self.delete_across(index, position, offset);
        Ok(())
    }

    pub fn apply_split(&mut self, key: &str, new_key: &str, position: usize) -> Result<(), ModelError> {
        let index = self.require(key)?;
        if self.contains(new_key) {
            return Err(ModelError::DuplicateKey(new_key.to_string()));
        }
        check_offset(&self.blocks[index], position as i64)?;

        let tail = self.blocks[index].split_off(position, new_key.to_string());
        self.blocks.insert(index + 1, tail);
        Ok(())
    }

    pub fn apply_set_block_type(&mut self, key: &str, block_type: BlockType) -> Result<(), ModelError> {
        let index = self.require(key)?;
        self.blocks[index].block_type = block_type;
        Ok(())
    }

    pub fn apply_set_inline_style(
        &mut self,
        key: &str,
        position: usize,
        offset: i64,
        style: InlineStyle,
    ) -> Result<(), ModelError> {
        let index = self.require(key)?;
        let block = &mut self.blocks[index];
        let len = block.len();

        check_offset(block, position as i64)?;
        let end = if offset == TO_END {
            len
        } else {
            check_offset(block, offset)?;
            offset as usize
        };
        if end < position {
            return Err(out_of_range(block, offset));
        }

        block.add_style(position, end, style);
        Ok(())
    }

    /// Chars a delete at `position` of the block at `index` may remove. A
    /// delete closing a multi-block range stays inside its own block.
    pub(crate) fn delete_limit(&self, index: usize, position: usize) -> usize {
        if position == 0 && self.closes_open_range(index) {
            self.blocks[index].len()
        } else {
            self.deletable_from(index, position)
        }
    }

    /// Forget the block truncated by the last "to end" delete
    pub(crate) fn clear_open_range(&mut self) {
        self.open_range = None;
    }

    fn closes_open_range(&self, index: usize) -> bool {
        index > 0 && self.open_range.as_deref() == Some(self.blocks[index - 1].key.as_str())
    }

    /// Chars a delete starting at `position` can consume: the rest of this
    /// block plus, for each following block, its boundary and its text.
    pub(crate) fn deletable_from(&self, index: usize, position: usize) -> usize {
        let here = self.blocks[index].len().saturating_sub(position);
        here + self.blocks[index + 1..]
            .iter()
            .map(|b| b.len() + 1)
            .sum::<usize>()
    }

    fn delete_across(&mut self, index: usize, position: usize, offset: usize) {
        let mut remaining = offset;

        let len = self.blocks[index].len();
        let here = remaining.min(len - position);
        self.blocks[index].remove_range(position, position + here);
        remaining -= here;

        while remaining > 0 {
            // Crossing the boundary joins the next block
            let next = self.blocks.remove(index + 1);
            self.blocks[index].append(next);
            remaining -= 1;

            let available = self.blocks[index].len() - position;
            let take = remaining.min(available);
            self.blocks[index].remove_range(position, position + take);
            remaining -= take;
        }
    }

    fn remove_block(&mut self, index: usize) -> Result<(), ModelError> {
        if self.blocks.len() == 1 {
            self.blocks[0].clear();
        } else {
            self.blocks.remove(index);
        }
        Ok(())
    }

    fn require(&self, key: &str) -> Result<usize, ModelError> {
        self.index_of(key)
            .ok_or_else(|| ModelError::UnknownBlock(key.to_string()))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

fn check_offset(block: &Block, value: i64) -> Result<(), ModelError> {
    if value < 0 || value as usize > block.len() {
        Err(out_of_range(block, value))
    } else {
        Ok(())
    }
}

fn out_of_range(block: &Block, value: i64) -> ModelError {
    ModelError::OutOfRange {
        block: block.key.clone(),
        value,
        len: block.len(),
    }
}

fn random_key() -> BlockKey {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(KEY_LENGTH)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}
