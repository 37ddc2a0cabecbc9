//! # Blocks
//!
//! A block is one paragraph, heading, quote, list item or code line.
//! All offsets are measured in Unicode scalar values (`char`s), never bytes.

use serde::{Deserialize, Serialize};

/// Stable block identifier
pub type BlockKey = String;

/// Block types; draft-style names such as `header-one` are accepted on input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlockType {
    #[default]
    #[serde(rename = "plain", alias = "unstyled")]
    Plain,
    #[serde(rename = "heading-1", alias = "header-one")]
    HeadingOne,
    #[serde(rename = "heading-2", alias = "header-two")]
    HeadingTwo,
    #[serde(rename = "heading-3", alias = "header-three")]
    HeadingThree,
    #[serde(rename = "heading-4", alias = "header-four")]
    HeadingFour,
    #[serde(rename = "heading-5", alias = "header-five")]
    HeadingFive,
    #[serde(rename = "heading-6", alias = "header-six")]
    HeadingSix,
    #[serde(rename = "quote", alias = "blockquote")]
    Quote,
    #[serde(rename = "unordered-list-item")]
    UnorderedListItem,
    #[serde(rename = "ordered-list-item")]
    OrderedListItem,
    #[serde(rename = "code", alias = "code-block")]
    Code,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InlineStyle {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
}

/// Half-open `[start, end)` range carrying one inline style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleRange {
    pub start: usize,
    pub end: usize,
    pub style: InlineStyle,
}

impl StyleRange {
    pub fn new(start: usize, end: usize, style: InlineStyle) -> Self {
        Self { start, end, style }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub key: BlockKey,

    #[serde(rename = "type")]
    pub block_type: BlockType,

    pub text: String,

    #[serde(default)]
    pub styles: Vec<StyleRange>,
}

impl Block {
    /// Create an empty plain block
    pub fn new(key: impl Into<BlockKey>) -> Self {
        Self::with_text(key, "")
    }

    pub fn with_text(key: impl Into<BlockKey>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            block_type: BlockType::Plain,
            text: text.into(),
            styles: Vec::new(),
        }
    }

    pub fn of_type(mut self, block_type: BlockType) -> Self {
        self.block_type = block_type;
        self
    }

    /// Length in chars
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Chars of the text as a vector, for backward scans
    pub fn chars(&self) -> Vec<char> {
        self.text.chars().collect()
    }

    /// Styles covering the char at `offset`
    pub fn styles_at(&self, offset: usize) -> Vec<InlineStyle> {
        self.styles
            .iter()
            .filter(|r| r.start <= offset && offset < r.end)
            .map(|r| r.style)
            .collect()
    }

    pub(crate) fn insert_text(&mut self, at: usize, text: &str) {
        let inserted = text.chars().count();
        if inserted == 0 {
            return;
        }

        let byte = byte_offset(&self.text, at);
        self.text.insert_str(byte, text);

        for range in &mut self.styles {
            if range.start >= at {
                range.start += inserted;
            }
            if range.end > at {
                range.end += inserted;
            }
        }
    }

    pub(crate) fn remove_range(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }

        let from = byte_offset(&self.text, start);
        let to = byte_offset(&self.text, end);
        self.text.replace_range(from..to, "");

        let removed = end - start;
        let shift = |x: usize| {
            if x <= start {
                x
            } else if x >= end {
                x - removed
            } else {
                start
            }
        };
        for range in &mut self.styles {
            range.start = shift(range.start);
            range.end = shift(range.end);
        }
        self.normalize_styles();
    }

    /// Cut the block at `at`, returning the tail as a new block under `key`
    pub(crate) fn split_off(&mut self, at: usize, key: BlockKey) -> Block {
        let byte = byte_offset(&self.text, at);
        let tail_text = self.text.split_off(byte);

        let mut head = Vec::new();
        let mut tail = Vec::new();
        for range in self.styles.drain(..) {
            if range.end <= at {
                head.push(range);
            } else if range.start >= at {
                tail.push(StyleRange::new(range.start - at, range.end - at, range.style));
            } else {
                head.push(StyleRange::new(range.start, at, range.style));
                tail.push(StyleRange::new(0, range.end - at, range.style));
            }
        }
        self.styles = head;
        self.normalize_styles();

        let mut block = Block {
            key,
            block_type: self.block_type,
            text: tail_text,
            styles: tail,
        };
        block.normalize_styles();
        block
    }

    /// Join `other` onto the end of this block. The key and type of `self` win.
    pub(crate) fn append(&mut self, other: Block) {
        let shift = self.len();
        self.text.push_str(&other.text);
        self.styles.extend(
            other
                .styles
                .into_iter()
                .map(|r| StyleRange::new(r.start + shift, r.end + shift, r.style)),
        );
        self.normalize_styles();
    }

    pub(crate) fn add_style(&mut self, start: usize, end: usize, style: InlineStyle) {
        if start >= end {
            return;
        }
        self.styles.push(StyleRange::new(start, end, style));
        self.normalize_styles();
    }

    pub(crate) fn clear(&mut self) {
        self.text.clear();
        self.styles.clear();
    }

    /// Drop empty ranges and coalesce overlapping or touching same-style ranges
    pub(crate) fn normalize_styles(&mut self) {
        self.styles.retain(|r| !r.is_empty());
        self.styles
            .sort_by(|a, b| (a.style, a.start, a.end).cmp(&(b.style, b.start, b.end)));

        let mut merged: Vec<StyleRange> = Vec::with_capacity(self.styles.len());
        for range in self.styles.drain(..) {
            match merged.last_mut() {
                Some(last) if last.style == range.style && range.start <= last.end => {
                    last.end = last.end.max(range.end);
                }
                _ => merged.push(range),
            }
        }
        merged.sort_by(|a, b| (a.start, a.end, a.style).cmp(&(b.start, b.end, b.style)));
        self.styles = merged;
    }
}

/// Byte index of the `chars`-th char, or the text length past the end
pub(crate) fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}
