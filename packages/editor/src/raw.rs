//! Raw content format used by the document service for initial loads.
//!
//! Inline styles are stored as `{offset, length, style}` rather than the
//! `{start, end}` ranges the content model works with.

use serde::{Deserialize, Serialize};

use crate::block::{Block, BlockKey, BlockType, InlineStyle, StyleRange};
use crate::document::Document;
use crate::errors::ModelError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawContent {
    #[serde(default)]
    pub blocks: Vec<RawBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBlock {
    pub key: BlockKey,

    #[serde(rename = "type", default)]
    pub block_type: BlockType,

    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub inline_style_ranges: Vec<RawStyleRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStyleRange {
    pub offset: usize,
    pub length: usize,
    pub style: InlineStyle,
}

impl From<&Document> for RawContent {
    fn from(doc: &Document) -> Self {
        let blocks = doc
            .blocks()
            .iter()
            .map(|block| RawBlock {
                key: block.key.clone(),
                block_type: block.block_type,
                text: block.text.clone(),
                inline_style_ranges: block
                    .styles
                    .iter()
                    .map(|r| RawStyleRange {
                        offset: r.start,
                        length: r.end - r.start,
                        style: r.style,
                    })
                    .collect(),
            })
            .collect();
        RawContent { blocks }
    }
}

impl TryFrom<RawContent> for Document {
    type Error = ModelError;

    fn try_from(raw: RawContent) -> Result<Self, Self::Error> {
        let blocks = raw
            .blocks
            .into_iter()
            .map(|raw| Block {
                key: raw.key,
                block_type: raw.block_type,
                text: raw.text,
                styles: raw
                    .inline_style_ranges
                    .into_iter()
                    .map(|r| StyleRange::new(r.offset, r.offset + r.length, r.style))
                    .collect(),
            })
            .collect();
        Document::from_blocks(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_draft_style_content() {
        let json = r#"{
            "blocks": [
                {"key": "a1b2c", "type": "header-one", "text": "Notes", "inlineStyleRanges": []},
                {"key": "d3e4f", "type": "unstyled", "text": "bold start",
                 "inlineStyleRanges": [{"offset": 0, "length": 4, "style": "BOLD"}]}
            ]
        }"#;

        let raw: RawContent = serde_json::from_str(json).unwrap();
        let doc = Document::try_from(raw).unwrap();

        assert_eq!(doc.blocks().len(), 2);
        assert_eq!(doc.blocks()[0].block_type, BlockType::HeadingOne);
        assert_eq!(
            doc.blocks()[1].styles,
            vec![StyleRange::new(0, 4, InlineStyle::Bold)]
        );
    }

    #[test]
    fn test_style_past_block_end_is_rejected() {
        let raw = RawContent {
            blocks: vec![RawBlock {
                key: "a".to_string(),
                block_type: BlockType::Plain,
                text: "ab".to_string(),
                inline_style_ranges: vec![RawStyleRange {
                    offset: 1,
                    length: 5,
                    style: InlineStyle::Italic,
                }],
            }],
        };
        assert!(matches!(
            Document::try_from(raw),
            Err(ModelError::InvalidContent(_))
        ));
    }

    #[test]
    fn test_empty_content_still_has_a_block() {
        let doc = Document::try_from(RawContent::default()).unwrap();
        assert_eq!(doc.blocks().len(), 1);
    }

    #[test]
    fn test_export_uses_offset_and_length() {
        let mut block = Block::with_text("a", "hello");
        block.styles = vec![StyleRange::new(1, 3, InlineStyle::Underline)];
        let raw = RawContent::from(&Document::with_block(block));

        let value = serde_json::to_value(&raw).unwrap();
        assert_eq!(value["blocks"][0]["inlineStyleRanges"][0]["offset"], 1);
        assert_eq!(value["blocks"][0]["inlineStyleRanges"][0]["length"], 2);
        assert_eq!(value["blocks"][0]["type"], "plain");
    }
}
