//! # Scribe Editor
//!
//! Content model and edit capture engine for Scribe documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ input event (key press, toolbar, click)     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ capture: EditEvent → Operations             │
//! │  - reads selection + document               │
//! │  - applies via Document::apply              │
//! │  - queues for the next flush                │
//! └─────────────────────────────────────────────┘
//!                     ↓                 ↑
//! ┌──────────────────────────┐  ┌──────────────────────────┐
//! │ queue: pending ops       │  │ applier: remote batches  │
//! └──────────────────────────┘  └──────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Operations are the unit of sync**: the document is never sent whole after load
//! 2. **One mutation path**: local capture and remote replay both go through `Document::apply`
//! 3. **Ordered stream**: remote batches apply in array order, last writer wins
//! 4. **Local cursor is local**: remote edits never move the selection
//!
//! ## Usage
//!
//! ```rust
//! use scribe_editor::{Block, Document, EditEvent, EditSession, Permission};
//!
//! let doc = Document::with_block(Block::new("intro"));
//! let mut session = EditSession::new(doc, Permission::Editor);
//!
//! session.handle(EditEvent::InsertChar('h')).unwrap();
//! session.handle(EditEvent::InsertChar('i')).unwrap();
//!
//! let batch = session.drain_pending();
//! assert_eq!(batch.len(), 2);
//! assert_eq!(session.document().plain_text(), "hi");
//! ```

mod applier;
mod block;
mod capture;
mod document;
mod errors;
mod operations;
mod queue;
mod raw;
mod selection;
mod session;

pub use applier::{clamp, replay, ApplyReport};
pub use block::{Block, BlockKey, BlockType, InlineStyle, StyleRange};
pub use capture::{is_word_break, word_delete_length, EditEvent, EditOutcome};
pub use document::Document;
pub use errors::{EditorError, ModelError};
pub use operations::{Operation, TO_END, WHOLE_BLOCK};
pub use queue::PendingQueue;
pub use raw::{RawBlock, RawContent, RawStyleRange};
pub use selection::{Position, Selection, SelectionTracker};
pub use session::{EditSession, Permission};
