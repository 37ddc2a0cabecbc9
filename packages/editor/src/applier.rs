//! # Remote Operation Applier
//!
//! Replays an inbound batch directly against the content model, strictly in
//! array order. Nothing is re-derived through the capture engine and the local
//! selection is never touched.
//!
//! Remote operations can race local structural edits, so one stale offset must
//! not stall the batch: out-of-range operations are clamped onto the current
//! document and applied best-effort. Operations naming a block that no longer
//! exists are skipped.

use tracing::{debug, warn};

use crate::document::Document;
use crate::errors::ModelError;
use crate::operations::{Operation, TO_END, WHOLE_BLOCK};

/// Outcome of replaying one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Applied as received
    pub applied: usize,

    /// Applied after clamping onto the current document
    pub clamped: usize,

    /// Could not be applied at all
    pub skipped: usize,
}

impl ApplyReport {
    pub fn total(&self) -> usize {
        self.applied + self.clamped + self.skipped
    }
}

/// Apply `batch` to `doc` in order
pub fn replay(doc: &mut Document, batch: &[Operation]) -> ApplyReport {
    let mut report = ApplyReport::default();

    for op in batch {
        match doc.apply(op) {
            Ok(()) => report.applied += 1,
            Err(ModelError::OutOfRange { block, value, len }) => {
                let Some(fixed) = clamp(doc, op) else {
                    warn!("Skipping {} on {}: block vanished", op.name(), block);
                    doc.clear_open_range();
                    report.skipped += 1;
                    continue;
                };
                debug!(
                    "Clamping {} on {}: {} outside length {}",
                    op.name(),
                    block,
                    value,
                    len
                );
                match doc.apply(&fixed) {
                    Ok(()) => report.clamped += 1,
                    Err(e) => {
                        warn!("Skipping {} after clamp: {}", op.name(), e);
                        doc.clear_open_range();
                        report.skipped += 1;
                    }
                }
            }
            Err(e) => {
                warn!("Skipping remote {}: {}", op.name(), e);
                doc.clear_open_range();
                report.skipped += 1;
            }
        }
    }

    report
}

/// Pull every offset of `op` back inside the current bounds of its block
pub fn clamp(doc: &Document, op: &Operation) -> Option<Operation> {
    let index = doc.index_of(op.block())?;
    let len = doc.blocks()[index].len();

    let fixed = match op {
        Operation::Insert {
            block,
            position,
            text,
        } => Operation::Insert {
            block: block.clone(),
            position: (*position).min(len),
            text: text.clone(),
        },

        Operation::Delete {
            block,
            position,
            offset,
        } => {
            if *position == WHOLE_BLOCK {
                op.clone()
            } else {
                let position = (*position).clamp(0, len as i64);
                let offset = if *offset == TO_END {
                    TO_END
                } else {
                    let available = doc.delete_limit(index, position as usize) as i64;
                    (*offset).clamp(0, available)
                };
                Operation::Delete {
                    block: block.clone(),
                    position,
                    offset,
                }
            }
        }

        Operation::SplitBlock {
            block,
            new_block,
            position,
        } => Operation::SplitBlock {
            block: block.clone(),
            new_block: new_block.clone(),
            position: (*position).min(len),
        },

        Operation::SetBlockType { .. } => op.clone(),

        Operation::SetInlineStyle {
            block,
            position,
            offset,
            style,
        } => {
            let position = (*position).min(len);
            let offset = if *offset == TO_END {
                TO_END
            } else {
                (*offset).clamp(position as i64, len as i64)
            };
            Operation::SetInlineStyle {
                block: block.clone(),
                position,
                offset,
                style: *style,
            }
        }
    };

    Some(fixed)
}
