//! # Edit Session
//!
//! One client's editing state for one document: the content model, the local
//! selection, and the operations produced locally but not yet sent.
//!
//! Local edits enter through [`EditSession::handle`](crate::capture); remote
//! batches through [`EditSession::apply_remote`]. Both mutate the document via
//! [`Document::apply`], and the host must serialize the two call paths.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::applier::{self, ApplyReport};
use crate::document::Document;
use crate::errors::EditorError;
use crate::operations::Operation;
use crate::queue::PendingQueue;
use crate::selection::{Selection, SelectionTracker};

/// Collaborator permission level, as issued by the document service
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Permission {
    Owner = 0,
    Admin = 1,
    Editor = 2,
    Viewer = 3,
}

impl Permission {
    pub fn can_edit(&self) -> bool {
        *self <= Permission::Editor
    }

    /// Renaming the document and inviting collaborators
    pub fn can_manage(&self) -> bool {
        *self <= Permission::Admin
    }

    pub fn label(&self) -> &'static str {
        match self {
            Permission::Owner => "Owner",
            Permission::Admin => "Admin",
            Permission::Editor => "Editor",
            Permission::Viewer => "Viewer",
        }
    }
}

impl TryFrom<u8> for Permission {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(Permission::Owner),
            1 => Ok(Permission::Admin),
            2 => Ok(Permission::Editor),
            3 => Ok(Permission::Viewer),
            other => Err(format!("unknown permission level {}", other)),
        }
    }
}

impl From<Permission> for u8 {
    fn from(permission: Permission) -> Self {
        permission as u8
    }
}

pub struct EditSession {
    pub(crate) document: Document,
    pub(crate) selection: SelectionTracker,
    pub(crate) pending: PendingQueue,
    pub(crate) permission: Permission,
}

impl EditSession {
    /// Start editing `document` with the cursor at its end
    pub fn new(document: Document, permission: Permission) -> Self {
        let selection = SelectionTracker::at_end(&document);
        Self {
            document,
            selection,
            pending: PendingQueue::new(),
            permission,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn selection(&self) -> &Selection {
        self.selection.current_selection()
    }

    pub fn tracker(&self) -> &SelectionTracker {
        &self.selection
    }

    pub fn permission(&self) -> Permission {
        self.permission
    }

    pub fn is_read_only(&self) -> bool {
        !self.permission.can_edit()
    }

    /// Operations captured but not yet drained
    pub fn pending(&self) -> &[Operation] {
        self.pending.peek()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Take everything pending for transmission
    pub fn drain_pending(&mut self) -> Vec<Operation> {
        self.pending.drain()
    }

    /// Replay a remote batch. The local selection is left where it was.
    pub fn apply_remote(&mut self, batch: &[Operation]) -> ApplyReport {
        let report = applier::replay(&mut self.document, batch);
        debug!(
            "Applied remote batch of {} (clamped {}, skipped {}), version {}",
            report.total(),
            report.clamped,
            report.skipped,
            self.document.version()
        );
        report
    }

    /// Apply locally computed operations and queue them, in order.
    ///
    /// Operations that applied before a failure stay queued so peers see the
    /// same partial edit this client now shows.
    pub(crate) fn commit(&mut self, ops: Vec<Operation>) -> Result<Vec<Operation>, EditorError> {
        let mut committed = Vec::with_capacity(ops.len());
        for op in ops {
            if let Err(e) = self.document.apply(&op) {
                self.pending.extend(committed);
                return Err(e.into());
            }
            committed.push(op);
        }
        self.pending.extend(committed.iter().cloned());
        Ok(committed)
    }
}
