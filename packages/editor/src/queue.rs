//! # Pending Operation Queue
//!
//! Locally produced operations waiting to be sent.
//!
//! - Append-only between flushes
//! - `drain()` hands back everything in order and leaves the queue empty
//! - Dropped with the editing session; nothing survives a document switch

use crate::operations::Operation;

#[derive(Debug, Default)]
pub struct PendingQueue {
    operations: Vec<Operation>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    pub fn extend(&mut self, operations: impl IntoIterator<Item = Operation>) {
        self.operations.extend(operations);
    }

    /// Take the full ordered contents, resetting to empty
    pub fn drain(&mut self) -> Vec<Operation> {
        std::mem::take(&mut self.operations)
    }

    /// Throw away anything not yet drained, returning how many were lost
    pub fn discard(&mut self) -> usize {
        let lost = self.operations.len();
        self.operations.clear();
        lost
    }

    pub fn peek(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_order_and_resets() {
        let mut queue = PendingQueue::new();
        queue.enqueue(Operation::insert("a", 0, "h"));
        queue.enqueue(Operation::insert("a", 1, "i"));
        assert_eq!(queue.len(), 2);

        let batch = queue.drain();
        assert_eq!(
            batch,
            vec![Operation::insert("a", 0, "h"), Operation::insert("a", 1, "i")]
        );
        assert!(queue.is_empty());
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_discard_reports_lost_operations() {
        let mut queue = PendingQueue::new();
        queue.extend(vec![Operation::insert("a", 0, "x"); 3]);
        assert_eq!(queue.discard(), 3);
        assert!(queue.is_empty());
    }
}
