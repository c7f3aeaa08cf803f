//! Linear undo/redo history of whole-document snapshots.

use crate::document::Document;

/// Default number of snapshots retained.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Snapshots plus a cursor pointing at the snapshot matching the current
/// document. Entries after the cursor form the redo branch.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: Vec<Document>,
    cursor: usize,
    capacity: usize,
}

impl History {
    /// Start a history whose only entry is `initial`.
    pub fn new(initial: Document, capacity: usize) -> Self {
        Self {
            snapshots: vec![initial],
            cursor: 0,
            capacity: capacity.max(1),
        }
    }

    /// Record a new snapshot, discarding any redo branch and evicting the
    /// oldest entry once over capacity.
    pub fn push(&mut self, snapshot: Document) {
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(snapshot);
        self.cursor = self.snapshots.len() - 1;

        if self.snapshots.len() > self.capacity {
            let overflow = self.snapshots.len() - self.capacity;
            self.snapshots.drain(..overflow);
            self.cursor -= overflow;
            log::debug!("History evicted {} snapshot(s)", overflow);
        }
    }

    /// Step back. Returns the snapshot to restore, or `None` at the start.
    pub fn undo(&mut self) -> Option<&Document> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.snapshots.get(self.cursor)
    }

    /// Step forward. Returns the snapshot to restore, or `None` at the end.
    pub fn redo(&mut self) -> Option<&Document> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.snapshots.get(self.cursor)
    }

    /// The snapshot at the cursor, for edits that should not add an entry.
    pub fn current_mut(&mut self) -> &mut Document {
        &mut self.snapshots[self.cursor]
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Drop everything and start over from `initial`.
    pub fn reset(&mut self, initial: Document) {
        self.snapshots.clear();
        self.snapshots.push(initial);
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_title(title: &str) -> Document {
        let mut doc = Document::default_template();
        doc.document.title = title.to_string();
        doc
    }

    #[test]
    fn test_current_mut_edits_in_place() {
        let mut history = History::new(doc_with_title("a"), 10);
        history.push(doc_with_title("b"));
        history.current_mut().document.title = "b2".to_string();
        assert_eq!(history.len(), 2);

        assert_eq!(history.undo().unwrap().document.title, "a");
        assert_eq!(history.redo().unwrap().document.title, "b2");
    }

    #[test]
    fn test_undo_redo() {
        let mut history = History::new(doc_with_title("a"), 10);
        history.push(doc_with_title("b"));
        history.push(doc_with_title("c"));

        assert_eq!(history.undo().unwrap().document.title, "b");
        assert_eq!(history.undo().unwrap().document.title, "a");
        assert!(history.undo().is_none());
        assert_eq!(history.redo().unwrap().document.title, "b");
        assert_eq!(history.redo().unwrap().document.title, "c");
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_push_truncates_redo_branch() {
        let mut history = History::new(doc_with_title("a"), 10);
        history.push(doc_with_title("b"));
        history.push(doc_with_title("c"));
        history.undo();
        history.undo();
        history.push(doc_with_title("d"));

        assert!(!history.can_redo());
        assert_eq!(history.len(), 2);
        assert_eq!(history.undo().unwrap().document.title, "a");
        assert_eq!(history.redo().unwrap().document.title, "d");
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = History::new(doc_with_title("0"), 3);
        for i in 1..=5 {
            history.push(doc_with_title(&i.to_string()));
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.cursor(), 2);
        assert_eq!(history.undo().unwrap().document.title, "4");
        assert_eq!(history.undo().unwrap().document.title, "3");
        assert!(history.undo().is_none());
    }

    #[test]
    fn test_reset() {
        let mut history = History::new(doc_with_title("a"), 10);
        history.push(doc_with_title("b"));
        history.reset(doc_with_title("z"));
        assert_eq!(history.len(), 1);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }
}
