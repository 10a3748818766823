//! Editing session with undo/redo over immutable document snapshots.

use std::collections::VecDeque;

use crate::editor::{apply_edits, BatchEditError, EditError, FieldEdit};
use crate::schema::SchemaDocument;

/// Undo steps kept by [`EditSession::new`].
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Owns the document being edited plus its history.
///
/// Every successful edit pushes the prior snapshot onto the undo stack and
/// clears the redo stack. The undo stack holds at most `history_limit`
/// snapshots; the oldest is dropped first. Failed edits leave the session
/// unchanged.
#[derive(Debug, Clone)]
pub struct EditSession {
    current: SchemaDocument,
    undo: VecDeque<SchemaDocument>,
    redo: Vec<SchemaDocument>,
    saved: SchemaDocument,
    history_limit: usize,
}

impl EditSession {
    /// Start a session; the initial document counts as saved.
    pub fn new(document: SchemaDocument) -> Self {
        Self::with_history_limit(document, DEFAULT_HISTORY_LIMIT)
    }

    /// Start a session keeping at most `limit` undo steps (`0` disables undo).
    pub fn with_history_limit(document: SchemaDocument, limit: usize) -> Self {
        Self {
            saved: document.clone(),
            current: document,
            undo: VecDeque::new(),
            redo: Vec::new(),
            history_limit: limit,
        }
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    pub fn document(&self) -> &SchemaDocument {
        &self.current
    }

    pub fn into_document(self) -> SchemaDocument {
        self.current
    }

    pub fn apply(&mut self, edit: &FieldEdit) -> Result<&SchemaDocument, EditError> {
        let next = edit.apply(&self.current)?;
        self.commit(next);
        Ok(&self.current)
    }

    /// Apply a batch as a single undo step.
    pub fn apply_all(&mut self, edits: &[FieldEdit]) -> Result<&SchemaDocument, BatchEditError> {
        let next = apply_edits(&self.current, edits)?;
        self.commit(next);
        Ok(&self.current)
    }

    fn commit(&mut self, next: SchemaDocument) {
        let prior = std::mem::replace(&mut self.current, next);
        self.push_undo(prior);
        self.redo.clear();
    }

    fn push_undo(&mut self, snapshot: SchemaDocument) {
        if self.history_limit == 0 {
            return;
        }
        while self.undo.len() >= self.history_limit {
            self.undo.pop_front();
        }
        self.undo.push_back(snapshot);
    }

    /// Step back one edit. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.undo.pop_back() {
            Some(prior) => {
                let undone = std::mem::replace(&mut self.current, prior);
                self.redo.push(undone);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.redo.pop() {
            Some(next) => {
                let prior = std::mem::replace(&mut self.current, next);
                self.push_undo(prior);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn mark_saved(&mut self) {
        self.saved = self.current.clone();
    }

    /// Whether the current document differs from the last saved snapshot.
    pub fn is_dirty(&self) -> bool {
        self.current != self.saved
    }
}
