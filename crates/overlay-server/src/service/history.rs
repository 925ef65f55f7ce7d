use std::collections::VecDeque;

use overlay_proto::Layer;

/// Bounded undo stack with a redo stack that any new mutation clears.
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<Vec<Layer>>,
    redo: Vec<Vec<Layer>>,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit,
        }
    }

    /// Record the document as it was before a mutation.
    pub fn push(&mut self, before: Vec<Layer>) {
        if self.limit == 0 {
            return;
        }
        self.undo.push_back(before);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
        self.redo.clear();
    }

    /// Step back. `current` becomes redoable; returns the document to restore.
    pub fn undo(&mut self, current: Vec<Layer>) -> Option<Vec<Layer>> {
        let previous = self.undo.pop_back()?;
        self.redo.push(current);
        Some(previous)
    }

    pub fn redo(&mut self, current: Vec<Layer>) -> Option<Vec<Layer>> {
        let next = self.redo.pop()?;
        self.undo.push_back(current);
        Some(next)
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }
}
