//! Snapshot-based undo/redo.
//!
//! Every committed mutation pushes a deep copy of the chart's structural
//! state. The oldest snapshot on the undo stack is the floor that undo never
//! goes past.

use crate::constants::MAX_HISTORY_SIZE;
use crate::types::{Group, Node};
use log::debug;

/// Deep copy of the nodes and groups at one commit point.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub nodes: Vec<Node>,
    pub next_id: u64,
    pub groups: Vec<Group>,
    pub next_group_id: u64,
}

/// Bounded undo and redo stacks.
#[derive(Debug, Clone)]
pub struct History {
    /// Committed states, newest last
    undo_stack: Vec<Snapshot>,
    /// States undone since the last commit, most recently undone last
    redo_stack: Vec<Snapshot>,
    max_size: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// Creates an empty history with the default cap.
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTORY_SIZE)
    }

    /// Creates an empty history keeping at most `max_size` snapshots.
    pub fn with_capacity(max_size: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_size: max_size.max(1),
        }
    }

    /// Records a new state.
    ///
    /// This clears the redo stack since a new commit invalidates any previously undone states.
    ///
    /// # Arguments
    ///
    /// * `snapshot` - The state after the mutation
    pub fn commit(&mut self, snapshot: Snapshot) {
        self.undo_stack.push(snapshot);
        self.redo_stack.clear();

        if self.undo_stack.len() > self.max_size {
            let excess = self.undo_stack.len() - self.max_size;
            self.undo_stack.drain(..excess);
        }
    }

    /// Steps back one commit.
    ///
    /// # Returns
    ///
    /// The state to restore, or None when already at the floor
    pub fn undo(&mut self) -> Option<&Snapshot> {
        if self.undo_stack.len() <= 1 {
            return None;
        }
        let current = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        debug!("Undo: {} snapshot(s) left", self.undo_stack.len());
        self.undo_stack.last()
    }

    /// Re-applies the most recently undone commit.
    ///
    /// # Returns
    ///
    /// The state to restore, or None when nothing was undone
    pub fn redo(&mut self) -> Option<&Snapshot> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(next);
        debug!("Redo: {} snapshot(s) left to redo", self.redo_stack.len());
        self.undo_stack.last()
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Forgets everything and starts again from `initial`.
    pub fn reset(&mut self, initial: Snapshot) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.undo_stack.push(initial);
    }
}
