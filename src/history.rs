use crate::model::{HISTORY_CAP, Snapshot};

/// Bounded undo stack of fully independent snapshots. Only undo is
/// supported: capturing after an undo discards everything past the current
/// index, and the oldest snapshot is evicted once the cap is reached.
///
/// The restore itself is asynchronous and owned by the engine; this type
/// only hands out the target snapshot (`peek_previous`) and moves the index
/// once the engine has applied it (`commit_undo`), so a failed restore
/// leaves the history untouched.
#[derive(Clone, Debug, Default)]
pub struct History {
    snapshots: Vec<Snapshot>,
    index: usize,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn undo_available(&self) -> bool {
        self.index > 0
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.index = 0;
    }

    /// Append a snapshot at the tail. If the index is not at the tail (one
    /// or more undos happened), the abandoned branch is discarded first.
    pub fn capture(&mut self, snapshot: Snapshot) {
        if !self.snapshots.is_empty() && self.index < self.snapshots.len() - 1 {
            self.snapshots.truncate(self.index + 1);
        }
        self.snapshots.push(snapshot);
        if self.snapshots.len() > HISTORY_CAP {
            self.snapshots.remove(0);
        }
        self.index = self.snapshots.len() - 1;
    }

    /// Snapshot an undo would restore, without committing to it.
    pub fn peek_previous(&self) -> Option<&Snapshot> {
        if self.index == 0 || self.snapshots.is_empty() {
            return None;
        }
        self.snapshots.get(self.index - 1)
    }

    /// Move the index back one step after a successful restore.
    pub fn commit_undo(&mut self) {
        debug_assert!(self.index > 0);
        self.index = self.index.saturating_sub(1);
    }
}
