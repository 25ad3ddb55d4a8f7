use crate::StagedFile;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// First press: the entry now shows a confirmation hint.
    Armed,
    Removed(StagedFile),
    OutOfRange,
}

/// Files marked for printing, in the order they were marked. A path appears
/// at most once.
#[derive(Debug, Clone, Default)]
pub struct StagingStore {
    files: Vec<StagedFile>,
}

impl StagingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&StagedFile> {
        self.files.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StagedFile> {
        self.files.iter()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.iter().any(|file| file.path == path)
    }

    /// Returns false when the path was already staged.
    pub fn stage(&mut self, file: StagedFile) -> bool {
        if self.contains(&file.path) {
            return false;
        }
        self.files.push(file);
        true
    }

    pub fn unstage(&mut self, path: &Path) -> Option<StagedFile> {
        let idx = self.files.iter().position(|file| file.path == path)?;
        Some(self.files.remove(idx))
    }

    /// Stages `file` if absent, otherwise unstages its path. Returns whether
    /// the path is staged afterwards.
    pub fn toggle(&mut self, file: StagedFile) -> bool {
        if self.unstage(&file.path).is_some() {
            false
        } else {
            self.files.push(file);
            true
        }
    }

    /// Two-step removal: the first call arms the entry, the second removes it.
    pub fn request_remove(&mut self, index: usize) -> RemoveOutcome {
        let Some(file) = self.files.get_mut(index) else {
            return RemoveOutcome::OutOfRange;
        };
        if file.pending_remove {
            RemoveOutcome::Removed(self.files.remove(index))
        } else {
            self.clear_pending_remove();
            self.files[index].pending_remove = true;
            RemoveOutcome::Armed
        }
    }

    pub fn clear_pending_remove(&mut self) {
        for file in &mut self.files {
            file.pending_remove = false;
        }
    }

    pub fn has_pending_remove(&self) -> bool {
        self.files.iter().any(|file| file.pending_remove)
    }

    /// Adds `delta` copies, never going below one. Disarms any pending removal.
    pub fn adjust_copies(&mut self, index: usize, delta: i32) -> Option<u32> {
        self.clear_pending_remove();
        let file = self.files.get_mut(index)?;
        let next = (i64::from(file.copies) + i64::from(delta)).clamp(1, i64::from(u32::MAX));
        file.copies = u32::try_from(next).unwrap_or(1);
        Some(file.copies)
    }

    pub fn clear_all(&mut self) -> usize {
        let count = self.files.len();
        self.files.clear();
        count
    }

    /// Empties the store, handing back everything in staging order.
    pub fn take_all(&mut self) -> Vec<StagedFile> {
        std::mem::take(&mut self.files)
    }
}
