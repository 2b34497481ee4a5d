//! Directory enumeration.
//!
//! Positions 0 and 1 are the synthetic `.` and `..`; position `n >= 2` is the
//! `(n - 2)`th entry of the child chain, i.e. newest child first. The chain
//! has no index, so each resume walks from the head.
//!
//! There is no snapshot: if the directory changes between calls, a resumed
//! enumeration may skip or repeat entries.

use vtfs_types::{DirEntry, EntryKind, FsError, FsResult};

use crate::arena::EntryId;
use crate::store::Store;

/// Resumable enumeration position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirCursor {
    pub pos: u64,
}

impl DirCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a position a host stored earlier (e.g. `DirEntry::next`).
    pub fn at(pos: u64) -> Self {
        Self { pos }
    }
}

impl Store {
    /// Emit entries of `dir` from `cursor` onwards.
    ///
    /// `emit` returns `false` when the consumer is full; that record is not
    /// counted and the next call starts with it again. The cursor is advanced
    /// past every accepted record.
    pub fn iterate(
        &self,
        dir: EntryId,
        cursor: &mut DirCursor,
        mut emit: impl FnMut(&DirEntry) -> bool,
    ) -> FsResult<()> {
        let tree = self.read_tree();
        let entry = tree.get(dir)?;
        if !entry.is_dir() {
            return Err(FsError::NotADirectory);
        }

        if cursor.pos == 0 {
            let dot = DirEntry {
                name: ".".to_string(),
                ino: entry.ino,
                kind: EntryKind::Directory,
                next: 1,
            };
            if !emit(&dot) {
                return Ok(());
            }
            cursor.pos = 1;
        }

        if cursor.pos == 1 {
            let parent_ino = match entry.parent {
                Some(parent) => tree.get(parent)?.ino,
                None => entry.ino,
            };
            let dotdot = DirEntry {
                name: "..".to_string(),
                ino: parent_ino,
                kind: EntryKind::Directory,
                next: 2,
            };
            if !emit(&dotdot) {
                return Ok(());
            }
            cursor.pos = 2;
        }

        let mut skip = cursor.pos - 2;
        let mut child = entry.first_child;
        while skip > 0 {
            let Some(id) = child else {
                return Ok(());
            };
            child = tree.get(id)?.next_sibling;
            skip -= 1;
        }

        while let Some(id) = child {
            let c = tree.get(id)?;
            let record = DirEntry {
                name: c.name.clone(),
                ino: c.ino,
                kind: c.kind,
                next: cursor.pos + 1,
            };
            if !emit(&record) {
                break;
            }
            cursor.pos += 1;
            child = c.next_sibling;
        }
        Ok(())
    }

    /// Lazy iterator over `dir`, one [`Store::iterate`] call per item.
    pub fn read_dir(&self, dir: EntryId) -> ReadDir<'_> {
        ReadDir {
            store: self,
            dir,
            cursor: DirCursor::new(),
            done: false,
        }
    }

    /// All entries of `dir`, including `.` and `..`.
    pub fn list(&self, dir: EntryId) -> FsResult<Vec<DirEntry>> {
        let mut out = Vec::new();
        self.iterate(dir, &mut DirCursor::new(), |e| {
            out.push(e.clone());
            true
        })?;
        Ok(out)
    }
}

/// Iterator returned by [`Store::read_dir`].
#[derive(Debug)]
pub struct ReadDir<'a> {
    store: &'a Store,
    dir: EntryId,
    cursor: DirCursor,
    done: bool,
}

impl ReadDir<'_> {
    pub fn cursor(&self) -> DirCursor {
        self.cursor
    }
}

impl Iterator for ReadDir<'_> {
    type Item = FsResult<DirEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut taken = None;
        let result = self.store.iterate(self.dir, &mut self.cursor, |e| {
            if taken.is_some() {
                return false;
            }
            taken = Some(e.clone());
            true
        });
        match (result, taken) {
            (Err(e), _) => {
                self.done = true;
                Some(Err(e))
            }
            (Ok(()), Some(entry)) => Some(Ok(entry)),
            (Ok(()), None) => {
                self.done = true;
                None
            }
        }
    }
}
