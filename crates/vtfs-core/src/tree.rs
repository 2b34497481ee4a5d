//! Tree primitives: allocate, lookup, insert, detach, destroy.
//!
//! A directory's children form an intrusive singly linked list threaded
//! through `first_child` / `next_sibling`. New children are prepended, so the
//! chain runs newest to oldest. None of these primitives check for duplicate
//! names; the namespace operations decide where that matters.
//!
//! Release is reference-counted (see [`Tree::release_if_unreferenced`]):
//! detaching an entry only unlinks it, and the slot is freed once no tree,
//! hardlink, or handle reference is left.

use std::sync::{Arc, Mutex};

use vtfs_types::{EntryKind, FileMode, FsError, FsResult};

use crate::arena::{Arena, EntryId};
use crate::content::Buffer;
use crate::entry::{Content, Entry};

/// The entry graph of one mounted store.
#[derive(Debug)]
pub(crate) struct Tree {
    pub arena: Arena,
    pub root: EntryId,
}

impl Tree {
    /// Build a tree holding only `root`, which is marked attached for as long
    /// as the tree lives.
    pub fn with_root(root: Entry) -> FsResult<Self> {
        let mut arena = Arena::new();
        let root = arena.insert(root)?;
        arena.get_mut(root)?.attached = true;
        Ok(Self { arena, root })
    }

    pub fn get(&self, id: EntryId) -> FsResult<&Entry> {
        self.arena.get(id)
    }

    pub fn get_mut(&mut self, id: EntryId) -> FsResult<&mut Entry> {
        self.arena.get_mut(id)
    }

    /// Allocate a new unlinked entry. Identity is left for the caller to
    /// assign.
    pub fn allocate(&mut self, name: &str, kind: EntryKind, mode: FileMode) -> FsResult<EntryId> {
        let mut owned = String::new();
        owned
            .try_reserve_exact(name.len())
            .map_err(|_| FsError::OutOfMemory)?;
        owned.push_str(name);

        let id = self.arena.insert(Entry::new(owned, kind, mode))?;
        tracing::debug!(%id, name, ?kind, mode = mode.bits(), "allocated entry");
        Ok(id)
    }

    /// First child of `parent` named exactly `name`.
    pub fn lookup(&self, parent: EntryId, name: &str) -> FsResult<EntryId> {
        let dir = self.arena.get(parent)?;
        if !dir.is_dir() {
            return Err(FsError::NotADirectory);
        }
        let mut cursor = dir.first_child;
        while let Some(id) = cursor {
            let child = self.arena.get(id)?;
            if child.name == name {
                return Ok(id);
            }
            cursor = child.next_sibling;
        }
        Err(FsError::NotFound)
    }

    /// Prepend `child` to `parent`'s chain.
    pub fn insert_child(&mut self, parent: EntryId, child: EntryId) -> FsResult<()> {
        let head = {
            let dir = self.arena.get(parent)?;
            if !dir.is_dir() {
                return Err(FsError::NotADirectory);
            }
            dir.first_child
        };

        let entry = self.arena.get_mut(child)?;
        if entry.attached {
            return Err(FsError::InvalidArgument);
        }
        entry.parent = Some(parent);
        entry.next_sibling = head;
        entry.attached = true;

        self.arena.get_mut(parent)?.first_child = Some(child);
        tracing::trace!(%parent, %child, "inserted entry");
        Ok(())
    }

    /// Unlink `child` from `parent`'s chain. `NotFound` if it isn't there.
    pub fn detach_child(&mut self, parent: EntryId, child: EntryId) -> FsResult<()> {
        let mut prev: Option<EntryId> = None;
        let mut cursor = self.arena.get(parent)?.first_child;

        while let Some(id) = cursor {
            let next = self.arena.get(id)?.next_sibling;
            if id == child {
                match prev {
                    Some(prev) => self.arena.get_mut(prev)?.next_sibling = next,
                    None => self.arena.get_mut(parent)?.first_child = next,
                }
                let entry = self.arena.get_mut(id)?;
                entry.parent = None;
                entry.next_sibling = None;
                entry.attached = false;
                tracing::debug!(%parent, %child, "detached entry");
                return Ok(());
            }
            prev = Some(id);
            cursor = next;
        }
        Err(FsError::NotFound)
    }

    /// Children of `dir` in chain order (newest first).
    pub fn children(&self, dir: EntryId) -> FsResult<Vec<EntryId>> {
        let mut out = Vec::new();
        let mut cursor = self.arena.get(dir)?.first_child;
        while let Some(id) = cursor {
            out.push(id);
            cursor = self.arena.get(id)?.next_sibling;
        }
        Ok(out)
    }

    /// Resolve one level of hardlink: the entry that holds the bytes.
    pub fn content_owner(&self, id: EntryId) -> FsResult<EntryId> {
        let entry = self.arena.get(id)?;
        if entry.is_dir() {
            return Err(FsError::IsADirectory);
        }
        Ok(entry.link_target().unwrap_or(id))
    }

    /// The content guard for a file entry, resolved through a hardlink.
    pub fn content(&self, id: EntryId) -> FsResult<Arc<Mutex<Buffer>>> {
        let owner = self.content_owner(id)?;
        self.arena
            .get(owner)
            .map_err(|_| FsError::Io)?
            .owned_buffer()
            .cloned()
            .ok_or(FsError::Io)
    }

    /// Free `id` if nothing references it any more. Releasing a hardlink drops
    /// its owner's hardlink reference, which may in turn free the owner.
    ///
    /// Returns how many entries were freed.
    pub fn release_if_unreferenced(&mut self, id: EntryId) -> usize {
        let mut freed = 0;
        let mut next = Some(id);

        while let Some(current) = next.take() {
            match self.arena.get(current) {
                Ok(entry) if entry.is_unreferenced() => {}
                _ => break,
            }
            let Some(entry) = self.arena.remove(current) else {
                break;
            };
            freed += 1;
            tracing::debug!(id = %current, name = %entry.name, ino = %entry.ino, "released entry");

            if let Some(Content::Linked(owner)) = entry.content {
                if let Ok(owner_entry) = self.arena.get_mut(owner) {
                    owner_entry.link_refs = owner_entry.link_refs.saturating_sub(1);
                    next = Some(owner);
                }
            }
        }
        freed
    }

    /// Tear down `id` and everything below it, children before parents.
    ///
    /// Every entry in the subtree is unlinked. Entries still pinned by a
    /// handle or by a hardlink outside the subtree stay allocated, detached,
    /// until that reference goes away. Returns how many entries were freed.
    pub fn destroy_subtree(&mut self, id: EntryId) -> FsResult<usize> {
        let top = self.arena.get(id)?;
        if let Some(parent) = top.parent {
            self.detach_child(parent, id)?;
        }

        // Pre-order walk; reversed, every entry comes after its descendants.
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            order.push(current);
            stack.extend(self.children(current)?);
        }

        let mut freed = 0;
        for current in order.into_iter().rev() {
            if let Ok(entry) = self.arena.get_mut(current) {
                entry.parent = None;
                entry.first_child = None;
                entry.next_sibling = None;
                entry.attached = false;
            }
            freed += self.release_if_unreferenced(current);
        }
        tracing::debug!(%id, freed, "destroyed subtree");
        Ok(freed)
    }

    /// Free every entry, ignoring outstanding handles. Used at unmount, when
    /// the host has nothing left to hold on to.
    pub fn teardown(&mut self) -> usize {
        for id in self.arena.ids() {
            if let Ok(entry) = self.arena.get_mut(id) {
                entry.handles = 0;
            }
        }
        if let Ok(root) = self.arena.get_mut(self.root) {
            root.attached = false;
        }

        let mut freed = self.destroy_subtree(self.root).unwrap_or(0);
        for id in self.arena.ids() {
            freed += self.release_if_unreferenced(id);
        }

        let leaked = self.arena.len();
        if leaked > 0 {
            tracing::warn!(leaked, "entries still referenced at teardown, dropping them");
            for id in self.arena.ids() {
                self.arena.remove(id);
            }
            freed += leaked;
        }
        freed
    }
}
