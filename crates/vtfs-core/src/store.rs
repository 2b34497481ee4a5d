//! The mounted store: root, identity counter, handle bookkeeping.
//!
//! # Locking
//!
//! The tree sits behind one `RwLock`. Structural operations take it for
//! writing; lookup, enumeration and metadata take it for reading. Content I/O
//! holds the tree lock only while resolving an entry to its content guard,
//! then releases it before locking the buffer, so the order is always tree
//! then content and never the reverse.
//!
//! # Caller contract
//!
//! Hosts are expected to serialize structural changes to any one directory
//! (`create_file`, `make_directory`, `remove_file`, `remove_directory`,
//! `link` against the same parent), the way a VFS holds the directory's
//! inode lock. The internal lock keeps concurrent calls memory-safe, but a
//! check-then-act sequence spread over several calls, such as a `lookup`
//! followed by `create_file`, is only race-free under that external
//! serialization.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use vtfs_types::{Attr, EntryKind, FileMode, FsError, FsResult, Ino, StatFs};

use crate::arena::EntryId;
use crate::config::StoreConfig;
use crate::content::Buffer;
use crate::entry::Entry;
use crate::tree::Tree;

/// `statfs` magic number.
pub const VTFS_MAGIC: u32 = 0xDEAD_BABE;

/// An in-memory hierarchical file store.
///
/// Created by [`Store::mount`], torn down by [`Store::unmount`] (or by
/// dropping it). All operations take `&self`; share it across threads with
/// an `Arc`.
#[derive(Debug)]
pub struct Store {
    config: StoreConfig,
    tree: RwLock<Tree>,
    next_ino: AtomicU64,
}

impl Store {
    /// Mount a fresh store: just a root directory, identity 1.
    pub fn mount(config: StoreConfig) -> FsResult<Self> {
        config.validate()?;

        let mut root = Entry::new(
            "/".to_string(),
            EntryKind::Directory,
            FileMode::new(FileMode::S_IFDIR | (config.root_mode & FileMode::PERM_MASK)),
        );
        root.ino = Ino(1);
        let tree = Tree::with_root(root)?;

        tracing::info!(min_capacity = config.min_capacity, "mounted store");
        Ok(Self {
            config,
            tree: RwLock::new(tree),
            next_ino: AtomicU64::new(2),
        })
    }

    /// Tear the store down, freeing every entry bottom-up from the root.
    /// Returns how many entries were freed.
    pub fn unmount(self) -> usize {
        let mut tree = self.tree.into_inner().unwrap_or_else(PoisonError::into_inner);
        let freed = tree.teardown();
        tracing::info!(freed, "unmounted store");
        freed
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The root directory.
    pub fn root(&self) -> EntryId {
        self.read_tree().root
    }

    /// Next identity. Identities are never reused within a store.
    pub(crate) fn next_ino(&self) -> Ino {
        Ino(self.next_ino.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn read_tree(&self) -> RwLockReadGuard<'_, Tree> {
        self.tree.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write_tree(&self) -> RwLockWriteGuard<'_, Tree> {
        self.tree.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Metadata snapshot. Touches no reference counts.
    pub fn getattr(&self, id: EntryId) -> FsResult<Attr> {
        let tree = self.read_tree();
        attr_of(&tree, id)
    }

    /// The host materialized a handle for `id`: pin the entry and report its
    /// metadata.
    pub fn materialize(&self, id: EntryId) -> FsResult<Attr> {
        let mut tree = self.write_tree();
        let attr = attr_of(&tree, id)?;
        tree.get_mut(id)?.handles += 1;
        Ok(attr)
    }

    /// The host is done with a handle for `id`. Frees the entry if that was
    /// its last reference.
    pub fn release(&self, id: EntryId) -> FsResult<()> {
        let mut tree = self.write_tree();
        let entry = tree.get_mut(id)?;
        if entry.handles == 0 {
            tracing::warn!(%id, "release without a matching materialize");
            return Err(FsError::InvalidArgument);
        }
        entry.handles -= 1;
        tree.release_if_unreferenced(id);
        Ok(())
    }

    pub fn statfs(&self) -> StatFs {
        let tree = self.read_tree();
        let bytes_allocated = tree
            .arena
            .entries()
            .filter_map(Entry::owned_buffer)
            .map(|buffer| lock_buffer(buffer).capacity() as u64)
            .sum();
        StatFs {
            magic: VTFS_MAGIC,
            block_size: self.config.min_capacity as u64,
            name_max: self.config.name_max,
            entries: tree.arena.len() as u64,
            bytes_allocated,
        }
    }

    /// Name the entry was created with.
    pub fn name(&self, id: EntryId) -> FsResult<String> {
        Ok(self.read_tree().get(id)?.name.clone())
    }

    /// Containing directory, `None` for the root and for detached entries.
    pub fn parent(&self, id: EntryId) -> FsResult<Option<EntryId>> {
        Ok(self.read_tree().get(id)?.parent)
    }

    pub fn kind(&self, id: EntryId) -> FsResult<EntryKind> {
        Ok(self.read_tree().get(id)?.kind)
    }

    /// Whether `id` is a hardlink entry deferring to another entry's content.
    pub fn is_hardlink(&self, id: EntryId) -> FsResult<bool> {
        Ok(self.read_tree().get(id)?.link_target().is_some())
    }

    /// Whether `id` still refers to a live (possibly detached) entry.
    pub fn exists(&self, id: EntryId) -> bool {
        self.read_tree().arena.contains(id)
    }
}

pub(crate) fn lock_buffer(buffer: &std::sync::Mutex<Buffer>) -> std::sync::MutexGuard<'_, Buffer> {
    buffer.lock().unwrap_or_else(PoisonError::into_inner)
}

fn attr_of(tree: &Tree, id: EntryId) -> FsResult<Attr> {
    let entry = tree.get(id)?;
    match entry.kind {
        EntryKind::Directory => Ok(Attr {
            ino: entry.ino,
            kind: entry.kind,
            mode: entry.mode,
            size: 0,
            nlink: entry.nlink,
            blocks: 0,
        }),
        EntryKind::File => {
            let owner = tree.get(tree.content_owner(id)?).map_err(|_| FsError::Io)?;
            let (size, capacity) = match owner.owned_buffer() {
                Some(buffer) => {
                    let buffer = lock_buffer(buffer);
                    (buffer.size() as u64, buffer.capacity() as u64)
                }
                None => return Err(FsError::Io),
            };
            Ok(Attr {
                ino: entry.ino,
                kind: entry.kind,
                mode: entry.mode,
                size,
                nlink: owner.nlink,
                blocks: capacity.div_ceil(512),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_creates_root_with_ino_one() {
        let store = Store::mount(StoreConfig::default()).unwrap();
        let attr = store.getattr(store.root()).unwrap();
        assert_eq!(attr.ino, Ino(1));
        assert_eq!(attr.kind, EntryKind::Directory);
        assert!(attr.mode.is_dir());
        assert_eq!(attr.mode.permissions(), 0o777);
        assert_eq!(attr.nlink, 2);
        assert_eq!(store.parent(store.root()).unwrap(), None);
    }

    #[test]
    fn mount_rejects_bad_config() {
        let err = Store::mount(StoreConfig::default().with_min_capacity(100)).unwrap_err();
        assert_eq!(err, FsError::InvalidArgument);
    }

    #[test]
    fn identities_increase() {
        let store = Store::mount(StoreConfig::default()).unwrap();
        assert_eq!(store.next_ino(), Ino(2));
        assert_eq!(store.next_ino(), Ino(3));
    }

    #[test]
    fn release_without_handle_is_rejected() {
        let store = Store::mount(StoreConfig::default()).unwrap();
        assert_eq!(store.release(store.root()), Err(FsError::InvalidArgument));
    }

    #[test]
    fn materialize_then_release_root_keeps_it() {
        let store = Store::mount(StoreConfig::default()).unwrap();
        let root = store.root();
        store.materialize(root).unwrap();
        store.release(root).unwrap();
        assert!(store.exists(root));
    }

    #[test]
    fn statfs_reports_magic_and_counts() {
        let store = Store::mount(StoreConfig::default()).unwrap();
        let stat = store.statfs();
        assert_eq!(stat.magic, VTFS_MAGIC);
        assert_eq!(stat.entries, 1);
        assert_eq!(stat.bytes_allocated, 0);
        assert_eq!(stat.name_max, 255);
        assert_eq!(stat.block_size, 4096);
    }

    #[test]
    fn unmount_empty_store_frees_root() {
        let store = Store::mount(StoreConfig::default()).unwrap();
        assert_eq!(store.unmount(), 1);
    }
}
