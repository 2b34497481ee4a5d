//! Namespace operations: create, mkdir, unlink, rmdir, link.
//!
//! `create_file` and `link` do not check for an existing sibling with the
//! same name; only `make_directory` does. Hosts that need exclusive creation
//! look the name up first, under their per-directory serialization.

use vtfs_types::{EntryKind, FileMode, FsError, FsResult};

use crate::arena::EntryId;
use crate::entry::Content;
use crate::store::Store;
use crate::tree::Tree;

impl Store {
    /// Find the child of `parent` called `name`.
    pub fn lookup(&self, parent: EntryId, name: &str) -> FsResult<EntryId> {
        self.read_tree().lookup(parent, name)
    }

    /// Create an empty regular file under `parent`.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn create_file(&self, parent: EntryId, name: &str, mode: FileMode) -> FsResult<EntryId> {
        self.validate_name(name)?;
        let mut tree = self.write_tree();
        require_dir(&tree, parent)?;

        let id = tree.allocate(name, EntryKind::File, mode)?;
        let ino = self.next_ino();
        tree.get_mut(id)?.ino = ino;
        tree.insert_child(parent, id)?;

        tracing::debug!(%id, %ino, "created file");
        Ok(id)
    }

    /// Create a directory under `parent`; `AlreadyExists` if the name is
    /// taken. The new directory's `..` adds a link to `parent`.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn make_directory(&self, parent: EntryId, name: &str, mode: FileMode) -> FsResult<EntryId> {
        self.validate_name(name)?;
        let mut tree = self.write_tree();
        require_dir(&tree, parent)?;

        match tree.lookup(parent, name) {
            Ok(_) => return Err(FsError::AlreadyExists),
            Err(FsError::NotFound) => {}
            Err(e) => return Err(e),
        }

        let id = tree.allocate(name, EntryKind::Directory, mode)?;
        let ino = self.next_ino();
        tree.get_mut(id)?.ino = ino;
        tree.insert_child(parent, id)?;
        tree.get_mut(parent)?.nlink += 1;

        tracing::debug!(%id, %ino, "created directory");
        Ok(id)
    }

    /// Unlink a file (or hardlink) entry from `parent`.
    ///
    /// The entry's memory goes away once nothing else references it: open
    /// handles and, for a content owner, hardlinks elsewhere in the tree keep
    /// it alive.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn remove_file(&self, parent: EntryId, entry: EntryId) -> FsResult<()> {
        let mut tree = self.write_tree();
        let owner = {
            let e = tree.get(entry)?;
            if e.is_dir() {
                return Err(FsError::IsADirectory);
            }
            e.link_target().unwrap_or(entry)
        };

        tree.detach_child(parent, entry)?;
        if let Ok(owner) = tree.get_mut(owner) {
            owner.nlink = owner.nlink.saturating_sub(1);
        }
        tree.release_if_unreferenced(entry);
        Ok(())
    }

    /// Remove an empty directory from `parent`.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn remove_directory(&self, parent: EntryId, entry: EntryId) -> FsResult<()> {
        let mut tree = self.write_tree();
        {
            let e = tree.get(entry)?;
            if !e.is_dir() {
                return Err(FsError::NotADirectory);
            }
            if e.first_child.is_some() {
                return Err(FsError::NotEmpty);
            }
        }

        tree.detach_child(parent, entry)?;
        tree.get_mut(entry)?.nlink = 0;
        let dir = tree.get_mut(parent)?;
        dir.nlink = dir.nlink.saturating_sub(1);
        tree.release_if_unreferenced(entry);
        Ok(())
    }

    /// Add a hardlink to `source` named `new_name` under `parent`.
    ///
    /// The new entry shares `source`'s identity and mode and points at its
    /// content owner; linking through an existing hardlink resolves to the
    /// owner, so link chains never grow past one level.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn link(&self, source: EntryId, parent: EntryId, new_name: &str) -> FsResult<EntryId> {
        let mut tree = self.write_tree();
        let (ino, mode, owner) = {
            let src = tree.get(source)?;
            if src.is_dir() {
                return Err(FsError::IsADirectory);
            }
            (src.ino, src.mode, src.link_target().unwrap_or(source))
        };
        if tree.get(owner)?.nlink == 0 {
            return Err(FsError::NotFound);
        }
        self.validate_name(new_name)?;
        require_dir(&tree, parent)?;

        let id = tree.allocate(new_name, EntryKind::File, mode)?;
        {
            let entry = tree.get_mut(id)?;
            entry.ino = ino;
            entry.nlink = 0;
            entry.content = Some(Content::Linked(owner));
        }
        {
            let owner = tree.get_mut(owner)?;
            owner.link_refs += 1;
            owner.nlink += 1;
        }
        tree.insert_child(parent, id)?;

        tracing::debug!(%id, %ino, %owner, "created hardlink");
        Ok(id)
    }

    fn validate_name(&self, name: &str) -> FsResult<()> {
        if name.is_empty() || name == "." || name == ".." {
            return Err(FsError::InvalidArgument);
        }
        if name.contains('/') || name.contains('\0') {
            return Err(FsError::InvalidArgument);
        }
        if name.len() > self.config().name_max {
            return Err(FsError::NameTooLong);
        }
        Ok(())
    }
}

/// `id` must be a directory still in the tree. A removed directory kept
/// alive by a handle takes no new children.
fn require_dir(tree: &Tree, id: EntryId) -> FsResult<()> {
    let dir = tree.get(id)?;
    if !dir.is_dir() {
        return Err(FsError::NotADirectory);
    }
    if !dir.attached {
        return Err(FsError::NotFound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use vtfs_types::Ino;

    fn store() -> Store {
        Store::mount(StoreConfig::default()).unwrap()
    }

    const MODE: FileMode = FileMode::new(0o644);

    #[test]
    fn create_file_assigns_next_identity() {
        let s = store();
        let root = s.root();
        let a = s.create_file(root, "a", MODE).unwrap();
        let b = s.create_file(root, "b", MODE).unwrap();
        assert_eq!(s.getattr(a).unwrap().ino, Ino(2));
        assert_eq!(s.getattr(b).unwrap().ino, Ino(3));
        assert!(s.getattr(a).unwrap().mode.is_file());
        assert_eq!(s.lookup(root, "a").unwrap(), a);
    }

    #[test]
    fn create_file_allows_duplicate_names() {
        let s = store();
        let root = s.root();
        let first = s.create_file(root, "same", MODE).unwrap();
        let second = s.create_file(root, "same", MODE).unwrap();
        assert_ne!(first, second);
        assert_eq!(s.lookup(root, "same").unwrap(), second);
    }

    #[test]
    fn create_under_file_is_not_a_directory() {
        let s = store();
        let f = s.create_file(s.root(), "f", MODE).unwrap();
        assert_eq!(s.create_file(f, "x", MODE), Err(FsError::NotADirectory));
        assert_eq!(s.make_directory(f, "x", MODE), Err(FsError::NotADirectory));
    }

    #[test]
    fn invalid_names_rejected() {
        let s = store();
        let root = s.root();
        for name in ["", ".", "..", "a/b", "nul\0"] {
            assert_eq!(s.create_file(root, name, MODE), Err(FsError::InvalidArgument), "{name:?}");
        }
        let long = "x".repeat(256);
        assert_eq!(s.make_directory(root, &long, MODE), Err(FsError::NameTooLong));
        assert!(s.make_directory(root, &"x".repeat(255), MODE).is_ok());
    }

    #[test]
    fn mkdir_bumps_parent_nlink() {
        let s = store();
        let root = s.root();
        let d = s.make_directory(root, "d", MODE).unwrap();
        assert_eq!(s.getattr(root).unwrap().nlink, 3);
        assert_eq!(s.getattr(d).unwrap().nlink, 2);
        assert!(s.getattr(d).unwrap().mode.is_dir());
    }

    #[test]
    fn mkdir_existing_name_fails() {
        let s = store();
        let root = s.root();
        s.create_file(root, "taken", MODE).unwrap();
        assert_eq!(s.make_directory(root, "taken", MODE), Err(FsError::AlreadyExists));
        assert_eq!(s.getattr(root).unwrap().nlink, 2);
    }

    #[test]
    fn remove_file_rejects_directory() {
        let s = store();
        let root = s.root();
        let d = s.make_directory(root, "d", MODE).unwrap();
        assert_eq!(s.remove_file(root, d), Err(FsError::IsADirectory));
        assert_eq!(s.lookup(root, "d").unwrap(), d);
    }

    #[test]
    fn remove_file_frees_unreferenced_entry() {
        let s = store();
        let root = s.root();
        let f = s.create_file(root, "f", MODE).unwrap();
        s.remove_file(root, f).unwrap();
        assert!(!s.exists(f));
        assert_eq!(s.lookup(root, "f"), Err(FsError::NotFound));
        assert_eq!(s.remove_file(root, f), Err(FsError::NotFound));
    }

    #[test]
    fn remove_file_with_open_handle_defers_free() {
        let s = store();
        let root = s.root();
        let f = s.create_file(root, "f", MODE).unwrap();
        s.materialize(f).unwrap();
        s.remove_file(root, f).unwrap();
        assert!(s.exists(f));
        assert_eq!(s.getattr(f).unwrap().nlink, 0);
        s.release(f).unwrap();
        assert!(!s.exists(f));
    }

    #[test]
    fn rmdir_checks_kind_and_emptiness() {
        let s = store();
        let root = s.root();
        let d = s.make_directory(root, "d", MODE).unwrap();
        let f = s.create_file(d, "f", MODE).unwrap();

        assert_eq!(s.remove_directory(d, f), Err(FsError::NotADirectory));
        assert_eq!(s.remove_directory(root, d), Err(FsError::NotEmpty));
        assert_eq!(s.lookup(d, "f").unwrap(), f);

        s.remove_file(d, f).unwrap();
        s.remove_directory(root, d).unwrap();
        assert_eq!(s.getattr(root).unwrap().nlink, 2);
        assert_eq!(s.remove_directory(root, d), Err(FsError::NotFound));
    }

    #[test]
    fn rmdir_root_is_not_found() {
        let s = store();
        let root = s.root();
        assert_eq!(s.remove_directory(root, root), Err(FsError::NotFound));
        assert!(s.exists(root));
    }

    #[test]
    fn link_shares_identity_and_counts() {
        let s = store();
        let root = s.root();
        let f = s.create_file(root, "f", MODE).unwrap();
        let l = s.link(f, root, "l").unwrap();

        let fa = s.getattr(f).unwrap();
        let la = s.getattr(l).unwrap();
        assert_eq!(fa.ino, la.ino);
        assert_eq!(fa.mode, la.mode);
        assert_eq!(fa.nlink, 2);
        assert_eq!(la.nlink, 2);
        assert!(s.is_hardlink(l).unwrap());
        assert!(!s.is_hardlink(f).unwrap());
    }

    #[test]
    fn link_through_link_resolves_to_owner() {
        let s = store();
        let root = s.root();
        let f = s.create_file(root, "f", MODE).unwrap();
        let l1 = s.link(f, root, "l1").unwrap();
        let l2 = s.link(l1, root, "l2").unwrap();
        let tree = s.read_tree();
        assert_eq!(tree.get(l2).unwrap().link_target(), Some(f));
        assert_eq!(tree.get(f).unwrap().link_refs, 2);
        assert_eq!(tree.get(f).unwrap().nlink, 3);
    }

    #[test]
    fn link_to_directory_fails() {
        let s = store();
        let root = s.root();
        let d = s.make_directory(root, "d", MODE).unwrap();
        assert_eq!(s.link(d, root, "alias"), Err(FsError::IsADirectory));
        assert_eq!(s.lookup(root, "alias"), Err(FsError::NotFound));
    }

    #[test]
    fn owner_outlives_its_name_while_linked() {
        let s = store();
        let root = s.root();
        let f = s.create_file(root, "f", MODE).unwrap();
        let l = s.link(f, root, "l").unwrap();

        s.remove_file(root, f).unwrap();
        assert!(s.exists(f), "owner must stay while a hardlink refers to it");
        assert_eq!(s.getattr(l).unwrap().nlink, 1);

        s.remove_file(root, l).unwrap();
        assert!(!s.exists(l));
        assert!(!s.exists(f));
    }

    #[test]
    fn removed_directory_takes_no_new_children() {
        let s = store();
        let root = s.root();
        let d = s.make_directory(root, "d", MODE).unwrap();
        let f = s.create_file(root, "f", MODE).unwrap();
        s.materialize(d).unwrap();
        s.remove_directory(root, d).unwrap();

        assert_eq!(s.create_file(d, "x", MODE), Err(FsError::NotFound));
        assert_eq!(s.make_directory(d, "y", MODE), Err(FsError::NotFound));
        assert_eq!(s.link(f, d, "z"), Err(FsError::NotFound));
        assert_eq!(s.list(d).unwrap().len(), 2);

        s.release(d).unwrap();
        assert!(!s.exists(d));
        // Root and `f` only.
        assert_eq!(s.statfs().entries, 2);
        assert_eq!(s.getattr(f).unwrap().nlink, 1);
    }

    #[test]
    fn link_to_unlinked_file_is_not_found() {
        let s = store();
        let root = s.root();
        let f = s.create_file(root, "f", MODE).unwrap();
        s.materialize(f).unwrap();
        s.remove_file(root, f).unwrap();

        assert_eq!(s.link(f, root, "back"), Err(FsError::NotFound));
        assert_eq!(s.lookup(root, "back"), Err(FsError::NotFound));
        assert_eq!(s.statfs().entries, 2);

        s.release(f).unwrap();
        assert!(!s.exists(f));
    }
}
