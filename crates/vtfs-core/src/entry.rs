//! The node type of the namespace tree.

use std::sync::{Arc, Mutex};

use vtfs_types::{EntryKind, FileMode, Ino};

use crate::arena::EntryId;
use crate::content::Buffer;

/// Where a file entry's bytes live.
#[derive(Debug, Clone)]
pub(crate) enum Content {
    /// This entry owns the buffer. The mutex is the content guard.
    Owned(Arc<Mutex<Buffer>>),
    /// Hardlink: the bytes belong to another entry, which is never itself
    /// `Linked`.
    Linked(EntryId),
}

/// One named node. Linkage fields are ids into the owning arena.
#[derive(Debug)]
pub(crate) struct Entry {
    pub name: String,
    pub ino: Ino,
    pub kind: EntryKind,
    pub mode: FileMode,

    pub parent: Option<EntryId>,
    pub first_child: Option<EntryId>,
    pub next_sibling: Option<EntryId>,

    /// `None` for directories.
    pub content: Option<Content>,

    /// Namespace names resolving to this identity. Maintained on directories
    /// and on content owners; a hardlink entry defers to its owner's count.
    pub nlink: u32,

    /// In a parent's child chain, or the mounted root.
    pub attached: bool,
    /// Live hardlink entries whose content owner is this entry.
    pub link_refs: u32,
    /// Outstanding host handles.
    pub handles: u32,
}

impl Entry {
    /// Fresh, unlinked entry. Files start out owning an empty buffer.
    pub fn new(name: String, kind: EntryKind, mode: FileMode) -> Self {
        let (content, nlink) = match kind {
            EntryKind::Directory => (None, 2),
            EntryKind::File => (
                Some(Content::Owned(Arc::new(Mutex::new(Buffer::new())))),
                1,
            ),
        };
        Self {
            name,
            ino: Ino(0),
            kind,
            mode: mode.with_kind(kind),
            parent: None,
            first_child: None,
            next_sibling: None,
            content,
            nlink,
            attached: false,
            link_refs: 0,
            handles: 0,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Content owner of a hardlink entry, `None` for everything else.
    pub fn link_target(&self) -> Option<EntryId> {
        match self.content {
            Some(Content::Linked(owner)) => Some(owner),
            _ => None,
        }
    }

    pub fn owned_buffer(&self) -> Option<&Arc<Mutex<Buffer>>> {
        match &self.content {
            Some(Content::Owned(buffer)) => Some(buffer),
            _ => None,
        }
    }

    /// No tree, hardlink, or handle reference keeps this entry alive.
    pub fn is_unreferenced(&self) -> bool {
        !self.attached && self.link_refs == 0 && self.handles == 0
    }
}
