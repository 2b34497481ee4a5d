//! Entry metadata as seen from outside the store.

use serde::{Deserialize, Serialize};

use crate::FileMode;

/// Identity of an entry, the file-serial-number a host reports as `st_ino`.
///
/// Hardlinks share the identity of the entry they were created from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ino(pub u64);

impl std::fmt::Display for Ino {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of entry. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Directory,
    File,
}

impl EntryKind {
    /// `d_type` value a host reports for directory listings.
    pub fn dtype(self) -> u8 {
        match self {
            EntryKind::Directory => DirEntry::DT_DIR,
            EntryKind::File => DirEntry::DT_REG,
        }
    }
}

/// One record produced by directory enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Name within the directory (`.` and `..` for the synthetic records).
    pub name: String,
    /// Identity the name resolves to.
    pub ino: Ino,
    pub kind: EntryKind,
    /// Cursor value that resumes enumeration right after this record.
    pub next: u64,
}

impl DirEntry {
    pub const DT_DIR: u8 = 4;
    pub const DT_REG: u8 = 8;
}

/// Metadata handed to the host when it materializes a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attr {
    pub ino: Ino,
    pub kind: EntryKind,
    pub mode: FileMode,
    /// Content length in bytes; zero for directories.
    pub size: u64,
    pub nlink: u32,
    /// Allocated content in 512-byte units, as `st_blocks` counts.
    pub blocks: u64,
}

/// Store-wide statistics, the `statfs` answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatFs {
    pub magic: u32,
    pub block_size: u64,
    pub name_max: usize,
    /// Live entries, including detached ones still pinned by references.
    pub entries: u64,
    /// Sum of allocated content capacity across all content owners.
    pub bytes_allocated: u64,
}
