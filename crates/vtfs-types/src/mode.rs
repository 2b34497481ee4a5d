//! Mode bits.
//!
//! The store keeps these opaque apart from the file-type nibble, which it
//! fills in when a caller hands over bare permission bits.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::EntryKind;

/// POSIX mode word: file-type bits plus permission bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileMode(pub u32);

impl FileMode {
    pub const S_IFMT: u32 = 0o170000;
    pub const S_IFDIR: u32 = 0o040000;
    pub const S_IFREG: u32 = 0o100000;
    pub const PERM_MASK: u32 = 0o7777;

    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    /// Type nibble, zero when the caller supplied permissions only.
    pub fn file_type(self) -> u32 {
        self.0 & Self::S_IFMT
    }

    pub fn permissions(self) -> u32 {
        self.0 & Self::PERM_MASK
    }

    pub fn is_dir(self) -> bool {
        self.file_type() == Self::S_IFDIR
    }

    pub fn is_file(self) -> bool {
        self.file_type() == Self::S_IFREG
    }

    /// Add the type bits for `kind` if none are present yet.
    pub fn with_kind(self, kind: EntryKind) -> Self {
        if self.file_type() != 0 {
            return self;
        }
        let type_bits = match kind {
            EntryKind::Directory => Self::S_IFDIR,
            EntryKind::File => Self::S_IFREG,
        };
        Self(self.0 | type_bits)
    }
}

impl From<u32> for FileMode {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

impl fmt::Display for FileMode {
    /// `ls -l` style rendering, e.g. `drwxr-xr-x`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_dir() {
            'd'
        } else if self.is_file() {
            '-'
        } else {
            '?'
        };
        let perms = self.permissions();
        let mut out = String::with_capacity(10);
        out.push(kind);
        for shift in [6u32, 3, 0] {
            let triple = (perms >> shift) & 0o7;
            out.push(if triple & 0o4 != 0 { 'r' } else { '-' });
            out.push(if triple & 0o2 != 0 { 'w' } else { '-' });
            out.push(if triple & 0o1 != 0 { 'x' } else { '-' });
        }
        f.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_kind_fills_missing_type() {
        let mode = FileMode::new(0o644).with_kind(EntryKind::File);
        assert!(mode.is_file());
        assert_eq!(mode.permissions(), 0o644);

        let mode = FileMode::new(0o755).with_kind(EntryKind::Directory);
        assert!(mode.is_dir());
    }

    #[test]
    fn with_kind_keeps_existing_type() {
        let mode = FileMode::new(FileMode::S_IFDIR | 0o700).with_kind(EntryKind::File);
        assert!(mode.is_dir());
    }

    #[test]
    fn display_like_ls() {
        assert_eq!(FileMode::new(FileMode::S_IFDIR | 0o755).to_string(), "drwxr-xr-x");
        assert_eq!(FileMode::new(FileMode::S_IFREG | 0o640).to_string(), "-rw-r-----");
    }
}
