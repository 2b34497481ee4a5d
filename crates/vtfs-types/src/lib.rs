//! vtfs-types: data types shared between the vtfs store and its hosts.
//!
//! Nothing in here owns memory in the tree; these are the values that cross
//! the boundary: error codes, entry kinds, mode words, listing records and
//! attribute snapshots.

mod entry;
mod error;
mod mode;

pub use entry::{Attr, DirEntry, EntryKind, Ino, StatFs};
pub use error::{errno, FsError, FsResult};
pub use mode::FileMode;
