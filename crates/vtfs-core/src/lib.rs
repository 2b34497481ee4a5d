//! vtfs-core: an in-memory hierarchical file store.
//!
//! The store is a tree of named entries, directories and files, with
//! POSIX-like semantics, living entirely in heap memory:
//!
//! - **Tree**: arena-allocated entries linked by generation-checked ids
//!   (parent, first child, next sibling, content owner)
//! - **Namespace**: `create_file`, `make_directory`, `remove_file`,
//!   `remove_directory`, `link`
//! - **Content**: per-file byte buffers that grow by doubling, each behind
//!   its own mutex; hardlinks share their owner's buffer
//! - **Enumeration**: resumable listing with synthetic `.` and `..`
//!
//! A host (a VFS adapter, a FUSE daemon, the vtfs REPL) translates its
//! requests into these calls. It tells the store when it materializes a
//! handle for an entry and when it lets go of one; entries are freed once no
//! tree position, hardlink, or handle refers to them.
//!
//! ```text
//! Store
//! ├── RwLock<Tree>
//! │   └── Arena of Entry
//! │       ├── parent / first_child / next_sibling   (EntryId)
//! │       └── Content::Owned(Arc<Mutex<Buffer>>) | Content::Linked(EntryId)
//! └── AtomicU64 next identity
//! ```
//!
//! # Example
//!
//! ```
//! use vtfs_core::{FileMode, Store, StoreConfig, WriteOffset};
//!
//! let store = Store::mount(StoreConfig::default()).unwrap();
//! let root = store.root();
//! let dir = store.make_directory(root, "a", FileMode::new(0o755)).unwrap();
//! let file = store.create_file(dir, "b", FileMode::new(0o644)).unwrap();
//! store.write_at(file, WriteOffset::At(0), b"hello").unwrap();
//!
//! let alias = store.link(file, dir, "c").unwrap();
//! let mut buf = [0u8; 5];
//! store.read_at(alias, 0, &mut buf).unwrap();
//! assert_eq!(&buf, b"hello");
//! ```

mod arena;
mod config;
mod content;
mod entry;
mod io;
mod namespace;
mod readdir;
mod store;
mod tree;

pub use arena::EntryId;
pub use config::{StoreConfig, MAX_FILE_SIZE, NAME_MAX};
pub use content::{grown_capacity, Buffer, UserSink, UserSource, PAGE_SIZE};
pub use io::{OpenFile, OpenFlags, WriteOffset};
pub use readdir::{DirCursor, ReadDir};
pub use store::{Store, VTFS_MAGIC};

pub use vtfs_types::{Attr, DirEntry, EntryKind, FileMode, FsError, FsResult, Ino, StatFs};
