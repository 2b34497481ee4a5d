//! Content I/O: read, write, truncate, and positioned open files.
//!
//! Every access resolves the entry to its content owner first, so reads and
//! writes through a hardlink land in the same buffer under the same guard.
//! The tree lock is dropped before the content guard is taken: transfers on
//! different files never wait on each other, and a long copy never holds up
//! structural changes.

use std::io::SeekFrom;

use vtfs_types::{EntryKind, FsError, FsResult};

use crate::arena::EntryId;
use crate::content::{UserSink, UserSource};
use crate::store::{lock_buffer, Store};

/// Where a write starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOffset {
    /// At this byte offset. Negative offsets are rejected.
    At(i64),
    /// At the current end of file, read under the content guard.
    Append,
}

/// Flags a host passes when opening an entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    /// Drop the content before returning the handle (`O_TRUNC`).
    pub truncate: bool,
    /// Every write goes to end of file (`O_APPEND`).
    pub append: bool,
}

impl OpenFlags {
    pub fn read_write() -> Self {
        Self::default()
    }

    pub fn truncate() -> Self {
        Self {
            truncate: true,
            ..Self::default()
        }
    }

    pub fn append() -> Self {
        Self {
            append: true,
            ..Self::default()
        }
    }
}

/// An open handle with a file position.
///
/// Holds a handle reference on its entry until passed to [`Store::close`].
#[derive(Debug)]
pub struct OpenFile {
    entry: EntryId,
    kind: EntryKind,
    pos: u64,
    flags: OpenFlags,
}

impl OpenFile {
    pub fn entry(&self) -> EntryId {
        self.entry
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn flags(&self) -> OpenFlags {
        self.flags
    }
}

impl Store {
    /// Copy up to `buf.len()` bytes from `offset`. Zero means end of file.
    pub fn read_at(&self, id: EntryId, offset: i64, buf: &mut [u8]) -> FsResult<usize> {
        let mut sink = buf;
        self.read_into(id, offset, &mut sink)
    }

    /// [`Store::read_at`] into a caller-side sink that may fault part way.
    pub fn read_into(&self, id: EntryId, offset: i64, sink: &mut dyn UserSink) -> FsResult<usize> {
        let content = {
            let tree = self.read_tree();
            if tree.get(id)?.is_dir() {
                return Err(FsError::IsADirectory);
            }
            if offset < 0 {
                return Err(FsError::InvalidArgument);
            }
            tree.content(id)?
        };

        let buffer = lock_buffer(&content);
        let n = buffer.read_at(offset as u64, sink)?;
        tracing::trace!(%id, offset, n, size = buffer.size(), "read");
        Ok(n)
    }

    /// Write `data` at `offset`, growing the file as needed. Returns the
    /// number of bytes written.
    pub fn write_at(&self, id: EntryId, offset: WriteOffset, data: &[u8]) -> FsResult<usize> {
        let mut src = data;
        self.write_from(id, offset, &mut src)
    }

    /// [`Store::write_at`] from a caller-side source that may fault part way.
    /// A short copy commits what arrived and reports the short count.
    pub fn write_from(
        &self,
        id: EntryId,
        offset: WriteOffset,
        src: &mut dyn UserSource,
    ) -> FsResult<usize> {
        self.write_inner(id, offset, src).map(|(_, n)| n)
    }

    /// Returns the offset the write actually started at, and the count.
    fn write_inner(
        &self,
        id: EntryId,
        offset: WriteOffset,
        src: &mut dyn UserSource,
    ) -> FsResult<(u64, usize)> {
        let content = {
            let tree = self.read_tree();
            if tree.get(id)?.is_dir() {
                return Err(FsError::IsADirectory);
            }
            tree.content(id)?
        };

        let mut buffer = lock_buffer(&content);
        let start = match offset {
            WriteOffset::At(pos) if pos < 0 => return Err(FsError::InvalidArgument),
            WriteOffset::At(pos) => pos as u64,
            WriteOffset::Append => buffer.size() as u64,
        };

        let len = src.len();
        if len == 0 {
            return Ok((start, 0));
        }

        let end = start
            .checked_add(len as u64)
            .ok_or(FsError::ValueTooLarge)?;
        if end > self.config().max_file_size {
            tracing::warn!(%id, start, len, "write past maximum file size");
            return Err(FsError::ValueTooLarge);
        }
        let start_usize = usize::try_from(start).map_err(|_| FsError::ValueTooLarge)?;

        let n = buffer.write_at(start_usize, src, self.config().min_capacity)?;
        tracing::debug!(%id, start, n, size = buffer.size(), "wrote");
        Ok((start, n))
    }

    /// Release the content buffer; size and capacity go back to zero.
    pub fn truncate(&self, id: EntryId) -> FsResult<()> {
        let content = self.read_tree().content(id)?;
        lock_buffer(&content).release();
        tracing::debug!(%id, "truncated");
        Ok(())
    }

    /// Materialize a handle and wrap it with a position at offset 0.
    pub fn open(&self, id: EntryId, flags: OpenFlags) -> FsResult<OpenFile> {
        let attr = self.materialize(id)?;
        if flags.truncate && attr.kind == EntryKind::File {
            if let Err(e) = self.truncate(id) {
                let _ = self.release(id);
                return Err(e);
            }
        }
        Ok(OpenFile {
            entry: id,
            kind: attr.kind,
            pos: 0,
            flags,
        })
    }

    /// Read at the file position and advance it.
    pub fn read(&self, file: &mut OpenFile, buf: &mut [u8]) -> FsResult<usize> {
        let offset = i64::try_from(file.pos).map_err(|_| FsError::ValueTooLarge)?;
        let n = self.read_at(file.entry, offset, buf)?;
        file.pos += n as u64;
        Ok(n)
    }

    /// Write at the file position (or at end of file for append handles)
    /// and advance it past the bytes written.
    pub fn write(&self, file: &mut OpenFile, data: &[u8]) -> FsResult<usize> {
        let offset = if file.flags.append {
            WriteOffset::Append
        } else {
            WriteOffset::At(i64::try_from(file.pos).map_err(|_| FsError::ValueTooLarge)?)
        };
        let mut src = data;
        let (start, n) = self.write_inner(file.entry, offset, &mut src)?;
        file.pos = start + n as u64;
        Ok(n)
    }

    /// Move the file position. Positions past end of file are allowed;
    /// a write there leaves a zero-filled hole.
    pub fn seek(&self, file: &mut OpenFile, to: SeekFrom) -> FsResult<u64> {
        let (base, delta) = match to {
            SeekFrom::Start(pos) => (0i128, pos as i128),
            SeekFrom::Current(delta) => (file.pos as i128, delta as i128),
            SeekFrom::End(delta) => (self.getattr(file.entry)?.size as i128, delta as i128),
        };
        let target = base + delta;
        if target < 0 || target > i64::MAX as i128 {
            return Err(FsError::InvalidArgument);
        }
        file.pos = target as u64;
        Ok(file.pos)
    }

    /// Give the handle back. The entry is freed here if this was its last
    /// reference.
    pub fn close(&self, file: OpenFile) -> FsResult<()> {
        self.release(file.entry)
    }

    /// Whole content of a file, for hosts and tests that want a snapshot.
    pub fn read_to_vec(&self, id: EntryId) -> FsResult<Vec<u8>> {
        let content = {
            let tree = self.read_tree();
            if tree.get(id)?.is_dir() {
                return Err(FsError::IsADirectory);
            }
            tree.content(id)?
        };
        let buffer = lock_buffer(&content);
        Ok(buffer.as_bytes().to_vec())
    }
}
