//! Growable per-file byte buffers.
//!
//! A [`Buffer`] keeps its logical `size` apart from its allocated `capacity`.
//! The whole allocation is always initialized: growth zero-fills the new
//! region, so sparse holes read back as zeros without extra bookkeeping.
//! Capacity only changes in whole doublings of the store's minimum unit, and
//! only shrinks through [`Buffer::release`].
//!
//! Transfers to and from the caller go through [`UserSource`] and
//! [`UserSink`], which may stop short to model a fault in the caller's
//! memory. A short transfer commits the prefix that made it across; only a
//! transfer that moved nothing is reported as [`FsError::Fault`].

use vtfs_types::{FsError, FsResult};

/// Default growth unit: one page.
pub const PAGE_SIZE: usize = 4096;

/// Caller-side bytes to be written into a buffer.
pub trait UserSource {
    /// Number of bytes the caller asked to transfer.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy a prefix of the source into `dst` (exactly `len()` bytes long)
    /// and return how many bytes were copied. Bytes of `dst` past the
    /// returned count must be left untouched.
    fn copy_into(&mut self, dst: &mut [u8]) -> usize;
}

/// Caller-side destination for bytes read out of a buffer.
pub trait UserSink {
    /// Room available in the destination.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy a prefix of `src` into the destination and return how many bytes
    /// made it.
    fn copy_from(&mut self, src: &[u8]) -> usize;
}

impl UserSource for &[u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn copy_into(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(<[u8]>::len(self));
        dst[..n].copy_from_slice(&self[..n]);
        n
    }
}

impl UserSink for &mut [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn copy_from(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(<[u8]>::len(self));
        self[..n].copy_from_slice(&src[..n]);
        n
    }
}

/// Capacity needed to hold `end` bytes, doubling from `current` (or from
/// `min_unit` when nothing is allocated yet).
///
/// Fails with `OutOfMemory` when another doubling would overflow `usize`.
pub fn grown_capacity(current: usize, end: usize, min_unit: usize) -> FsResult<usize> {
    let mut capacity = if current == 0 { min_unit } else { current };
    while capacity < end {
        if capacity > usize::MAX / 2 {
            return Err(FsError::OutOfMemory);
        }
        capacity *= 2;
    }
    Ok(capacity)
}

/// Content of one content-owning file entry.
#[derive(Debug, Default)]
pub struct Buffer {
    /// Allocation; `data.len()` is the capacity and every byte is initialized.
    data: Vec<u8>,
    size: usize,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn is_allocated(&self) -> bool {
        !self.data.is_empty()
    }

    /// The live bytes, `0..size`.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.size]
    }

    /// Copy up to `sink.len()` bytes starting at `offset`. Returns 0 at or
    /// past end of file.
    pub fn read_at(&self, offset: u64, sink: &mut dyn UserSink) -> FsResult<usize> {
        let Ok(offset) = usize::try_from(offset) else {
            return Ok(0);
        };
        if !self.is_allocated() || offset >= self.size {
            return Ok(0);
        }

        let to_copy = sink.len().min(self.size - offset);
        if to_copy == 0 {
            return Ok(0);
        }

        let copied = sink.copy_from(&self.data[offset..offset + to_copy]);
        if copied == 0 {
            tracing::warn!(offset, to_copy, "read: copy to caller faulted");
            return Err(FsError::Fault);
        }
        if copied < to_copy {
            tracing::warn!(offset, copied, to_copy, "read: short copy to caller");
        }
        Ok(copied)
    }

    /// Copy `src` in at `offset`, growing as needed. A hole between the old
    /// size and `offset` reads back as zeros.
    ///
    /// On a growth failure the buffer is left exactly as it was.
    pub fn write_at(
        &mut self,
        offset: usize,
        src: &mut dyn UserSource,
        min_unit: usize,
    ) -> FsResult<usize> {
        let len = src.len();
        if len == 0 {
            return Ok(0);
        }
        let end = offset.checked_add(len).ok_or(FsError::ValueTooLarge)?;

        if end > self.capacity() {
            self.grow(end, min_unit)?;
        }

        // Bytes past `size` are always zero, so a hole needs no fill.
        debug_assert!(
            offset <= self.size || self.data[self.size..offset].iter().all(|&b| b == 0),
            "bytes past size must be zero"
        );

        let copied = src.copy_into(&mut self.data[offset..end]).min(len);
        if copied == 0 {
            tracing::warn!(offset, len, "write: copy from caller faulted");
            return Err(FsError::Fault);
        }
        if copied < len {
            tracing::warn!(offset, copied, len, "write: short copy from caller");
        }

        self.size = self.size.max(offset + copied);
        Ok(copied)
    }

    /// Drop the allocation and reset to empty.
    pub fn release(&mut self) {
        self.data = Vec::new();
        self.size = 0;
    }

    fn grow(&mut self, end: usize, min_unit: usize) -> FsResult<()> {
        let old = self.capacity();
        let new = grown_capacity(old, end, min_unit)?;
        self.data
            .try_reserve_exact(new - old)
            .map_err(|_| FsError::OutOfMemory)?;
        self.data.resize(new, 0);
        tracing::debug!(old_capacity = old, new_capacity = new, "grew content buffer");
        Ok(())
    }
}
