//! Store configuration.

use serde::{Deserialize, Serialize};
use vtfs_types::{FsError, FsResult};

use crate::content::PAGE_SIZE;

/// Longest entry name accepted by default, in bytes.
pub const NAME_MAX: usize = 255;

/// Largest end offset a write may reach by default (the LFS limit).
pub const MAX_FILE_SIZE: u64 = i64::MAX as u64;

/// Configuration for mounting a [`Store`](crate::Store).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Growth unit for content buffers. Capacities are always this times a
    /// power of two. Must itself be a power of two.
    pub min_capacity: usize,
    /// Writes that would end past this offset fail with `ValueTooLarge`.
    pub max_file_size: u64,
    /// Longest accepted entry name, in bytes.
    pub name_max: usize,
    /// Permission bits of the root directory.
    pub root_mode: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            min_capacity: PAGE_SIZE,
            max_file_size: MAX_FILE_SIZE,
            name_max: NAME_MAX,
            root_mode: 0o777,
        }
    }
}

impl StoreConfig {
    /// Tiny growth unit so tests can observe several doublings cheaply.
    pub fn small_pages() -> Self {
        Self {
            min_capacity: 16,
            ..Self::default()
        }
    }

    /// Builder-style override of the growth unit.
    pub fn with_min_capacity(mut self, min_capacity: usize) -> Self {
        self.min_capacity = min_capacity;
        self
    }

    /// Builder-style override of the size limit.
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn validate(&self) -> FsResult<()> {
        if !self.min_capacity.is_power_of_two() {
            return Err(FsError::InvalidArgument);
        }
        if self.name_max == 0 {
            return Err(FsError::InvalidArgument);
        }
        Ok(())
    }
}
