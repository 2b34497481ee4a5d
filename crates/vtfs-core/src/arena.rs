//! Slot arena backing the entry tree.
//!
//! Entries never hold owning pointers to each other. Every cross-reference
//! (parent, first child, next sibling, content owner) is an [`EntryId`]: a slot
//! index plus the generation the slot had when the entry was placed in it.
//! Freeing a slot bumps its generation, so an id that outlived its entry
//! resolves to `NotFound` instead of aliasing whatever reuses the slot.

use std::fmt;

use vtfs_types::{FsError, FsResult};

use crate::entry::Entry;

/// Generation-checked handle to an entry in a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId {
    index: u32,
    generation: u32,
}

impl EntryId {
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

#[derive(Debug, Default)]
pub(crate) struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place `entry` in a free slot, growing the slot table if needed.
    pub fn insert(&mut self, entry: Entry) -> FsResult<EntryId> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            self.live += 1;
            return Ok(EntryId {
                index,
                generation: slot.generation,
            });
        }

        let index = u32::try_from(self.slots.len()).map_err(|_| FsError::OutOfMemory)?;
        self.slots
            .try_reserve(1)
            .map_err(|_| FsError::OutOfMemory)?;
        self.slots.push(Slot {
            generation: 0,
            entry: Some(entry),
        });
        self.live += 1;
        Ok(EntryId {
            index,
            generation: 0,
        })
    }

    pub fn get(&self, id: EntryId) -> FsResult<&Entry> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
            .ok_or(FsError::NotFound)
    }

    pub fn get_mut(&mut self, id: EntryId) -> FsResult<&mut Entry> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_mut())
            .ok_or(FsError::NotFound)
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.get(id).is_ok()
    }

    /// Take the entry out and retire `id`.
    pub fn remove(&mut self, id: EntryId) -> Option<Entry> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(entry)
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn ids(&self) -> Vec<EntryId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.entry.is_some())
            .map(|(index, slot)| EntryId {
                index: index as u32,
                generation: slot.generation,
            })
            .collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.slots.iter().filter_map(|slot| slot.entry.as_ref())
    }
}
