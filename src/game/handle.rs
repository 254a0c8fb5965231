//! Generational entity keys
//!
//! Entities refer to each other by key (or by string id), never by
//! ownership. A key carries the generation of its slot, so once an entity
//! leaves the scene every key that pointed at it stops resolving, even if
//! a later entity reuses the slot.

use std::fmt;

/// Handle to an entity owned by a [`Scene`](super::scene::Scene)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityKey {
    index: u32,
    generation: u32,
}

impl EntityKey {
    /// Key that never resolves. Entities not yet added to a scene carry it.
    pub const NULL: EntityKey = EntityKey { index: u32::MAX, generation: 0 };

    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn is_null(&self) -> bool {
        self.index == u32::MAX
    }
}

impl Default for EntityKey {
    fn default() -> Self {
        EntityKey::NULL
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "#null")
        } else {
            write!(f, "#{}v{}", self.index, self.generation)
        }
    }
}

/// Hands out keys, reusing freed slots under a bumped generation
#[derive(Debug, Default)]
pub struct KeyAllocator {
    generations: Vec<u32>,
    /// LIFO free list
    free: Vec<u32>,
    live: usize,
}

impl KeyAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> EntityKey {
        self.live += 1;

        if let Some(index) = self.free.pop() {
            let generation = self.generations.get(index as usize).copied().unwrap_or(0);
            return EntityKey::new(index, generation);
        }

        let index = self.generations.len() as u32;
        self.generations.push(0);
        EntityKey::new(index, 0)
    }

    /// Returns true if the key was live and is now released
    pub fn free(&mut self, key: EntityKey) -> bool {
        if !self.is_live(key) {
            return false;
        }
        if let Some(generation) = self.generations.get_mut(key.index as usize) {
            *generation = generation.wrapping_add(1);
        }
        self.free.push(key.index);
        self.live -= 1;
        true
    }

    pub fn is_live(&self, key: EntityKey) -> bool {
        if key.is_null() {
            return false;
        }
        self.generations.get(key.index as usize) == Some(&key.generation)
    }

    pub fn live_count(&self) -> usize {
        self.live
    }
}
