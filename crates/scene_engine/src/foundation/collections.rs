//! Specialized collection types
//!
//! `SlotAllocator` hands out small reusable integer indices with LIFO
//! free-list recycling. The scene registry uses two of them (ids and storage
//! slots) and the light tiers use one each for their fixed-capacity arrays.
//! The allocator only tracks index lifecycle; whoever stores the payload is
//! responsible for clearing it before calling `release`.

pub use slotmap::{DefaultKey, SlotMap};
use thiserror::Error;

/// Handle-based map using slot map for stable references
pub type HandleMap<T> = SlotMap<DefaultKey, T>;

/// Typed handle for type-safe asset references
pub struct TypedHandle<T> {
    key: DefaultKey,
    _phantom: std::marker::PhantomData<T>,
}

// Manual impls: derives would put bounds on `T`
impl<T> Clone for TypedHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TypedHandle<T> {}

impl<T> PartialEq for TypedHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for TypedHandle<T> {}

impl<T> std::hash::Hash for TypedHandle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<T> std::fmt::Debug for TypedHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TypedHandle").field(&self.key).finish()
    }
}

impl<T> TypedHandle<T> {
    /// Create a new typed handle from a key
    pub fn new(key: DefaultKey) -> Self {
        Self {
            key,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Get the underlying key
    pub fn key(&self) -> DefaultKey {
        self.key
    }
}

/// Errors reported by [`SlotAllocator`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    /// Fixed-capacity allocator has no free index left
    #[error("slot capacity exceeded (capacity {capacity})")]
    CapacityExceeded {
        /// Configured capacity
        capacity: u32,
    },

    /// Index was never handed out by this allocator
    #[error("slot index {index} out of range (high-water mark {high_water_mark})")]
    OutOfRange {
        /// Offending index
        index: u32,
        /// Highest index ever handed out, plus one
        high_water_mark: u32,
    },

    /// Index released twice without an acquire in between
    #[error("slot index {0} released twice")]
    DoubleRelease(u32),
}

/// Reusable index allocator with free-list recycling
///
/// `acquire` pops the most recently released index first and only grows the
/// high-water mark when the free list is empty, so memory stays bounded by
/// the peak number of simultaneously live entries.
#[derive(Debug, Clone, Default)]
pub struct SlotAllocator {
    free: Vec<u32>,
    high_water_mark: u32,
    capacity: Option<u32>,
    #[cfg(debug_assertions)]
    occupied: Vec<bool>,
}

impl SlotAllocator {
    /// Create a growable allocator
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an allocator that never hands out more than `capacity` indices
    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            capacity: Some(capacity),
            free: Vec::with_capacity(capacity as usize),
            ..Self::default()
        }
    }

    /// Hand out an index, reusing the most recently released one first
    pub fn acquire(&mut self) -> Result<u32, SlotError> {
        let index = if let Some(index) = self.free.pop() {
            index
        } else {
            if let Some(capacity) = self.capacity {
                if self.high_water_mark >= capacity {
                    return Err(SlotError::CapacityExceeded { capacity });
                }
            }
            let index = self.high_water_mark;
            self.high_water_mark += 1;
            index
        };

        #[cfg(debug_assertions)]
        {
            let slot = index as usize;
            if slot >= self.occupied.len() {
                self.occupied.resize(slot + 1, false);
            }
            self.occupied[slot] = true;
        }

        Ok(index)
    }

    /// Return an index to the free list
    ///
    /// Double releases are only detected in debug builds.
    pub fn release(&mut self, index: u32) -> Result<(), SlotError> {
        if index >= self.high_water_mark {
            return Err(SlotError::OutOfRange {
                index,
                high_water_mark: self.high_water_mark,
            });
        }

        #[cfg(debug_assertions)]
        {
            let slot = &mut self.occupied[index as usize];
            if !*slot {
                return Err(SlotError::DoubleRelease(index));
            }
            *slot = false;
        }

        self.free.push(index);
        Ok(())
    }

    /// Number of indices currently handed out
    pub fn count(&self) -> u32 {
        // free.len() <= high_water_mark always holds: every freed index was
        // handed out before and is released at most once
        self.high_water_mark - self.free.len() as u32
    }

    /// One past the highest index ever handed out
    pub fn high_water_mark(&self) -> u32 {
        self.high_water_mark
    }

    /// Number of released indices waiting for reuse
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Fixed capacity, `None` for growable allocators
    pub fn capacity(&self) -> Option<u32> {
        self.capacity
    }

    /// Whether the next `acquire` would fail
    pub fn is_full(&self) -> bool {
        self.free.is_empty() && self.capacity.is_some_and(|cap| self.high_water_mark >= cap)
    }

    /// Whether `index` is currently handed out (debug builds only track this)
    #[cfg(debug_assertions)]
    pub fn is_occupied(&self, index: u32) -> bool {
        self.occupied.get(index as usize).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_tracks_acquires_minus_releases() {
        let mut slots = SlotAllocator::new();
        let acquired: Vec<u32> = (0..10).map(|_| slots.acquire().unwrap()).collect();
        assert_eq!(acquired, (0..10).collect::<Vec<_>>());

        for index in [2, 5, 7] {
            slots.release(index).unwrap();
        }
        assert_eq!(slots.count(), 7);
        assert_eq!(slots.high_water_mark(), 10);
        assert_eq!(slots.free_count(), 3);
    }

    #[test]
    fn test_release_is_reused_lifo_before_growth() {
        let mut slots = SlotAllocator::new();
        for _ in 0..4 {
            slots.acquire().unwrap();
        }
        slots.release(1).unwrap();
        slots.release(3).unwrap();

        assert_eq!(slots.acquire().unwrap(), 3);
        assert_eq!(slots.acquire().unwrap(), 1);
        assert_eq!(slots.acquire().unwrap(), 4);
        assert_eq!(slots.high_water_mark(), 5);
    }

    #[test]
    fn test_fixed_capacity_rejects_when_full() {
        let mut slots = SlotAllocator::with_capacity(2);
        slots.acquire().unwrap();
        slots.acquire().unwrap();
        assert!(slots.is_full());
        assert_eq!(slots.acquire(), Err(SlotError::CapacityExceeded { capacity: 2 }));
        assert_eq!(slots.count(), 2);

        slots.release(0).unwrap();
        assert!(!slots.is_full());
        assert_eq!(slots.acquire().unwrap(), 0);
    }

    #[test]
    fn test_release_out_of_range() {
        let mut slots = SlotAllocator::new();
        assert!(matches!(slots.release(0), Err(SlotError::OutOfRange { .. })));
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_double_release_detected() {
        let mut slots = SlotAllocator::new();
        let index = slots.acquire().unwrap();
        slots.release(index).unwrap();
        assert_eq!(slots.release(index), Err(SlotError::DoubleRelease(index)));
        assert_eq!(slots.count(), 0);
        assert!(!slots.is_occupied(index));
    }

    #[test]
    fn test_churn_stays_within_high_water_mark() {
        let mut slots = SlotAllocator::with_capacity(8);
        let mut live = Vec::new();
        for round in 0..100u32 {
            if live.len() < 8 && round % 3 != 2 {
                live.push(slots.acquire().unwrap());
            } else if let Some(index) = live.pop() {
                slots.release(index).unwrap();
            }
            assert_eq!(slots.count() as usize, live.len());
        }
        assert!(slots.high_water_mark() <= 8);
    }
}
