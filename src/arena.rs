use std::{cell::Cell, mem};

use bumpalo::Bump;

pub const DEFAULT_CAPACITY: usize = 8 * 1024 * 1024; // 8 MiB

const ALIGNMENT: usize = 8;

/// A fixed-capacity bump arena.
///
/// Every AST node, identifier and IR name of one compilation lives here. The
/// capacity is a hard ceiling: a request that would cross it fails with
/// [`Error::Exhausted`] instead of growing the buffer. Memory is released
/// once, in bulk, when the arena is dropped.
///
/// Only `Copy` values may be placed in the arena since destructors of
/// arena-allocated values never run.
pub struct Arena {
    bump: Bump,
    used: Cell<usize>,
    capacity: usize,
}

impl Arena {
    /// Creates an arena that grows on demand, never past `capacity`.
    pub fn with_capacity(capacity: usize) -> Arena {
        Arena {
            bump: Bump::new(),
            used: Cell::new(0),
            capacity,
        }
    }

    /// Creates an arena whose whole buffer is reserved up front.
    pub fn try_with_capacity(capacity: usize) -> Result<Arena, Error> {
        let bump = Bump::try_with_capacity(capacity).map_err(|_| Error::Reserve { capacity })?;
        Ok(Arena {
            bump,
            used: Cell::new(0),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of bytes handed out so far, counting alignment padding.
    pub fn used(&self) -> usize {
        self.used.get()
    }

    pub fn alloc<T: Copy>(&self, value: T) -> Result<&T, Error> {
        self.reserve(mem::size_of::<T>())?;
        Ok(self.bump.alloc(value))
    }

    pub fn alloc_str(&self, value: &str) -> Result<&str, Error> {
        self.reserve(value.len())?;
        Ok(self.bump.alloc_str(value))
    }

    pub fn alloc_slice<T: Copy>(&self, items: &[T]) -> Result<&[T], Error> {
        self.reserve(mem::size_of_val(items))?;
        Ok(self.bump.alloc_slice_copy(items))
    }

    /// Accounts for `size` bytes, rounded up to the arena alignment.
    fn reserve(&self, size: usize) -> Result<(), Error> {
        let used = self.used.get();
        let exhausted = Error::Exhausted {
            requested: size,
            capacity: self.capacity,
        };
        let rounded = size
            .checked_add(ALIGNMENT - 1)
            .map(|size| size & !(ALIGNMENT - 1))
            .ok_or(exhausted)?;
        match used.checked_add(rounded) {
            Some(total) if total <= self.capacity => {
                self.used.set(total);
                Ok(())
            }
            _ => Err(exhausted),
        }
    }
}

impl Default for Arena {
    fn default() -> Self {
        Arena::with_capacity(DEFAULT_CAPACITY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("arena exhausted: requested {requested} bytes of a {capacity} byte arena")]
    Exhausted { requested: usize, capacity: usize },
    #[error("could not reserve a {capacity} byte arena")]
    Reserve { capacity: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rounds_up_to_alignment() {
        let arena = Arena::with_capacity(64);
        assert_eq!(*arena.alloc(7u8).unwrap(), 7);
        assert_eq!(arena.used(), 8);
        assert_eq!(arena.alloc_str("hello world").unwrap(), "hello world");
        assert_eq!(arena.used(), 24);
        assert_eq!(arena.alloc_slice(&[1u64, 2, 3]).unwrap(), &[1, 2, 3]);
        assert_eq!(arena.used(), 48);
    }

    #[test]
    fn exact_fit_succeeds() {
        let arena = Arena::with_capacity(16);
        arena.alloc(1u64).unwrap();
        arena.alloc(2u64).unwrap();
        assert_eq!(arena.used(), arena.capacity());
    }

    #[test]
    fn allocating_past_capacity_fails() {
        let arena = Arena::with_capacity(16);
        arena.alloc([0u8; 12]).unwrap();
        assert_eq!(
            arena.alloc(0u64),
            Err(Error::Exhausted {
                requested: 8,
                capacity: 16
            })
        );
        // A failed request does not consume anything.
        assert_eq!(arena.used(), 16);
        assert!(arena.alloc_str("x").is_err());
    }

    #[test]
    fn huge_request_does_not_overflow() {
        let arena = Arena::with_capacity(16);
        assert!(arena.reserve(usize::MAX).is_err());
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn reserving_up_front() {
        let arena = Arena::try_with_capacity(64).unwrap();
        assert_eq!(arena.capacity(), 64);
        arena.alloc([0u64; 8]).unwrap();
        assert!(arena.alloc(0u8).is_err());

        assert_eq!(
            Arena::try_with_capacity(usize::MAX).err(),
            Some(Error::Reserve {
                capacity: usize::MAX
            })
        );
    }

    #[test]
    fn zero_sized_requests_are_free() {
        let arena = Arena::with_capacity(8);
        arena.alloc_str("").unwrap();
        arena.alloc(()).unwrap();
        assert_eq!(arena.used(), 0);
    }
}
