//! Slot generations
//!
//! Each arena slot has a generation counter that advances whenever the
//! record stored there is freed. A [`NodeId`](crate::NodeId) remembers the
//! generation it was issued with; a mismatch means the record is gone.

/// Generation counter for an arena slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Generation(u32);

impl Generation {
    /// Generation of a freshly allocated slot
    pub const INITIAL: Self = Generation(0);

    /// Create a generation from a raw value
    #[inline]
    pub const fn new(value: u32) -> Self {
        Generation(value)
    }

    /// Get the raw value
    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Get the next generation
    ///
    /// Wraps after `u32::MAX`, so a handle kept across 2^32 recycles of the
    /// same slot would match again.
    #[inline]
    pub const fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }
}
