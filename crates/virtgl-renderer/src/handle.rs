use std::fmt;
use std::num::NonZeroU32;

/// Guest-visible identifier of a context, surface, color buffer or image.
///
/// On the wire a handle is a plain `u32` where `0` means "no object". The
/// numeric value carries no meaning beyond uniqueness among live objects.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Handle(NonZeroU32);

impl Handle {
    /// Returns `None` for the wire sentinel `0`.
    #[inline]
    pub const fn new(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Wire encoding of an optional handle.
    #[inline]
    pub fn to_wire(handle: Option<Handle>) -> u32 {
        handle.map_or(0, Handle::get)
    }
}

impl From<Handle> for u64 {
    #[inline]
    fn from(h: Handle) -> u64 {
        u64::from(h.get())
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.get())
    }
}

/// Monotonic handle generator.
///
/// The counter wraps; zero and any value reported as taken are skipped. Must
/// only be driven while the renderer lock is held.
#[derive(Debug, Default)]
pub(crate) struct HandleAllocator {
    next: u32,
}

impl HandleAllocator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn starting_at(next: u32) -> Self {
        Self { next }
    }

    pub(crate) fn allocate(&mut self, mut is_taken: impl FnMut(Handle) -> bool) -> Handle {
        loop {
            self.next = self.next.wrapping_add(1);
            let Some(handle) = Handle::new(self.next) else {
                continue;
            };
            if !is_taken(handle) {
                return handle;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn zero_is_not_a_handle() {
        assert!(Handle::new(0).is_none());
        assert_eq!(Handle::to_wire(None), 0);
        assert_eq!(Handle::to_wire(Handle::new(7)), 7);
    }

    #[test]
    fn allocations_are_nonzero_and_distinct() {
        let mut alloc = HandleAllocator::new();
        let mut live = FxHashSet::default();
        for _ in 0..1000 {
            let h = alloc.allocate(|h| live.contains(&h));
            assert!(live.insert(h), "duplicate handle {h}");
        }
    }

    #[test]
    fn wraparound_skips_zero() {
        let mut alloc = HandleAllocator::starting_at(u32::MAX - 1);
        assert_eq!(alloc.allocate(|_| false).get(), u32::MAX);
        assert_eq!(alloc.allocate(|_| false).get(), 1);
    }

    #[test]
    fn wraparound_skips_live_handles() {
        let mut alloc = HandleAllocator::starting_at(u32::MAX);
        let live: FxHashSet<Handle> = [1, 2, 4].into_iter().filter_map(Handle::new).collect();
        assert_eq!(alloc.allocate(|h| live.contains(&h)).get(), 3);
        assert_eq!(alloc.allocate(|h| live.contains(&h)).get(), 5);
    }
}
