//! Arena-style resource tables keyed by [`Handle`].
//!
//! Every entry carries an explicit reference count. Only color buffers are
//! ever retained past 1; contexts, surfaces and images are removed outright.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{RendererError, ResourceKind, Result};
use crate::handle::Handle;
use crate::host::HostImage;

#[derive(Debug)]
struct Entry<T> {
    value: T,
    refcount: u32,
}

/// Outcome of dropping one reference.
#[derive(Debug)]
pub(crate) enum Release<T> {
    /// Handle was not live.
    Missing,
    /// Entry survives with the given count.
    Retained(u32),
    /// Count reached zero; the entry was erased.
    Removed(T),
}

#[derive(Debug)]
pub(crate) struct ResourceTable<T> {
    kind: ResourceKind,
    entries: FxHashMap<Handle, Entry<T>>,
}

impl<T> ResourceTable<T> {
    pub(crate) fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            entries: FxHashMap::default(),
        }
    }

    #[inline]
    pub(crate) fn contains(&self, handle: Handle) -> bool {
        self.entries.contains_key(&handle)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Looks up a live entry; unknown handles are `NotFound`.
    pub(crate) fn get(&self, handle: Handle) -> Result<&T> {
        self.entries
            .get(&handle)
            .map(|e| &e.value)
            .ok_or_else(|| RendererError::not_found(self.kind, handle))
    }

    pub(crate) fn get_mut(&mut self, handle: Handle) -> Result<&mut T> {
        let kind = self.kind;
        self.entries
            .get_mut(&handle)
            .map(|e| &mut e.value)
            .ok_or_else(|| RendererError::not_found(kind, handle))
    }

    /// Same as [`get`](Self::get) but for an optional wire handle.
    pub(crate) fn resolve(&self, handle: Option<Handle>) -> Result<(Handle, &T)> {
        let handle = handle.ok_or_else(|| RendererError::not_found(self.kind, 0u32))?;
        Ok((handle, self.get(handle)?))
    }

    /// Inserts a fresh entry with a reference count of 1.
    pub(crate) fn insert(&mut self, handle: Handle, value: T) {
        let prev = self.entries.insert(handle, Entry { value, refcount: 1 });
        debug_assert!(prev.is_none(), "{} {handle} inserted twice", self.kind);
    }

    pub(crate) fn retain(&mut self, handle: Handle) -> Result<u32> {
        let kind = self.kind;
        let entry = self
            .entries
            .get_mut(&handle)
            .ok_or_else(|| RendererError::not_found(kind, handle))?;
        entry.refcount += 1;
        Ok(entry.refcount)
    }

    pub(crate) fn release(&mut self, handle: Handle) -> Release<T> {
        let Some(entry) = self.entries.get_mut(&handle) else {
            return Release::Missing;
        };
        entry.refcount -= 1;
        if entry.refcount > 0 {
            return Release::Retained(entry.refcount);
        }
        match self.entries.remove(&handle) {
            Some(e) => Release::Removed(e.value),
            None => Release::Missing,
        }
    }

    /// Erases an entry regardless of its reference count.
    pub(crate) fn remove(&mut self, handle: Handle) -> Option<T> {
        self.entries.remove(&handle).map(|e| e.value)
    }

    pub(crate) fn refcount(&self, handle: Handle) -> Option<u32> {
        self.entries.get(&handle).map(|e| e.refcount)
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Window surface plus the color buffer currently attached to it.
///
/// `color_buffer` is a back-reference for drain bookkeeping only; attaching
/// does not take a reference.
pub(crate) struct WindowEntry<S> {
    pub(crate) surface: Arc<S>,
    pub(crate) color_buffer: Option<Handle>,
}

pub(crate) type ContextTable<C> = ResourceTable<Arc<C>>;
pub(crate) type WindowTable<S> = ResourceTable<WindowEntry<S>>;
pub(crate) type ColorBufferTable<CB> = ResourceTable<Arc<CB>>;
pub(crate) type ImageTable = ResourceTable<HostImage>;

#[cfg(test)]
mod tests {
    use super::*;

    fn h(raw: u32) -> Handle {
        Handle::new(raw).unwrap()
    }

    #[test]
    fn insert_starts_at_one_reference() {
        let mut t = ResourceTable::new(ResourceKind::ColorBuffer);
        t.insert(h(1), "pixels");
        assert_eq!(t.refcount(h(1)), Some(1));
        assert_eq!(*t.get(h(1)).unwrap(), "pixels");
    }

    #[test]
    fn release_erases_exactly_at_zero() {
        let mut t = ResourceTable::new(ResourceKind::ColorBuffer);
        t.insert(h(3), 30);
        t.retain(h(3)).unwrap();
        t.retain(h(3)).unwrap();

        assert!(matches!(t.release(h(3)), Release::Retained(2)));
        assert!(matches!(t.release(h(3)), Release::Retained(1)));
        assert!(matches!(t.release(h(3)), Release::Removed(30)));
        assert!(t.get(h(3)).unwrap_err().is_not_found());
        assert!(matches!(t.release(h(3)), Release::Missing));
    }

    #[test]
    fn retain_unknown_is_not_found() {
        let mut t: ResourceTable<()> = ResourceTable::new(ResourceKind::ColorBuffer);
        let err = t.retain(h(9)).unwrap_err();
        assert_eq!(
            err,
            RendererError::NotFound { kind: ResourceKind::ColorBuffer, handle: 9 }
        );
    }

    #[test]
    fn resolve_rejects_the_zero_sentinel() {
        let mut t = ResourceTable::new(ResourceKind::WindowSurface);
        t.insert(h(4), ());
        assert!(t.resolve(None).unwrap_err().is_not_found());
        assert_eq!(t.resolve(Some(h(4))).unwrap().0, h(4));
    }

    #[test]
    fn remove_ignores_refcount() {
        let mut t = ResourceTable::new(ResourceKind::Context);
        t.insert(h(2), 'c');
        t.retain(h(2)).unwrap();
        assert_eq!(t.remove(h(2)), Some('c'));
        assert_eq!(t.len(), 0);
    }
}
