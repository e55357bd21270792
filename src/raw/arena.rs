use core::num::NonZero;

use crate::error::{Error, Result};

/// Index of a live slot in an [`Arena`].
///
/// Stored as `index + 1` so that `Option<Handle>` costs nothing extra.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(transparent)]
pub(crate) struct Handle(NonZero<u32>);

impl Handle {
    pub(crate) const MAX: usize = (u32::MAX - 1) as usize;

    #[inline]
    pub(crate) const fn from_index(index: usize) -> Self {
        assert!(index <= Self::MAX, "`Handle::from_index()` - `index` > `Handle::MAX`!");
        #[allow(clippy::cast_possible_truncation)]
        match NonZero::new((index + 1) as u32) {
            Some(raw) => Self(raw),
            None => unreachable!(),
        }
    }

    #[inline]
    pub(crate) const fn to_index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

/// Slot storage for tree nodes. Freed slots are recycled before the slot
/// vector grows.
pub(crate) struct Arena<T> {
    slots: Vec<Option<T>>,
    free: Vec<Handle>,
}

impl<T> Arena<T> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Number of live elements.
    pub(crate) fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Makes room for `additional` more elements, so that the next
    /// `additional` calls to [`Arena::alloc`] neither reallocate nor run out
    /// of handles.
    pub(crate) fn try_reserve(&mut self, additional: usize) -> Result<()> {
        let grow = additional.saturating_sub(self.free.len());
        if self.slots.len().saturating_add(grow) > Handle::MAX + 1 {
            return Err(Error::AllocationFailure { what: "node handles" });
        }
        self.slots
            .try_reserve(grow)
            .map_err(|_| Error::AllocationFailure { what: "arena slots" })
    }

    pub(crate) fn alloc(&mut self, element: T) -> Handle {
        if let Some(h) = self.free.pop() {
            self.slots[h.to_index()] = Some(element);
            h
        } else {
            assert!(
                self.slots.len() <= Handle::MAX,
                "`Arena::alloc()` - arena is at maximum capacity ({})",
                Handle::MAX
            );
            self.slots.push(Some(element));
            Handle::from_index(self.slots.len() - 1)
        }
    }

    #[inline]
    pub(crate) fn get(&self, handle: Handle) -> &T {
        self.slots[handle.to_index()].as_ref().expect("`Arena::get()` - `handle` is invalid!")
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, handle: Handle) -> &mut T {
        self.slots[handle.to_index()].as_mut().expect("`Arena::get_mut()` - `handle` is invalid!")
    }

    /// Removes an element, returning it and recycling its slot.
    pub(crate) fn take(&mut self, handle: Handle) -> T {
        let element = self.slots[handle.to_index()].take().expect("`Arena::take()` - `handle` is invalid!");
        self.free.push(handle);
        element
    }

    pub(crate) fn free(&mut self, handle: Handle) {
        drop(self.take(handle));
    }

    /// Moves the only live element to the first slot and gives back the
    /// storage held by every other slot. Handles other than the returned one
    /// are invalidated.
    pub(crate) fn retain_only(&mut self, handle: Handle) -> Handle {
        debug_assert_eq!(self.len(), 1, "`Arena::retain_only()` - other elements are live");
        let element = self.take(handle);
        self.slots.truncate(1);
        self.slots[0] = Some(element);
        self.free.clear();
        self.slots.shrink_to_fit();
        self.free.shrink_to_fit();
        Handle::from_index(0)
    }

    /// Number of slots, live or free.
    #[cfg(test)]
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }
}
