//! Recycling pool for short-lived feedback objects.
//!
//! Entries live in an arena and are addressed by [`PoolHandle`]. Inactive
//! entries sit on a free-list; `acquire` pops from it and only constructs a
//! new entry when the list is empty. The pool never shrinks.

use std::fmt;

/// Index of an entry inside an [`EphemeralPool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolHandle(usize);

impl PoolHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PoolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
struct Slot<T> {
    value: T,
    active: bool,
}

pub struct EphemeralPool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<PoolHandle>,
    factory: Box<dyn FnMut() -> T + Send + Sync>,
}

impl<T> EphemeralPool<T> {
    /// Build a pool pre-warmed with `initial_size` inactive entries
    pub fn new(initial_size: usize, factory: impl FnMut() -> T + Send + Sync + 'static) -> Self {
        let mut pool = Self {
            slots: Vec::with_capacity(initial_size),
            free: Vec::with_capacity(initial_size),
            factory: Box::new(factory),
        };
        pool.prewarm(initial_size);
        pool
    }

    /// Construct `count` more inactive entries
    pub fn prewarm(&mut self, count: usize) {
        for _ in 0..count {
            let handle = self.construct();
            self.free.push(handle);
        }
    }

    fn construct(&mut self) -> PoolHandle {
        let handle = PoolHandle(self.slots.len());
        self.slots.push(Slot {
            value: (self.factory)(),
            active: false,
        });
        handle
    }

    /// Check out an entry. Reuses an inactive one if any, otherwise grows.
    pub fn acquire(&mut self) -> PoolHandle {
        let handle = match self.free.pop() {
            Some(handle) => handle,
            None => {
                tracing::debug!("pool exhausted at {} entries, growing", self.slots.len());
                self.construct()
            }
        };
        self.slots[handle.0].active = true;
        handle
    }

    /// Return an entry to the free-list.
    ///
    /// Releasing an inactive or foreign handle is ignored and reported, so a
    /// double release can never put the same entry on the free-list twice.
    pub fn release(&mut self, handle: PoolHandle) -> bool {
        match self.slots.get_mut(handle.0) {
            Some(slot) if slot.active => {
                slot.active = false;
                self.free.push(handle);
                true
            }
            Some(_) => {
                tracing::warn!("pool entry {} released twice", handle);
                false
            }
            None => {
                tracing::warn!("pool entry {} does not belong to this pool", handle);
                false
            }
        }
    }

    pub fn is_active(&self, handle: PoolHandle) -> bool {
        self.slots.get(handle.0).is_some_and(|s| s.active)
    }

    /// Borrow an active entry
    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        self.slots
            .get(handle.0)
            .filter(|s| s.active)
            .map(|s| &s.value)
    }

    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.0)
            .filter(|s| s.active)
            .map(|s| &mut s.value)
    }

    pub fn iter_active(&self) -> impl Iterator<Item = (PoolHandle, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.active)
            .map(|(i, s)| (PoolHandle(i), &s.value))
    }

    pub fn iter_active_mut(&mut self) -> impl Iterator<Item = (PoolHandle, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter(|(_, s)| s.active)
            .map(|(i, s)| (PoolHandle(i), &mut s.value))
    }

    /// Total entries ever constructed
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn idle_count(&self) -> usize {
        self.free.len()
    }
}

impl<T: fmt::Debug> fmt::Debug for EphemeralPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralPool")
            .field("capacity", &self.capacity())
            .field("active", &self.active_count())
            .finish()
    }
}
