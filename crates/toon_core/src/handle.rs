//! Generational handles
//!
//! A [`Handle<T>`] names a slot plus the generation the slot had when the
//! handle was issued. Freeing a slot bumps its generation, so handles that
//! outlive their resource are detected instead of silently aliasing a newer
//! one. Handles are plain data (`Send + Sync` regardless of `T`) and can be
//! handed to worker threads.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use alloc::vec::Vec;

/// A type-tagged reference to an entry of kind `T`
#[repr(transparent)]
pub struct Handle<T> {
    /// Lower 32 bits: slot index, upper 32 bits: generation
    bits: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    const NULL_BITS: u64 = u64::MAX;

    /// Create a handle from a slot index and generation
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self {
            bits: (generation as u64) << 32 | index as u64,
            _marker: PhantomData,
        }
    }

    /// The null handle, never issued by a map
    #[inline]
    pub const fn null() -> Self {
        Self {
            bits: Self::NULL_BITS,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub const fn is_null(&self) -> bool {
        self.bits == Self::NULL_BITS
    }

    #[inline]
    pub const fn index(&self) -> u32 {
        self.bits as u32
    }

    #[inline]
    pub const fn generation(&self) -> u32 {
        (self.bits >> 32) as u32
    }

    /// Raw bits, stable across runs for the same allocation order
    #[inline]
    pub const fn to_bits(&self) -> u64 {
        self.bits
    }

    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            bits,
            _marker: PhantomData,
        }
    }
}

// Manual impls so that `T` needs no bounds
impl<T> Clone for Handle<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl<T> Eq for Handle<T> {}

impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.bits.cmp(&other.bits)
    }
}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits.hash(state);
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full = core::any::type_name::<T>();
        let short = full.rsplit("::").next().unwrap_or(full);
        if self.is_null() {
            write!(f, "Handle<{}>(null)", short)
        } else {
            write!(f, "Handle<{}>({}v{})", short, self.index(), self.generation())
        }
    }
}

#[derive(Debug)]
struct Slot<V> {
    generation: u32,
    value: Option<V>,
}

/// Dense storage addressed by generational handles
///
/// The key type `K` is only a tag: a `HandleMap<K, V>` hands out
/// `Handle<K>` so callers can name entries by their domain type while the
/// map stores some bookkeeping value `V`.
#[derive(Debug)]
pub struct HandleMap<K, V = K> {
    slots: Vec<Slot<V>>,
    free_slots: Vec<u32>,
    len: usize,
    _marker: PhantomData<fn() -> K>,
}

impl<K, V> HandleMap<K, V> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_slots: Vec::new(),
            len: 0,
            _marker: PhantomData,
        }
    }

    /// Store a value and return the handle naming it
    pub fn insert(&mut self, value: V) -> Handle<K> {
        self.len += 1;
        if let Some(index) = self.free_slots.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return Handle::new(index, slot.generation);
        }

        let index = self.slots.len();
        assert!(index < u32::MAX as usize, "handle slots exhausted");
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        Handle::new(index as u32, 0)
    }

    /// Remove the value named by `handle`; `None` if the handle is stale
    pub fn remove(&mut self, handle: Handle<K>) -> Option<V> {
        let slot = self.slot_mut(handle)?;
        let value = slot.value.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(handle.index());
        self.len -= 1;
        value
    }

    pub fn get(&self, handle: Handle<K>) -> Option<&V> {
        if handle.is_null() {
            return None;
        }
        let slot = self.slots.get(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn get_mut(&mut self, handle: Handle<K>) -> Option<&mut V> {
        self.slot_mut(handle)?.value.as_mut()
    }

    pub fn contains(&self, handle: Handle<K>) -> bool {
        self.get(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate live entries in slot order
    pub fn iter(&self) -> impl Iterator<Item = (Handle<K>, &V)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (Handle::new(index as u32, slot.generation), value))
        })
    }

    /// Drop every entry; previously issued handles become stale
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free_slots.push(index as u32);
            }
        }
        self.len = 0;
    }

    fn slot_mut(&mut self, handle: Handle<K>) -> Option<&mut Slot<V>> {
        if handle.is_null() {
            return None;
        }
        let slot = self.slots.get_mut(handle.index() as usize)?;
        if slot.generation != handle.generation() || slot.value.is_none() {
            return None;
        }
        Some(slot)
    }
}

impl<K, V> Default for HandleMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Buffer;

    #[test]
    fn test_null_handle_is_never_valid() {
        let mut map: HandleMap<Buffer, u32> = HandleMap::new();
        map.insert(1);
        assert!(Handle::<Buffer>::null().is_null());
        assert!(!map.contains(Handle::null()));
        assert_eq!(map.get(Handle::null()), None);
        assert!(Handle::<Buffer>::default().is_null());
    }

    #[test]
    fn test_handle_map_stale_handles() {
        let mut map: HandleMap<Buffer, u32> = HandleMap::new();
        let h1 = map.insert(10);
        let h2 = map.insert(20);

        assert_eq!(map.get(h1), Some(&10));
        assert_eq!(map.remove(h1), Some(10));
        assert_eq!(map.get(h1), None);
        assert_eq!(map.remove(h1), None);

        let h3 = map.insert(30);
        assert_eq!(h3.index(), h1.index());
        assert_eq!(map.get(h1), None);
        assert_eq!(map.get(h3), Some(&30));

        *map.get_mut(h2).unwrap() += 1;
        assert_eq!(map.get(h2), Some(&21));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_handle_map_clear() {
        let mut map: HandleMap<Buffer, &str> = HandleMap::new();
        let h = map.insert("a");
        map.insert("b");
        map.clear();
        assert!(map.is_empty());
        assert!(!map.contains(h));
        assert_eq!(map.iter().count(), 0);
    }

    #[test]
    fn test_handles_are_send_and_sync() {
        struct NotSend(*const u8);
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Handle<NotSend>>();
    }
}
