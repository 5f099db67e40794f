//! Generational handle table
//!
//! Host-side resources are addressed by opaque [`Handle`]s instead of
//! references. A handle carries the slot's generation, so a handle to a
//! removed entry never resolves again, even after its slot is reused.

/// Opaque reference to an entry in a [`HandleTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    /// Pack into a single integer for crossing an API boundary
    pub fn to_bits(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    pub fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

pub struct HandleTable<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> HandleTable<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    pub fn insert(&mut self, value: T) -> Handle {
        self.len += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return Handle {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        Handle {
            index,
            generation: 0,
        }
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.take()?;
        self.len -= 1;

        // A slot whose generation would wrap is retired instead of reused
        if let Some(next) = slot.generation.checked_add(1) {
            slot.generation = next;
            self.free.push(handle.index);
        }
        Some(value)
    }

    /// Remove every entry for which `keep` returns false
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&T) -> bool,
    {
        let doomed: Vec<Handle> = self
            .iter()
            .filter(|(_, value)| !keep(*value))
            .map(|(handle, _)| handle)
            .collect();
        for handle in doomed {
            self.remove(handle);
        }
    }

    /// Remove and return every entry
    pub fn drain(&mut self) -> Vec<T> {
        let handles: Vec<Handle> = self.iter().map(|(handle, _)| handle).collect();
        handles
            .into_iter()
            .filter_map(|handle| self.remove(handle))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    Handle {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    value,
                )
            })
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_remove() {
        let mut table = HandleTable::new();
        let a = table.insert("a");
        let b = table.insert("b");

        assert_eq!(table.len(), 2);
        assert_eq!(table.get(a), Some(&"a"));
        assert_eq!(table.remove(b), Some("b"));
        assert_eq!(table.get(b), None);
        assert_eq!(table.remove(b), None);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_stale_handle_after_slot_reuse() {
        let mut table = HandleTable::new();
        let old = table.insert(1);
        table.remove(old);
        let new = table.insert(2);

        assert_eq!(old.index, new.index);
        assert_ne!(old, new);
        assert_eq!(table.get(old), None);
        assert_eq!(table.get(new), Some(&2));
        assert_eq!(table.remove(old), None);
    }

    #[test]
    fn test_bits_round_trip_preserves_generation() {
        let mut table = HandleTable::new();
        let first = table.insert(());
        table.remove(first);
        let handle = table.insert(());

        let restored = Handle::from_bits(handle.to_bits());
        assert_eq!(restored, handle);
        assert!(table.get(Handle::from_bits(first.to_bits())).is_none());
    }

    #[test]
    fn test_retain_and_drain() {
        let mut table = HandleTable::new();
        for i in 0..6 {
            table.insert(i);
        }

        table.retain(|v| v % 2 == 0);
        assert_eq!(table.len(), 3);

        let mut drained = table.drain();
        drained.sort();
        assert_eq!(drained, vec![0, 2, 4]);
        assert!(table.is_empty());
    }

    #[test]
    fn test_get_mut() {
        let mut table = HandleTable::new();
        let h = table.insert(String::from("a"));
        table.get_mut(h).unwrap().push('b');
        assert_eq!(table.get(h).map(String::as_str), Some("ab"));
    }
}
