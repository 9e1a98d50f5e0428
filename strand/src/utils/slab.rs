/// A slot of a [`Slab`].
enum Entry<T> {
    /// Free; `generation` is the generation the next occupant gets.
    Vacant { generation: u32, next_free: Option<usize> },
    Occupied { generation: u32, value: T },
}

/// A generational slab allocator.
///
/// A `Slab` stores values of type `T` in a contiguous array and hands out
/// `u64` keys made of the slot index (low 32 bits) and the slot's generation
/// (high 32 bits). Slots are reused after removal, but every reuse bumps the
/// generation, so a key that was removed never resolves again, not even to
/// a newer value in the same slot.
///
/// # Examples
///
/// ```rust,ignore
/// let mut slab = Slab::new(4);
/// let key = slab.insert("a");
/// assert_eq!(slab.remove(key), Some("a"));
/// assert!(slab.get(key).is_none());
/// ```
pub(crate) struct Slab<T> {
    entries: Vec<Entry<T>>,

    /// Head of the free list.
    free: Option<usize>,

    len: usize,
}

impl<T> Slab<T> {
    /// Creates a new `Slab` with room for `capacity` values before growing.
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            free: None,
            len: 0,
        }
    }

    /// Inserts a value and returns its key.
    ///
    /// Keys are never equal to a key returned earlier by this slab, even
    /// after that earlier key was removed.
    ///
    /// # Panics
    ///
    /// Panics if the slab would need more than `u32::MAX` slots.
    pub(crate) fn insert(&mut self, value: T) -> u64 {
        self.len += 1;

        if let Some(index) = self.free {
            let entry = &mut self.entries[index];

            if let Entry::Vacant {
                generation,
                next_free,
            } = *entry
            {
                self.free = next_free;
                *entry = Entry::Occupied { generation, value };

                return key(index, generation);
            }
        }

        let index = self.entries.len();
        assert!(index < u32::MAX as usize, "slab is full");

        self.entries.push(Entry::Occupied {
            generation: 0,
            value,
        });

        key(index, 0)
    }

    /// Removes and returns the value stored under `key`.
    ///
    /// Returns `None` for stale or unknown keys.
    pub(crate) fn remove(&mut self, key: u64) -> Option<T> {
        let (index, generation) = split(key);

        match self.entries.get(index) {
            Some(Entry::Occupied { generation: g, .. }) if *g == generation => {}
            _ => return None,
        }

        let vacant = Entry::Vacant {
            // Retire the slot instead of wrapping back to a live generation.
            generation: generation.wrapping_add(1),
            next_free: if generation == u32::MAX { None } else { self.free },
        };

        if generation != u32::MAX {
            self.free = Some(index);
        }
        self.len -= 1;

        match std::mem::replace(&mut self.entries[index], vacant) {
            Entry::Occupied { value, .. } => Some(value),
            Entry::Vacant { .. } => None,
        }
    }

    /// Returns a reference to the value stored under `key`, if it is still
    /// present.
    pub(crate) fn get(&self, key: u64) -> Option<&T> {
        let (index, generation) = split(key);

        match self.entries.get(index) {
            Some(Entry::Occupied {
                generation: g,
                value,
            }) if *g == generation => Some(value),
            _ => None,
        }
    }

    /// Number of values currently stored.
    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

fn key(index: usize, generation: u32) -> u64 {
    (u64::from(generation) << 32) | index as u64
}

fn split(key: u64) -> (usize, u32) {
    ((key & u64::from(u32::MAX)) as usize, (key >> 32) as u32)
}
