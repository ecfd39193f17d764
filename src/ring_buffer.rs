use std::fmt;
use std::iter::FusedIterator;

/// Fixed-capacity circular store. Once full, every push silently overwrites
/// the oldest element.
#[derive(Clone)]
pub struct RingBuffer<T> {
    slots: Vec<T>,
    capacity: usize,
    write_idx: usize,
}

impl<T: fmt::Debug> fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> RingBuffer<T> {
    /// A zero capacity is bumped to one so index arithmetic stays defined.
    /// Slots are allocated as they are filled.
    #[inline]
    pub fn with_capacity(cap: usize) -> Self {
        let capacity = cap.max(1);

        Self {
            slots: Vec::new(),
            capacity,
            write_idx: 0,
        }
    }

    #[inline]
    pub fn push(&mut self, item: T) {
        if self.slots.len() < self.capacity {
            self.slots.push(item);
        } else {
            self.slots[self.write_idx] = item;
        }

        self.write_idx = (self.write_idx + 1) % self.capacity;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recently pushed element.
    #[inline]
    pub fn latest(&self) -> Option<&T> {
        match self.write_idx {
            0 => self.slots.last(),
            idx => self.slots.get(idx - 1),
        }
    }

    /// Oldest-to-newest iteration. Cheap to call repeatedly; every call
    /// starts from the oldest retained element.
    #[inline]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            buf: self,
            front: 0,
            back: self.slots.len(),
        }
    }

    #[inline]
    fn slot(&self, i: usize) -> &T {
        // until the first wrap the oldest element sits at index 0
        if self.is_full() {
            &self.slots[(self.write_idx + i) % self.capacity]
        } else {
            &self.slots[i]
        }
    }
}

impl<'a, T> IntoIterator for &'a RingBuffer<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct Iter<'a, T> {
    buf: &'a RingBuffer<T>,
    front: usize,
    back: usize,
}

impl<'a, T> Clone for Iter<'a, T> {
    fn clone(&self) -> Self {
        Self {
            buf: self.buf,
            front: self.front,
            back: self.back,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<&'a T> {
        if self.front == self.back {
            return None;
        }

        let item = self.buf.slot(self.front);
        self.front += 1;

        Some(item)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.back - self.front;
        (n, Some(n))
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    #[inline]
    fn next_back(&mut self) -> Option<&'a T> {
        if self.front == self.back {
            return None;
        }

        self.back -= 1;

        Some(self.buf.slot(self.back))
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {}
impl<'a, T> FusedIterator for Iter<'a, T> {}
