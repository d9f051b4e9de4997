/// Fixed-capacity circular store.
///
/// `put` never grows the buffer: once `capacity` values have been written the
/// oldest slot is overwritten. `data()` exposes the raw backing array in slot
/// order, so callers combine it with `fill()`/`cursor()` (or use `ordered()`)
/// to read values chronologically.
///
/// No internal locking. Share it across threads behind the owner's lock.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    data: Vec<T>,
    cursor: usize,
    wrapped: bool,
}

/// Per-channel sample history.
pub type SampleRing = RingBuffer<f64>;

/// Binary state history (e.g. key/trigger states).
pub type StateRing = RingBuffer<bool>;

impl<T: Copy + Default> RingBuffer<T> {
    /// Create a buffer holding `capacity` values. `capacity` must be non-zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be non-zero");
        Self {
            data: vec![T::default(); capacity],
            cursor: 0,
            wrapped: false,
        }
    }

    pub fn put(&mut self, value: T) {
        self.data[self.cursor] = value;
        self.cursor += 1;
        if self.cursor == self.data.len() {
            self.cursor = 0;
            self.wrapped = true;
        }
    }

    /// Raw backing store, not reordered.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Capacity.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Number of valid values.
    pub fn fill(&self) -> usize {
        if self.wrapped {
            self.data.len()
        } else {
            self.cursor
        }
    }

    /// Next slot to be written.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_full(&self) -> bool {
        self.wrapped
    }

    pub fn is_empty(&self) -> bool {
        self.fill() == 0
    }

    /// Reset cursor and wrapped flag; capacity is kept.
    pub fn clear(&mut self) {
        self.cursor = 0;
        self.wrapped = false;
    }

    /// Most recently written value.
    pub fn last(&self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let idx = if self.cursor == 0 { self.data.len() - 1 } else { self.cursor - 1 };
        Some(self.data[idx])
    }

    /// Valid values, oldest first.
    pub fn ordered(&self) -> Vec<T> {
        self.latest(self.fill())
    }

    /// The newest `n` values (clamped to `fill()`), oldest first.
    pub fn latest(&self, n: usize) -> Vec<T> {
        let n = n.min(self.fill());
        let len = self.data.len();
        let start = (self.cursor + len - n) % len;
        (0..n).map(|i| self.data[(start + i) % len]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_across_wrap() {
        let mut ring = SampleRing::new(4);
        for v in 1..=6 {
            ring.put(v as f64);
        }
        assert_eq!(ring.cursor(), 2);
        assert_eq!(ring.data(), &[5.0, 6.0, 3.0, 4.0]);
        assert_eq!(ring.latest(3), vec![4.0, 5.0, 6.0]);
        assert_eq!(ring.last(), Some(6.0));
    }

    #[test]
    fn test_latest_clamps_to_fill() {
        let mut ring = SampleRing::new(8);
        ring.put(1.0);
        ring.put(2.0);
        assert_eq!(ring.latest(5), vec![1.0, 2.0]);
    }

    #[test]
    fn test_state_ring() {
        let mut ring = StateRing::new(2);
        ring.put(true);
        ring.put(false);
        ring.put(true);
        assert!(ring.is_full());
        assert_eq!(ring.ordered(), vec![false, true]);
    }
}
