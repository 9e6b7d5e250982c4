//! Fixed-capacity circular buffer backing the raw-buffer stage.
//!
//! The conversion stage pushes PCM bytes in; the recognition engine reads
//! them out in arbitrary-sized pieces.  When the buffer is full, new data
//! **overwrites** the oldest so a stalled reader always resumes on recent
//! audio.
//!
//! # Example
//!
//! ```rust
//! use voice_assistant_core::audio::RingBuffer;
//!
//! let mut buf = RingBuffer::new(4);
//! buf.push_slice(&[1u8, 2, 3, 4, 5]); // capacity 4 → oldest dropped
//! let mut out = [0u8; 3];
//! assert_eq!(buf.read_into(&mut out), 3);
//! assert_eq!(out, [2, 3, 4]);
//! assert_eq!(buf.len(), 1);
//! ```

/// A fixed-capacity FIFO that overwrites its oldest items on overflow.
pub struct RingBuffer<T> {
    buf: Vec<T>,
    capacity: usize,
    /// Index of the oldest stored item.
    read_pos: usize,
    /// Number of valid items currently stored (≤ `capacity`).
    len: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RingBuffer capacity must be > 0");
        Self {
            buf: vec![T::default(); capacity],
            capacity,
            read_pos: 0,
            len: 0,
        }
    }

    /// Append `data`, overwriting the oldest items once full.
    ///
    /// Returns the number of items that were overwritten.
    pub fn push_slice(&mut self, data: &[T]) -> usize {
        let mut dropped = 0;
        for &item in data {
            let write_pos = (self.read_pos + self.len) % self.capacity;
            self.buf[write_pos] = item;
            if self.len < self.capacity {
                self.len += 1;
            } else {
                self.read_pos = (self.read_pos + 1) % self.capacity;
                dropped += 1;
            }
        }
        dropped
    }

    /// Move up to `out.len()` of the oldest items into `out`.
    ///
    /// Returns how many items were written; `0` when the buffer is empty.
    pub fn read_into(&mut self, out: &mut [T]) -> usize {
        let n = out.len().min(self.len);
        for slot in out.iter_mut().take(n) {
            *slot = self.buf[self.read_pos];
            self.read_pos = (self.read_pos + 1) % self.capacity;
        }
        self.len -= n;
        n
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
