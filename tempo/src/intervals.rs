//! History of measured tap intervals and their average.

use core::fmt;

use heapless::Deque;

use crate::configuration::MAX_TAP_VALUES;

/// Fixed-capacity ring of the most recent intervals.
///
/// The storage is allocated statically for `MAX_TAP_VALUES`, while the number
/// of intervals actually kept can be lowered at runtime. Once full, writing
/// a new interval drops the oldest one.
pub(crate) struct Intervals {
    buffer: Deque<u32, MAX_TAP_VALUES>,
    capacity: usize,
}

impl fmt::Debug for Intervals {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(
            fmt,
            "Intervals(len: {}, capacity: {})",
            self.buffer.len(),
            self.capacity
        )
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Intervals {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "Intervals(len: {}, capacity: {})",
            self.buffer.len(),
            self.capacity
        );
    }
}

impl Intervals {
    /// Capacity must be within `2..=MAX_TAP_VALUES`, it is clamped otherwise.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Deque::new(),
            capacity: capacity.clamp(2, MAX_TAP_VALUES),
        }
    }

    pub fn push(&mut self, duration_ms: u32) {
        while self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        // There is always a free slot after trimming above.
        let _ = self.buffer.push_back(duration_ms);
    }

    /// Rounded mean of the stored intervals, `fallback` if there are none.
    pub fn average(&self, fallback: u32) -> u32 {
        let len = self.buffer.len() as u64;
        if len == 0 {
            return fallback;
        }
        let sum: u64 = self.buffer.iter().map(|x| u64::from(*x)).sum();
        ((sum + len / 2) / len) as u32
    }

    /// Change the number of intervals kept, dropping the oldest ones if they
    /// no longer fit.
    ///
    /// Returns `false` and keeps the capacity if it is out of the allowed
    /// range.
    pub fn set_capacity(&mut self, capacity: usize) -> bool {
        if !(2..=MAX_TAP_VALUES).contains(&capacity) {
            return false;
        }
        self.capacity = capacity;
        while self.buffer.len() > self.capacity {
            self.buffer.pop_front();
        }
        true
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate stored intervals from the oldest to the newest.
    pub fn iter(&self) -> impl Iterator<Item = &u32> {
        self.buffer.iter()
    }
}
