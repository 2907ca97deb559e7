//! Fixed-capacity sliding window over incoming samples.

use std::collections::VecDeque;

use eeg_types::Sample;

/// The most recent `capacity` samples, oldest first.
///
/// Once full, every admission evicts exactly the oldest sample. Channel shape
/// is not checked here; callers reject malformed samples before admitting them.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl SampleBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn admit(&mut self, sample: Sample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current contents in arrival order. The borrow keeps the window frozen
    /// for as long as the caller holds the slice.
    pub fn snapshot_contents(&mut self) -> &[Sample] {
        self.samples.make_contiguous()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }
}
