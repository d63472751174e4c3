//! Bounded sliding-window sample storage.

use ndarray::Array1;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

/// Per-frame channel averages. Time is implicit: `index / frame_rate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl Sample {
    pub const fn new(red: f64, green: f64, blue: f64) -> Self {
        Self { red, green, blue }
    }

    /// Red-only sample; green and blue are left at 0.
    pub const fn red_only(red: f64) -> Self {
        Self { red, green: 0.0, blue: 0.0 }
    }

    pub fn channel(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Red => self.red,
            Channel::Green => self.green,
            Channel::Blue => self.blue,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

/// Ordered, bounded sequence of samples. Pushing past capacity evicts the
/// oldest sample.
#[derive(Debug, Clone)]
pub struct SignalBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl SignalBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: Sample) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
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

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Owned copy in temporal order.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    pub fn channel(&self, channel: Channel) -> Array1<f64> {
        self.samples.iter().map(|s| s.channel(channel)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }
}

/// Single-writer/single-reader handle shared between the sampling tick
/// and the processing tick. Readers work on snapshots, so a processing
/// pass never observes a half-written sample.
#[derive(Debug, Clone)]
pub struct SharedBuffer {
    inner: Arc<RwLock<SignalBuffer>>,
}

impl SharedBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SignalBuffer::new(capacity))),
        }
    }

    pub fn push(&self, sample: Sample) {
        self.inner.write().push(sample);
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn snapshot(&self) -> Vec<Sample> {
        self.inner.read().snapshot()
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }
}
