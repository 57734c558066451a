//! Rolling sample history
//!
//! Fixed-capacity FIFO window of numeric samples, one per metric per unit.
//! Once filled, a buffer holds exactly `capacity` samples for the rest of its
//! life: every push evicts the oldest sample.

use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::VecDeque;
use thiserror::Error;

pub use crate::config::defaults::HISTORY_CAPACITY;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SampleError {
    #[error("Invalid sample: {0} is not a finite number")]
    InvalidSample(f64),

    #[error("History needs exactly {expected} samples, got {got}")]
    WrongLength { expected: usize, got: usize },
}

/// Fixed-capacity FIFO window of finite samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RingBuffer {
    capacity: usize,
    samples: VecDeque<f64>,
}

impl RingBuffer {
    /// An empty buffer. It fills up as samples are pushed.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// A buffer initialized with exactly `capacity` samples, oldest first.
    pub fn filled(
        capacity: usize,
        samples: impl IntoIterator<Item = f64>,
    ) -> Result<Self, SampleError> {
        let samples: VecDeque<f64> = samples.into_iter().collect();
        if samples.len() != capacity {
            return Err(SampleError::WrongLength {
                expected: capacity,
                got: samples.len(),
            });
        }
        if let Some(&bad) = samples.iter().find(|v| !v.is_finite()) {
            return Err(SampleError::InvalidSample(bad));
        }
        Ok(Self { capacity, samples })
    }

    /// Append one sample, evicting the oldest when full.
    ///
    /// Non-finite values are rejected and leave the buffer untouched. A
    /// zero-capacity buffer accepts finite samples and stays empty.
    pub fn push(&mut self, value: f64) -> Result<(), SampleError> {
        if !value.is_finite() {
            return Err(SampleError::InvalidSample(value));
        }
        if self.capacity == 0 {
            return Ok(());
        }
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
        Ok(())
    }

    /// Samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Newest sample.
    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    pub fn mean(&self) -> Option<f64> {
        (!self.is_empty()).then(|| self.samples.iter().mean())
    }

    pub fn min(&self) -> Option<f64> {
        (!self.is_empty()).then(|| Statistics::min(self.samples.iter()))
    }

    pub fn max(&self) -> Option<f64> {
        (!self.is_empty()).then(|| Statistics::max(self.samples.iter()))
    }
}
