use std::collections::VecDeque;

/// Fixed-capacity FIFO buffer holding the most recent samples.
#[derive(Debug, Clone)]
pub struct SlidingWindow<T> {
    capacity: usize,
    samples: VecDeque<T>,
}

impl<T> SlidingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Appends a sample, evicting the oldest one first when full.
    /// Returns the evicted sample.
    pub fn push(&mut self, value: T) -> Option<T> {
        if self.capacity == 0 {
            return None;
        }
        let evicted = if self.samples.len() == self.capacity {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(value);
        evicted
    }

    pub fn latest(&self) -> Option<&T> {
        self.samples.back()
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

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.samples.iter()
    }
}

/// Latency and success windows tracked for one issuer.
#[derive(Debug, Clone)]
pub struct IssuerWindows {
    pub latency: SlidingWindow<u64>,
    pub success: SlidingWindow<bool>,
}

impl IssuerWindows {
    pub fn new(capacity: usize) -> Self {
        Self {
            latency: SlidingWindow::new(capacity),
            success: SlidingWindow::new(capacity),
        }
    }

    /// Fraction of successful samples, `None` while empty.
    pub fn success_rate(&self) -> Option<f64> {
        if self.success.is_empty() {
            return None;
        }
        let successes = self.success.iter().filter(|ok| **ok).count();
        Some(successes as f64 / self.success.len() as f64)
    }
}
