//! Rolling weight baseline

use std::collections::VecDeque;

/// Mean of the most recent moving-weight samples
#[derive(Debug, Clone)]
pub struct WeightBaseline {
    window: VecDeque<f64>,
    capacity: usize,
}

impl WeightBaseline {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, weight_kg: f64) {
        if self.window.len() >= self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(weight_kg);
    }

    /// Full window collected
    pub fn is_ready(&self) -> bool {
        self.capacity > 0 && self.window.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn mean(&self) -> Option<f64> {
        if self.window.is_empty() {
            return None;
        }
        Some(self.window.iter().sum::<f64>() / self.window.len() as f64)
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}
