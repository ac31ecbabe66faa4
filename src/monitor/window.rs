use std::collections::VecDeque;

/// Fixed-capacity window of the most recent cycle scalars with a running sum.
#[derive(Clone, Debug, PartialEq)]
pub struct RingWindow {
    values: VecDeque<f64>,
    capacity: usize,
    sum: f64,
}

impl RingWindow {
    /// Capacity is clamped to at least 1. Storage grows as values arrive.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::new(),
            capacity,
            sum: 0.0,
        }
    }

    /// Appends `value`, evicting the oldest entry once full.
    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            if let Some(oldest) = self.values.pop_front() {
                self.sum -= oldest;
            }
        }
        self.values.push_back(value);
        self.sum += value;
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}
