use std::collections::VecDeque;

use serde_json::Value;

use crate::status::AlivePoll;

/// Bounded history of total-hashrate samples taken from alive polls.
///
/// Only readings that parse as finite, non-negative numbers are kept. A
/// poll without a usable reading leaves the history untouched; it is never
/// recorded as zero. When full, the oldest sample is evicted.
#[derive(Debug, Clone)]
pub struct HashrateHistory {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl HashrateHistory {
    /// Creates an empty history holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// History starting from two zero samples, so a chart has a baseline
    /// before the first real reading arrives.
    pub fn seeded(capacity: usize) -> Self {
        let mut history = Self::new(capacity);
        history.push(0.0);
        history.push(0.0);
        history
    }

    /// Samples the 10-second total from `poll`; returns the value if kept.
    pub fn sample(&mut self, poll: &AlivePoll) -> Option<f64> {
        let reading = poll.status.as_ref()?.hashrate.total.first()?;
        let value = parse_sample(reading)?;
        self.push(value);
        Some(value)
    }

    fn push(&mut self, value: f64) {
        if self.capacity == 0 {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    /// Samples, oldest first.
    pub fn samples(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }
}

/// Reads a hashrate reported either as a JSON number or a numeric string.
pub fn parse_sample(reading: &Value) -> Option<f64> {
    let value = match reading {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    (value.is_finite() && value >= 0.0).then_some(value)
}
