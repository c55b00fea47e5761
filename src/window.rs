//! Fixed-capacity rolling windows
//!
//! Every buffer in the pipeline (EAR history, yaw/pitch history) is a FIFO
//! that drops its oldest sample once capacity is reached. Consumers use
//! [`RollingWindow::is_full`] as their own "ready to analyze" gate.

use serde::Serialize;
use std::collections::VecDeque;

/// Storage reserved up front; larger buffers grow as they fill
pub const PREALLOCATED_SAMPLES: usize = 1024;

/// Fixed-capacity FIFO buffer
#[derive(Debug, Clone, Serialize)]
pub struct RollingWindow<T> {
    values: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    /// Create an empty window holding at most `capacity` values.
    ///
    /// A capacity of zero is bumped to one so the window can still report full.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity.min(PREALLOCATED_SAMPLES)),
            capacity,
        }
    }

    /// Append a value, evicting the oldest one if the window overflows
    pub fn push(&mut self, value: T) {
        self.values.push_back(value);
        while self.values.len() > self.capacity {
            self.values.pop_front();
        }
    }

    pub fn is_full(&self) -> bool {
        self.values.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest-first iterator over the window contents
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator + '_ {
        self.values.iter()
    }

    /// Most recently pushed value
    pub fn latest(&self) -> Option<&T> {
        self.values.back()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl<T: Clone> RollingWindow<T> {
    /// Copy the contents out, oldest first
    pub fn to_vec(&self) -> Vec<T> {
        self.values.iter().cloned().collect()
    }
}

impl RollingWindow<f64> {
    /// Arithmetic mean of the window, `None` when empty
    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    /// Population standard deviation around the window mean
    pub fn std_dev(&self) -> Option<f64> {
        let mean = self.mean()?;
        let variance = self
            .values
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / self.values.len() as f64;
        Some(variance.sqrt())
    }

    /// Number of consecutive pairs whose absolute difference exceeds `threshold`
    pub fn count_jumps(&self, threshold: f64) -> usize {
        self.values
            .iter()
            .zip(self.values.iter().skip(1))
            .filter(|(prev, next)| (*next - *prev).abs() > threshold)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_drops_oldest_on_overflow() {
        let mut window = RollingWindow::new(3);
        for v in 1..=5 {
            window.push(v);
        }

        assert_eq!(window.len(), 3);
        assert_eq!(window.to_vec(), vec![3, 4, 5]);
        assert_eq!(window.latest(), Some(&5));
    }

    #[test]
    fn test_is_full_gate() {
        let mut window = RollingWindow::new(2);
        assert!(!window.is_full());
        window.push(1.0);
        assert!(!window.is_full());
        window.push(2.0);
        assert!(window.is_full());
        window.push(3.0);
        assert!(window.is_full());
    }

    #[test]
    fn test_zero_capacity_is_bumped() {
        let mut window = RollingWindow::new(0);
        window.push('a');
        window.push('b');
        assert_eq!(window.capacity(), 1);
        assert_eq!(window.to_vec(), vec!['b']);
    }

    #[test]
    fn test_huge_capacity_does_not_allocate_up_front() {
        let mut window = RollingWindow::new(usize::MAX);
        window.push(1.0);
        assert_eq!(window.capacity(), usize::MAX);
        assert!(!window.is_full());
    }

    #[test]
    fn test_statistics() {
        let mut window = RollingWindow::new(4);
        for v in [2.0, 4.0, 4.0, 6.0] {
            window.push(v);
        }

        assert!((window.mean().unwrap() - 4.0).abs() < 1e-12);
        assert!((window.std_dev().unwrap() - 2.0_f64.sqrt()).abs() < 1e-12);
        assert!(RollingWindow::<f64>::new(3).std_dev().is_none());
    }

    #[test]
    fn test_count_jumps() {
        let mut window = RollingWindow::new(5);
        for v in [0.0, 11.0, 12.0, -5.0, -5.0] {
            window.push(v);
        }
        // 0 -> 11 and 12 -> -5 exceed 10 degrees
        assert_eq!(window.count_jumps(10.0), 2);
    }
}
