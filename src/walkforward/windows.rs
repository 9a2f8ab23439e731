//! Walk-forward window scheduling.
//!
//! Partitions a shared sample index of length `n` into ordered,
//! non-overlapping train/test window pairs. The plan is pure and lazy;
//! materialize it for deterministic assertions in tests.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("invalid window configuration: {0}")]
    InvalidConfiguration(String),
}

/// One train/test window pair, as half-open index offsets into the
/// shared sample index.
///
/// Invariant: `train_end <= test_start` (no overlap, no look-ahead).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub train_start: usize,
    pub train_end: usize,
    pub test_start: usize,
    pub test_end: usize,
}

impl Window {
    pub fn train_range(&self) -> std::ops::Range<usize> {
        self.train_start..self.train_end
    }

    pub fn test_range(&self) -> std::ops::Range<usize> {
        self.test_start..self.test_end
    }

    pub fn train_len(&self) -> usize {
        self.train_end - self.train_start
    }

    pub fn test_len(&self) -> usize {
        self.test_end - self.test_start
    }
}

/// A rolling window schedule over `n` samples.
///
/// The `k`-th scheduled window advances by `test` windows per step:
/// with `i = k*test` it trains on `[i*w, (train+i)*w)` and tests on
/// `[(train+i)*w, min((train+i+test)*w, n))`, so test slices tile
/// `[train*w, n)` without gaps or overlap for any test span. The final
/// test slice is clipped to `n` rather than dropped; iteration stops
/// once the test slice would be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowPlan {
    n: usize,
    window: usize,
    train: usize,
    test: usize,
}

impl WindowPlan {
    /// Create a plan over `n` samples with window size `window`, training
    /// span `train` windows and testing span `test` windows.
    pub fn new(n: usize, window: usize, train: usize, test: usize) -> Result<Self, WindowError> {
        if window == 0 {
            return Err(WindowError::InvalidConfiguration(
                "window size must be positive".to_string(),
            ));
        }
        if train == 0 {
            return Err(WindowError::InvalidConfiguration(
                "training span must be positive".to_string(),
            ));
        }
        if test == 0 {
            return Err(WindowError::InvalidConfiguration(
                "testing span must be positive".to_string(),
            ));
        }
        Ok(Self {
            n,
            window,
            train,
            test,
        })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// Lazy, restartable iteration over the schedule.
    pub fn iter(&self) -> WindowIter<'_> {
        WindowIter { plan: self, i: 0 }
    }

    /// Collect the full schedule.
    pub fn materialize(&self) -> Vec<Window> {
        self.iter().collect()
    }

    fn window_at(&self, k: usize) -> Option<Window> {
        let w = self.window;
        let i = k * self.test;
        let train_start = i * w;
        let train_end = (self.train + i) * w;
        if train_end >= self.n {
            return None;
        }
        let test_start = train_end;
        let test_end = ((self.train + self.test + i) * w).min(self.n);
        Some(Window {
            train_start,
            train_end,
            test_start,
            test_end,
        })
    }
}

impl<'a> IntoIterator for &'a WindowPlan {
    type Item = Window;
    type IntoIter = WindowIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`WindowPlan`].
pub struct WindowIter<'a> {
    plan: &'a WindowPlan,
    i: usize,
}

impl Iterator for WindowIter<'_> {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        let window = self.plan.window_at(self.i)?;
        self.i += 1;
        Some(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_parameters() {
        assert!(WindowPlan::new(100, 0, 3, 1).is_err());
        assert!(WindowPlan::new(100, 10, 0, 1).is_err());
        assert!(WindowPlan::new(100, 10, 3, 0).is_err());
        assert!(WindowPlan::new(100, 10, 3, 1).is_ok());
    }

    #[test]
    fn test_uniform_windows() {
        let plan = WindowPlan::new(60, 10, 3, 1).unwrap();
        let windows = plan.materialize();

        assert_eq!(windows.len(), 3);
        assert_eq!(
            windows[0],
            Window {
                train_start: 0,
                train_end: 30,
                test_start: 30,
                test_end: 40,
            }
        );
        assert_eq!(
            windows[2],
            Window {
                train_start: 20,
                train_end: 50,
                test_start: 50,
                test_end: 60,
            }
        );
    }

    #[test]
    fn test_final_window_clipped_not_dropped() {
        let plan = WindowPlan::new(55, 10, 3, 1).unwrap();
        let windows = plan.materialize();

        let last = windows.last().unwrap();
        assert_eq!(last.test_end, 55);
        assert!(last.test_len() < 10);
    }

    #[test]
    fn test_no_overlap_no_lookahead() {
        let plan = WindowPlan::new(103, 7, 4, 2).unwrap();
        for w in &plan {
            assert!(w.train_end <= w.test_start);
            assert!(w.train_start < w.train_end);
            assert!(w.test_start < w.test_end);
            assert!(w.test_end <= 103);
        }
    }

    #[test]
    fn test_test_slices_tile_tail_in_order() {
        // Union of all test slices, taken in order, covers [train*w, n)
        // with no gaps or overlaps, whatever the test span.
        for (n, w, train, test) in [(97, 8, 3, 1), (103, 7, 4, 2), (60, 10, 2, 3)] {
            let plan = WindowPlan::new(n, w, train, test).unwrap();

            let mut next = train * w;
            for win in &plan {
                assert_eq!(win.test_start, next);
                next = win.test_end;
            }
            assert_eq!(next, n);
        }
    }

    #[test]
    fn test_multi_window_test_span_does_not_overlap() {
        let plan = WindowPlan::new(25, 5, 2, 2).unwrap();
        let windows = plan.materialize();

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].train_range(), 0..10);
        assert_eq!(windows[0].test_range(), 10..20);
        assert_eq!(windows[1].train_range(), 10..20);
        assert_eq!(windows[1].test_range(), 20..25);
    }

    #[test]
    fn test_too_few_samples_yields_empty_plan() {
        let plan = WindowPlan::new(25, 10, 3, 1).unwrap();
        assert!(plan.materialize().is_empty());
    }

    #[test]
    fn test_iteration_is_restartable() {
        let plan = WindowPlan::new(60, 10, 3, 1).unwrap();
        let first: Vec<_> = plan.iter().collect();
        let second: Vec<_> = plan.iter().collect();
        assert_eq!(first, second);
    }
}
