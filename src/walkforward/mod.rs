//! Walk-forward scheduling and leak-free model evaluation.
//!
//! A [`WindowPlan`] partitions the sample index into ordered train/test
//! pairs; the [`WalkForwardEvaluator`] retrains a fresh model per window
//! and concatenates out-of-sample predictions. [`GridSearch`] adds
//! cross-validated hyperparameter selection inside the training slice.

mod evaluator;
mod grid;
mod windows;

pub use evaluator::{EvalError, Model, ModelFactory, WalkForwardEvaluator};
pub use grid::GridSearch;
pub use windows::{Window, WindowError, WindowIter, WindowPlan};
