//! Walk-forward model evaluation.
//!
//! Trains a fresh model per scheduled window and concatenates the
//! out-of-sample predictions into one continuous series. No fitted state
//! survives a window boundary: reusing a fitted model across windows
//! would leak future information into earlier predictions.

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::series::{FeatureMatrix, PredictionSeries, SeriesError};

use super::windows::{Window, WindowPlan};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("feature rows ({features}) do not match label length ({labels})")]
    ShapeMismatch { features: usize, labels: usize },

    #[error("window {0:?} exceeds available rows ({1})")]
    WindowOutOfBounds(Window, usize),

    #[error("model produced {got} predictions for {expected} test rows")]
    ModelOutput { expected: usize, got: usize },

    #[error("no candidate parameter sets supplied")]
    NoCandidates,

    #[error("invalid search configuration: {0}")]
    SearchConfig(String),

    #[error(transparent)]
    Series(#[from] SeriesError),
}

/// An opaque predictor with fit/predict capability.
///
/// One instance is created per window and discarded after its predict
/// call; implementations never see data from more than one window.
pub trait Model: Send {
    /// Fit on aligned features and labels.
    fn fit(&mut self, features: &FeatureMatrix, labels: &[f64]);

    /// Predict one value per feature row.
    fn predict(&self, features: &FeatureMatrix) -> Vec<f64>;
}

/// Constructs fresh, unfitted model instances.
///
/// A factory corresponds to one hyperparameter set; the grid search
/// selects between factories.
pub trait ModelFactory: Send + Sync {
    fn build(&self) -> Box<dyn Model>;
}

impl ModelFactory for Box<dyn ModelFactory> {
    fn build(&self) -> Box<dyn Model> {
        self.as_ref().build()
    }
}

/// Walk-forward evaluator over a fixed window schedule.
pub struct WalkForwardEvaluator {
    plan: WindowPlan,
}

impl WalkForwardEvaluator {
    pub fn new(plan: WindowPlan) -> Self {
        Self { plan }
    }

    pub fn plan(&self) -> &WindowPlan {
        &self.plan
    }

    /// Train and predict across all scheduled windows, concatenating
    /// out-of-sample predictions in window order.
    ///
    /// Windows are independent (fresh model, disjoint test slices) and
    /// run on the rayon pool; results are reassembled in schedule order,
    /// so the output does not depend on completion order. A failing
    /// window aborts the whole evaluation.
    pub fn evaluate<F>(
        &self,
        features: &FeatureMatrix,
        labels: &[f64],
        factory: &F,
    ) -> Result<PredictionSeries, EvalError>
    where
        F: ModelFactory,
    {
        self.check_shapes(features, labels)?;
        let windows = self.plan.materialize();
        info!(windows = windows.len(), rows = features.n_rows(), "walk-forward evaluation");

        if windows.is_empty() {
            return Ok(PredictionSeries::empty());
        }

        // par_iter + collect preserves window order.
        let per_window: Vec<Vec<f64>> = windows
            .par_iter()
            .map(|w| Self::run_window(features, labels, w, factory))
            .collect::<Result<_, _>>()?;

        self.concatenate(features, &windows, per_window)
    }

    /// Variant mode with per-window hyperparameter search.
    ///
    /// For each window, the best-scoring candidate factory is selected by
    /// forward-chained cross-validation on the training slice alone (see
    /// [`super::GridSearch`]), then refit on the full training slice. No
    /// test-slice data enters the search's scoring.
    pub fn evaluate_with_search<F>(
        &self,
        features: &FeatureMatrix,
        labels: &[f64],
        candidates: &[F],
        search: &super::GridSearch,
    ) -> Result<PredictionSeries, EvalError>
    where
        F: ModelFactory,
    {
        self.check_shapes(features, labels)?;
        if candidates.is_empty() {
            return Err(EvalError::NoCandidates);
        }
        let windows = self.plan.materialize();
        info!(
            windows = windows.len(),
            candidates = candidates.len(),
            "walk-forward evaluation with grid search"
        );

        if windows.is_empty() {
            return Ok(PredictionSeries::empty());
        }

        // The search parallelizes across candidates internally, so the
        // window loop stays sequential.
        let mut per_window = Vec::with_capacity(windows.len());
        for w in &windows {
            Self::check_bounds(features, w)?;
            let best = search.select(features, labels, w.train_range(), candidates)?;
            debug!(window = ?w, candidate = best, "selected hyperparameters");
            per_window.push(Self::run_window(features, labels, w, &candidates[best])?);
        }

        self.concatenate(features, &windows, per_window)
    }

    fn check_shapes(&self, features: &FeatureMatrix, labels: &[f64]) -> Result<(), EvalError> {
        if features.n_rows() != labels.len() {
            return Err(EvalError::ShapeMismatch {
                features: features.n_rows(),
                labels: labels.len(),
            });
        }
        Ok(())
    }

    fn check_bounds(features: &FeatureMatrix, window: &Window) -> Result<(), EvalError> {
        if window.test_end > features.n_rows() {
            return Err(EvalError::WindowOutOfBounds(*window, features.n_rows()));
        }
        Ok(())
    }

    fn run_window<F>(
        features: &FeatureMatrix,
        labels: &[f64],
        window: &Window,
        factory: &F,
    ) -> Result<Vec<f64>, EvalError>
    where
        F: ModelFactory,
    {
        Self::check_bounds(features, window)?;

        let train_x = features.slice_rows(window.train_range());
        let train_y = &labels[window.train_range()];
        let test_x = features.slice_rows(window.test_range());

        let mut model = factory.build();
        model.fit(&train_x, train_y);
        let predictions = model.predict(&test_x);

        if predictions.len() != window.test_len() {
            return Err(EvalError::ModelOutput {
                expected: window.test_len(),
                got: predictions.len(),
            });
        }
        Ok(predictions)
    }

    fn concatenate(
        &self,
        features: &FeatureMatrix,
        windows: &[Window],
        per_window: Vec<Vec<f64>>,
    ) -> Result<PredictionSeries, EvalError> {
        let mut timestamps = Vec::new();
        let mut values = Vec::new();
        for (window, predictions) in windows.iter().zip(per_window) {
            timestamps.extend_from_slice(&features.index()[window.test_range()]);
            values.extend(predictions);
        }
        Ok(PredictionSeries::new(timestamps, values)?)
    }
}
