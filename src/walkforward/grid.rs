//! Cross-validated hyperparameter selection.
//!
//! Scores candidate model factories on a training slice using
//! forward-chained folds: every validation fold lies strictly after the
//! data its model was fitted on, so the selection respects the same
//! temporal discipline as the outer walk-forward loop.

use std::ops::Range;

use rayon::prelude::*;
use tracing::debug;

use crate::series::FeatureMatrix;

use super::evaluator::{EvalError, ModelFactory};

/// Grid search over candidate factories.
///
/// The training slice is split into `folds + 1` contiguous chunks. For
/// fold `k` the candidate is fitted on chunks `0..k` and scored (mean
/// squared error) on chunk `k`; the candidate with the lowest mean score
/// wins. Ties go to the earliest candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSearch {
    folds: usize,
}

impl GridSearch {
    pub fn new(folds: usize) -> Result<Self, EvalError> {
        if folds == 0 {
            return Err(EvalError::SearchConfig(
                "fold count must be positive".to_string(),
            ));
        }
        Ok(Self { folds })
    }

    pub fn folds(&self) -> usize {
        self.folds
    }

    /// Select the best-scoring candidate for the given training slice.
    /// Returns the index into `candidates`.
    pub fn select<F>(
        &self,
        features: &FeatureMatrix,
        labels: &[f64],
        train: Range<usize>,
        candidates: &[F],
    ) -> Result<usize, EvalError>
    where
        F: ModelFactory,
    {
        if candidates.is_empty() {
            return Err(EvalError::NoCandidates);
        }

        let chunk = train.len() / (self.folds + 1);
        if chunk == 0 {
            return Err(EvalError::SearchConfig(format!(
                "training slice of {} rows cannot be split into {} forward-chained folds",
                train.len(),
                self.folds
            )));
        }

        let scores: Vec<f64> = candidates
            .par_iter()
            .map(|candidate| self.score(features, labels, &train, chunk, candidate))
            .collect::<Result<_, _>>()?;

        let best = scores
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
            .unwrap_or(0);

        debug!(best, score = scores[best], "grid search selection");
        Ok(best)
    }

    fn score<F>(
        &self,
        features: &FeatureMatrix,
        labels: &[f64],
        train: &Range<usize>,
        chunk: usize,
        candidate: &F,
    ) -> Result<f64, EvalError>
    where
        F: ModelFactory,
    {
        let mut total = 0.0;
        for k in 1..=self.folds {
            let fit_range = train.start..train.start + k * chunk;
            let validate_end = if k == self.folds {
                train.end
            } else {
                train.start + (k + 1) * chunk
            };
            let validate_range = fit_range.end..validate_end;

            let mut model = candidate.build();
            model.fit(
                &features.slice_rows(fit_range.clone()),
                &labels[fit_range],
            );
            let predictions = model.predict(&features.slice_rows(validate_range.clone()));
            if predictions.len() != validate_range.len() {
                return Err(EvalError::ModelOutput {
                    expected: validate_range.len(),
                    got: predictions.len(),
                });
            }

            let truth = &labels[validate_range];
            let mse = predictions
                .iter()
                .zip(truth)
                .map(|(p, y)| (p - y) * (p - y))
                .sum::<f64>()
                / truth.len() as f64;
            total += mse;
        }
        Ok(total / self.folds as f64)
    }
}
