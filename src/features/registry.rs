//! Capability-typed feature registry.
//!
//! Maps feature names to pure bar-series functions, resolved at
//! configuration time rather than through runtime attribute lookup. The
//! indicator math itself lives in an external collaborator; this module
//! only owns the name-to-function seam and the assembly of the aligned
//! feature matrix.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::series::{Bar, FeatureMatrix, SeriesError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeatureError {
    #[error("unknown feature: {0}")]
    Unknown(String),

    #[error("feature {name} produced {got} values for {expected} bars")]
    BadLength {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error(transparent)]
    Series(#[from] SeriesError),
}

/// A pure feature function: one value per input bar.
pub type FeatureFn = Arc<dyn Fn(&[Bar]) -> Vec<f64> + Send + Sync>;

/// Registry of named feature functions.
#[derive(Default, Clone)]
pub struct FeatureRegistry {
    features: BTreeMap<String, FeatureFn>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a feature under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: &str, feature: F)
    where
        F: Fn(&[Bar]) -> Vec<f64> + Send + Sync + 'static,
    {
        self.features.insert(name.to_string(), Arc::new(feature));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.features.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.features.keys().cloned().collect()
    }

    /// Resolve `names` to their functions, failing on the first
    /// unregistered name.
    pub fn resolve(&self, names: &[&str]) -> Result<Vec<FeatureFn>, FeatureError> {
        names
            .iter()
            .map(|&name| {
                self.features
                    .get(name)
                    .cloned()
                    .ok_or_else(|| FeatureError::Unknown(name.to_string()))
            })
            .collect()
    }

    /// Compute an aligned feature matrix: one column per name, one row
    /// per bar.
    pub fn compute(&self, bars: &[Bar], names: &[&str]) -> Result<FeatureMatrix, FeatureError> {
        let functions = self.resolve(names)?;

        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(names.len());
        for (name, function) in names.iter().zip(&functions) {
            let values = function(bars);
            if values.len() != bars.len() {
                return Err(FeatureError::BadLength {
                    name: name.to_string(),
                    expected: bars.len(),
                    got: values.len(),
                });
            }
            columns.push(values);
        }

        let rows: Vec<Vec<f64>> = (0..bars.len())
            .map(|i| columns.iter().map(|c| c[i]).collect())
            .collect();

        Ok(FeatureMatrix::new(
            bars.iter().map(|b| b.timestamp).collect(),
            names.iter().map(|n| n.to_string()).collect(),
            rows,
        )?)
    }
}
