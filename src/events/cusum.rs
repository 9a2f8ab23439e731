//! Symmetric CUSUM event filter.
//!
//! Samples the timestamps where cumulative one-directional drift in a
//! return series exceeds a threshold, then resets and keeps scanning.
//! Offsetting noise is absorbed because each accumulator is clipped
//! toward zero on every step.
//!
//! Reference: Lopez de Prado, Advances in Financial Machine Learning,
//! ch. 2 (event-based sampling).

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::series::ReturnSeries;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EventError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Configuration for the CUSUM filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CusumConfig {
    /// Drift threshold. Must be strictly positive.
    pub threshold: f64,
}

impl CusumConfig {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

/// Symmetric CUSUM filter over a single return series.
///
/// Detection is inherently sequential in time; independent assets run in
/// parallel via [`CusumFilter::detect_all`], one accumulator pair each.
#[derive(Debug, Clone)]
pub struct CusumFilter {
    config: CusumConfig,
}

impl CusumFilter {
    pub fn new(config: CusumConfig) -> Result<Self, EventError> {
        if !(config.threshold > 0.0) {
            return Err(EventError::InvalidParameter(format!(
                "cusum threshold must be strictly positive, got {}",
                config.threshold
            )));
        }
        Ok(Self { config })
    }

    /// Emit the timestamps where cumulative upward or downward drift
    /// since the last event exceeds the threshold.
    ///
    /// Scanning starts from the second return observation. An empty or
    /// single-point series yields an empty event set.
    pub fn detect(&self, returns: &ReturnSeries) -> Vec<NaiveDateTime> {
        let h = self.config.threshold;
        let values = returns.values();
        let timestamps = returns.timestamps();

        let mut events = Vec::new();
        let mut s_pos = 0.0_f64;
        let mut s_neg = 0.0_f64;

        for i in 1..values.len() {
            let r = values[i];
            s_pos = (s_pos + r).max(0.0);
            s_neg = (s_neg + r).min(0.0);

            // Invariant: between events the clipping keeps
            // s_pos - s_neg <= h, so the non-breaching accumulator is
            // already at zero whenever the other side fires.
            if s_neg < -h {
                events.push(timestamps[i]);
                s_pos = 0.0;
                s_neg = 0.0;
            } else if s_pos > h {
                events.push(timestamps[i]);
                s_pos = 0.0;
                s_neg = 0.0;
            }
        }

        debug!(
            events = events.len(),
            observations = values.len(),
            threshold = h,
            "cusum scan complete"
        );
        events
    }

    /// Run one independent filter per asset. No state is shared across
    /// assets, so columns are processed on the rayon pool.
    pub fn detect_all(
        &self,
        series: &BTreeMap<String, ReturnSeries>,
    ) -> BTreeMap<String, Vec<NaiveDateTime>> {
        series
            .par_iter()
            .map(|(asset, returns)| (asset.clone(), self.detect(returns)))
            .collect()
    }
}
