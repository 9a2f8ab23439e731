//! Core time-series types shared by the sampling, evaluation, and trade
//! segmentation stages.
//!
//! All series are ordered by timestamp with uniqueness enforced at
//! construction, so downstream components can rely on monotone indices
//! instead of re-validating on every call.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a series violates its ordering or shape invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeriesError {
    #[error("timestamps not strictly increasing at index {0}")]
    NonMonotonic(usize),

    #[error("duplicate timestamp at index {0}")]
    DuplicateTimestamp(usize),

    #[error("length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("ragged feature row at index {0}")]
    RaggedRow(usize),
}

/// How pairwise returns are derived from a price sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnKind {
    /// Percentage change: `p[i] / p[i-1] - 1`.
    Percent,
    /// Logarithmic change: `ln(p[i] / p[i-1])`.
    Log,
}

/// A single OHLCV bar.
///
/// Prices are exact decimals; ratio math (returns, compounding) converts
/// to `f64` at the point of use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
}

impl Bar {
    /// Mid price of the bar: `(open + close) / 2`.
    pub fn mid(&self) -> Decimal {
        (self.open + self.close) / Decimal::from(2)
    }
}

/// An ordered price series for one asset.
///
/// Invariant: timestamps are strictly increasing and unique. Bars are
/// immutable once ingested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    bars: Vec<Bar>,
}

impl PriceSeries {
    /// Build a series from ordered bars, rejecting out-of-order or
    /// duplicate timestamps.
    pub fn new(bars: Vec<Bar>) -> Result<Self, SeriesError> {
        validate_timestamps(bars.iter().map(|b| b.timestamp))?;
        Ok(Self { bars })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.bars.iter().map(|b| b.timestamp).collect()
    }

    /// Close prices as `f64`.
    pub fn closes(&self) -> Vec<f64> {
        self.bars
            .iter()
            .map(|b| b.close.try_into().unwrap_or(0.0))
            .collect()
    }

    /// Mid prices `(open + close) / 2` as `f64`.
    pub fn mids(&self) -> Vec<f64> {
        self.bars
            .iter()
            .map(|b| b.mid().try_into().unwrap_or(0.0))
            .collect()
    }

    /// Close-to-close return series. One entry per bar after the first,
    /// timestamps inherited from the second bar onward.
    pub fn returns(&self, kind: ReturnKind) -> ReturnSeries {
        ReturnSeries::from_prices(self.timestamps(), self.closes(), kind)
    }

    /// Return series from mid prices `(open + close) / 2`.
    pub fn mid_returns(&self, kind: ReturnKind) -> ReturnSeries {
        ReturnSeries::from_prices(self.timestamps(), self.mids(), kind)
    }
}

/// An ordered sequence of (timestamp, scalar return).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    timestamps: Vec<NaiveDateTime>,
    values: Vec<f64>,
}

impl ReturnSeries {
    /// Build from aligned timestamps and values.
    pub fn new(timestamps: Vec<NaiveDateTime>, values: Vec<f64>) -> Result<Self, SeriesError> {
        if timestamps.len() != values.len() {
            return Err(SeriesError::LengthMismatch {
                left: timestamps.len(),
                right: values.len(),
            });
        }
        validate_timestamps(timestamps.iter().copied())?;
        Ok(Self { timestamps, values })
    }

    /// Derive pairwise returns from an ordered price sequence. The result
    /// is one element shorter than the input; an empty or single-point
    /// input yields an empty series.
    pub fn from_prices(timestamps: Vec<NaiveDateTime>, prices: Vec<f64>, kind: ReturnKind) -> Self {
        let n = prices.len().min(timestamps.len());
        let mut ts = Vec::with_capacity(n.saturating_sub(1));
        let mut values = Vec::with_capacity(n.saturating_sub(1));
        for i in 1..n {
            let r = match kind {
                ReturnKind::Percent => {
                    if prices[i - 1] == 0.0 {
                        0.0
                    } else {
                        prices[i] / prices[i - 1] - 1.0
                    }
                }
                ReturnKind::Log => {
                    if prices[i - 1] <= 0.0 || prices[i] <= 0.0 {
                        0.0
                    } else {
                        (prices[i] / prices[i - 1]).ln()
                    }
                }
            };
            ts.push(timestamps[i]);
            values.push(r);
        }
        Self {
            timestamps: ts,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Concatenated out-of-sample predictions, one entry per test-window
/// timestamp.
///
/// Invariant: timestamps strictly increasing, no duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSeries {
    timestamps: Vec<NaiveDateTime>,
    values: Vec<f64>,
}

impl PredictionSeries {
    pub fn new(timestamps: Vec<NaiveDateTime>, values: Vec<f64>) -> Result<Self, SeriesError> {
        if timestamps.len() != values.len() {
            return Err(SeriesError::LengthMismatch {
                left: timestamps.len(),
                right: values.len(),
            });
        }
        validate_timestamps(timestamps.iter().copied())?;
        Ok(Self { timestamps, values })
    }

    pub fn empty() -> Self {
        Self {
            timestamps: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// A dense feature matrix: rows are timestamps, columns are named
/// features. Produced by an external feature-engineering collaborator
/// (or the [`crate::features::FeatureRegistry`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    index: Vec<NaiveDateTime>,
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn new(
        index: Vec<NaiveDateTime>,
        columns: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, SeriesError> {
        if index.len() != rows.len() {
            return Err(SeriesError::LengthMismatch {
                left: index.len(),
                right: rows.len(),
            });
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(SeriesError::RaggedRow(i));
            }
        }
        validate_timestamps(index.iter().copied())?;
        Ok(Self {
            index,
            columns,
            rows,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.rows[i]
    }

    /// Copy of the rows in `range`, keeping column names and timestamps.
    pub fn slice_rows(&self, range: std::ops::Range<usize>) -> FeatureMatrix {
        FeatureMatrix {
            index: self.index[range.clone()].to_vec(),
            columns: self.columns.clone(),
            rows: self.rows[range].to_vec(),
        }
    }
}

fn validate_timestamps<I>(timestamps: I) -> Result<(), SeriesError>
where
    I: IntoIterator<Item = NaiveDateTime>,
{
    let mut prev: Option<NaiveDateTime> = None;
    for (i, ts) in timestamps.into_iter().enumerate() {
        if let Some(p) = prev {
            if ts == p {
                return Err(SeriesError::DuplicateTimestamp(i));
            }
            if ts < p {
                return Err(SeriesError::NonMonotonic(i));
            }
        }
        prev = Some(ts);
    }
    Ok(())
}
