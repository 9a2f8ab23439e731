//! Event-sampled walk-forward backtesting core.
//!
//! The pipeline: a price series feeds the CUSUM [`events`] detector,
//! which samples information-bearing timestamps; an externally built
//! feature matrix and label series are evaluated across non-overlapping
//! [`walkforward`] windows without look-ahead leakage; the resulting
//! signal series is segmented into [`trades`] episodes and summarized
//! per direction.
//!
//! File ingestion, indicator math, the concrete regression algorithm,
//! and portfolio weighting are external collaborators; this crate owns
//! the sequential sampling state machine, the temporal partitioning
//! discipline, and the episode-boundary semantics.

pub mod events;
pub mod features;
pub mod series;
pub mod trades;
pub mod walkforward;

// Re-export commonly used types
pub use events::{CusumConfig, CusumFilter, EventError};
pub use features::{FeatureError, FeatureRegistry};
pub use series::{
    Bar, FeatureMatrix, PredictionSeries, PriceSeries, ReturnKind, ReturnSeries, SeriesError,
};
pub use trades::{
    DirectionStats, SegmenterConfig, Signal, SignalSeries, TradeDirection, TradeEpisode,
    TradeError, TradeReport, TradeSegmenter,
};
pub use walkforward::{
    EvalError, GridSearch, Model, ModelFactory, WalkForwardEvaluator, Window, WindowError,
    WindowPlan,
};
