//! Ordered time-series containers and their invariants.

mod types;

pub use types::{
    Bar, FeatureMatrix, PredictionSeries, PriceSeries, ReturnKind, ReturnSeries, SeriesError,
};
