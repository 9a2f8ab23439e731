//! Trade segmentation and per-direction return statistics.

mod segmenter;
mod statistics;

pub use segmenter::{
    SegmenterConfig, Signal, SignalSeries, TradeDirection, TradeEpisode, TradeError, TradeReport,
    TradeSegmenter,
};
pub use statistics::{direction_stats, DirectionStats};
