//! Trade segmentation.
//!
//! Converts a ternary signal series into discrete trade episodes: a trade
//! opens where the effective position changes to a different nonzero
//! value and closes at the timestamp before the next boundary (or at the
//! end of the requested range). Episode returns compound the
//! per-timestamp strategy returns `signal[t] * underlying_return[t]`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::series::PriceSeries;

use super::statistics::{direction_stats, DirectionStats};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TradeError {
    #[error("no signal series supplied")]
    NoSignal,

    #[error("signal length ({signals}) does not match price length ({prices})")]
    ShapeMismatch { signals: usize, prices: usize },

    #[error("signal and price timestamps disagree at index {0}")]
    Misaligned(usize),

    #[error("no trades in the requested range")]
    InsufficientData,
}

/// A ternary position decision: short, flat, or long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Short,
    Flat,
    Long,
}

impl Signal {
    /// Position value: -1, 0 or +1.
    pub fn value(&self) -> f64 {
        match self {
            Signal::Short => -1.0,
            Signal::Flat => 0.0,
            Signal::Long => 1.0,
        }
    }

    /// Trade direction of an active signal; flat carries none.
    pub fn direction(&self) -> Option<TradeDirection> {
        match self {
            Signal::Long => Some(TradeDirection::Long),
            Signal::Short => Some(TradeDirection::Short),
            Signal::Flat => None,
        }
    }
}

/// Direction of a trade episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    Long,
    Short,
}

/// A signal series aligned 1:1 with a price series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSeries {
    pub timestamps: Vec<NaiveDateTime>,
    pub values: Vec<Signal>,
}

impl SignalSeries {
    pub fn new(timestamps: Vec<NaiveDateTime>, values: Vec<Signal>) -> Self {
        Self { timestamps, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A maximal contiguous run of one nonzero position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEpisode {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub direction: TradeDirection,
    /// Compounded return over the episode: `prod(1 + r_t) - 1`.
    pub compounded_return: f64,
    /// Number of timestamps belonging to the episode.
    pub bars: usize,
}

/// How underlying per-timestamp returns are derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// Use the bar mid price `(open + close) / 2` instead of the close.
    #[serde(default)]
    pub use_mid: bool,

    /// Use log differences instead of percentage changes.
    #[serde(default)]
    pub use_log: bool,
}

/// Output of [`TradeSegmenter::trade_report`]: the per-timestamp trade
/// label series, the per-trade detail table, and the per-direction
/// statistics table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeReport {
    pub timestamps: Vec<NaiveDateTime>,
    /// Episode index per timestamp; `None` while flat.
    pub labels: Vec<Option<usize>>,
    pub episodes: Vec<TradeEpisode>,
    pub stats: Vec<DirectionStats>,
}

#[derive(Debug, Clone)]
struct CachedReport {
    start: NaiveDateTime,
    end: NaiveDateTime,
    config: SegmenterConfig,
    report: TradeReport,
}

/// Segments a signal series over an underlying price series into trade
/// episodes and per-direction return statistics.
///
/// The last report is cached keyed by `(start, end, config)`; any key
/// mismatch forces a full recomputation rather than partial reuse.
pub struct TradeSegmenter {
    prices: PriceSeries,
    config: SegmenterConfig,
    signals: Option<SignalSeries>,
    cache: Option<CachedReport>,
}

impl TradeSegmenter {
    pub fn new(prices: PriceSeries, config: SegmenterConfig) -> Self {
        Self {
            prices,
            config,
            signals: None,
            cache: None,
        }
    }

    /// Attach the externally generated signal series. Must align 1:1
    /// with the price series.
    pub fn set_signals(&mut self, signals: SignalSeries) -> Result<(), TradeError> {
        if signals.len() != self.prices.len() {
            return Err(TradeError::ShapeMismatch {
                signals: signals.len(),
                prices: self.prices.len(),
            });
        }
        for (i, (a, b)) in signals
            .timestamps
            .iter()
            .zip(self.prices.timestamps())
            .enumerate()
        {
            if *a != b {
                return Err(TradeError::Misaligned(i));
            }
        }
        self.signals = Some(signals);
        self.cache = None;
        Ok(())
    }

    /// Reconfigure the return basis. Invalidates the cache.
    pub fn set_config(&mut self, config: SegmenterConfig) {
        if config != self.config {
            self.config = config;
            self.cache = None;
        }
    }

    /// Segment trades over `[start, end]` (inclusive) and compute the
    /// per-direction statistics.
    pub fn trade_report(
        &mut self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<TradeReport, TradeError> {
        let signals = self.signals.as_ref().ok_or(TradeError::NoSignal)?;

        if let Some(cached) = &self.cache {
            if cached.start == start && cached.end == end && cached.config == self.config {
                debug!(%start, %end, "reusing cached trade report");
                return Ok(cached.report.clone());
            }
        }

        let returns = self.underlying_returns();
        let timestamps = self.prices.timestamps();

        // Per-timestamp strategy returns inside the requested range. The
        // first in-range bar keeps its return from the preceding bar.
        let in_range: Vec<usize> = (0..timestamps.len())
            .filter(|&i| timestamps[i] >= start && timestamps[i] <= end)
            .collect();

        let runs = segment_runs(&signals.values, &in_range);
        if runs.is_empty() {
            return Err(TradeError::InsufficientData);
        }

        let mut labels: Vec<Option<usize>> = vec![None; in_range.len()];
        let mut episodes = Vec::with_capacity(runs.len());

        for (episode_id, (run, direction)) in runs.iter().enumerate() {
            let mut compounded = 1.0;
            for pos in run.clone() {
                let i = in_range[pos];
                let strategy_return = signals.values[i].value() * returns[i];
                compounded *= 1.0 + strategy_return;
                labels[pos] = Some(episode_id);
            }

            episodes.push(TradeEpisode {
                start: timestamps[in_range[run.start]],
                end: timestamps[in_range[run.end - 1]],
                direction: *direction,
                compounded_return: compounded - 1.0,
                bars: run.len(),
            });
        }

        let stats = direction_stats(&episodes);
        let report = TradeReport {
            timestamps: in_range.iter().map(|&i| timestamps[i]).collect(),
            labels,
            episodes,
            stats,
        };

        self.cache = Some(CachedReport {
            start,
            end,
            config: self.config,
            report: report.clone(),
        });
        Ok(report)
    }

    /// Underlying per-bar return, aligned to bar indices. The first bar
    /// of the series has no predecessor and contributes zero.
    fn underlying_returns(&self) -> Vec<f64> {
        let values = if self.config.use_mid {
            self.prices.mids()
        } else {
            self.prices.closes()
        };

        let mut r = vec![0.0; values.len()];
        for i in 1..values.len() {
            r[i] = if self.config.use_log {
                if values[i - 1] <= 0.0 || values[i] <= 0.0 {
                    0.0
                } else {
                    (values[i] / values[i - 1]).ln()
                }
            } else if values[i - 1] == 0.0 {
                0.0
            } else {
                values[i] / values[i - 1] - 1.0
            };
        }
        r
    }
}

/// Maximal runs of identical nonzero signal values, as ranges over
/// positions in `in_range` paired with their trade direction. Only
/// active signals open a run, so every run carries a direction.
fn segment_runs(
    signals: &[Signal],
    in_range: &[usize],
) -> Vec<(std::ops::Range<usize>, TradeDirection)> {
    let mut runs = Vec::new();
    let mut open: Option<(usize, Signal, TradeDirection)> = None;

    for (pos, &i) in in_range.iter().enumerate() {
        let s = signals[i];
        match open {
            Some((start, current, direction)) if s != current => {
                runs.push((start..pos, direction));
                open = s.direction().map(|d| (pos, s, d));
            }
            None => {
                open = s.direction().map(|d| (pos, s, d));
            }
            _ => {}
        }
    }
    if let Some((start, _, direction)) = open {
        runs.push((start..in_range.len(), direction));
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Bar;
    use chrono::DateTime;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn ts(i: i64) -> NaiveDateTime {
        DateTime::from_timestamp(i * 3600, 0).unwrap().naive_utc()
    }

    fn prices(closes: &[Decimal]) -> PriceSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                timestamp: ts(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1_000,
            })
            .collect();
        PriceSeries::new(bars).unwrap()
    }

    fn signals_from(values: &[i8], n: usize) -> SignalSeries {
        assert_eq!(values.len(), n);
        SignalSeries::new(
            (0..n as i64).map(ts).collect(),
            values
                .iter()
                .map(|v| match v {
                    1 => Signal::Long,
                    -1 => Signal::Short,
                    _ => Signal::Flat,
                })
                .collect(),
        )
    }

    fn nine_bar_segmenter() -> TradeSegmenter {
        let series = prices(&[
            dec!(100),
            dec!(101),
            dec!(102),
            dec!(104),
            dec!(103),
            dec!(103),
            dec!(102),
            dec!(100),
            dec!(101),
        ]);
        let mut segmenter = TradeSegmenter::new(series, SegmenterConfig::default());
        segmenter
            .set_signals(signals_from(&[0, 0, 1, 1, 1, 0, -1, -1, 0], 9))
            .unwrap();
        segmenter
    }

    #[test]
    fn test_requires_signals() {
        let mut segmenter =
            TradeSegmenter::new(prices(&[dec!(100), dec!(101)]), SegmenterConfig::default());
        assert_eq!(
            segmenter.trade_report(ts(0), ts(1)),
            Err(TradeError::NoSignal)
        );
    }

    #[test]
    fn test_signal_alignment_checked() {
        let mut segmenter =
            TradeSegmenter::new(prices(&[dec!(100), dec!(101)]), SegmenterConfig::default());
        assert!(matches!(
            segmenter.set_signals(signals_from(&[1], 1)),
            Err(TradeError::ShapeMismatch { .. })
        ));

        let misaligned = SignalSeries::new(vec![ts(0), ts(5)], vec![Signal::Flat, Signal::Long]);
        assert_eq!(
            segmenter.set_signals(misaligned),
            Err(TradeError::Misaligned(1))
        );
    }

    #[test]
    fn test_two_trades_from_signal_runs() {
        // [0,0,1,1,1,0,-1,-1,0] partitions into a long trade over indices
        // 2..=4 and a short trade over indices 6..=7.
        let mut segmenter = nine_bar_segmenter();
        let report = segmenter.trade_report(ts(0), ts(8)).unwrap();

        assert_eq!(report.episodes.len(), 2);

        let long = &report.episodes[0];
        assert_eq!(long.direction, TradeDirection::Long);
        assert_eq!(long.start, ts(2));
        assert_eq!(long.end, ts(4));
        assert_eq!(long.bars, 3);

        let short = &report.episodes[1];
        assert_eq!(short.direction, TradeDirection::Short);
        assert_eq!(short.start, ts(6));
        assert_eq!(short.end, ts(7));
        assert_eq!(short.bars, 2);

        assert_eq!(
            report.labels,
            vec![
                None,
                None,
                Some(0),
                Some(0),
                Some(0),
                None,
                Some(1),
                Some(1),
                None
            ]
        );
    }

    #[test]
    fn test_compounded_return_reconstruction() {
        let mut segmenter = nine_bar_segmenter();
        let report = segmenter.trade_report(ts(0), ts(8)).unwrap();

        // Long trade over closes 101 -> 102 -> 104 -> 103.
        let r = [
            102.0 / 101.0 - 1.0,
            104.0 / 102.0 - 1.0,
            103.0 / 104.0 - 1.0,
        ];
        let expected: f64 = r.iter().map(|x| 1.0 + x).product::<f64>() - 1.0;
        assert!((report.episodes[0].compounded_return - expected).abs() < 1e-12);

        // Short trade over closes 103 -> 102 -> 100, inverted sign.
        let r = [-(102.0 / 103.0 - 1.0), -(100.0 / 102.0 - 1.0)];
        let expected: f64 = r.iter().map(|x| 1.0 + x).product::<f64>() - 1.0;
        assert!((report.episodes[1].compounded_return - expected).abs() < 1e-12);
    }

    #[test]
    fn test_flip_without_flat_gap_starts_new_trade() {
        let series = prices(&[dec!(100), dec!(101), dec!(102), dec!(101), dec!(100)]);
        let mut segmenter = TradeSegmenter::new(series, SegmenterConfig::default());
        segmenter
            .set_signals(signals_from(&[0, 1, 1, -1, -1], 5))
            .unwrap();

        let report = segmenter.trade_report(ts(0), ts(4)).unwrap();
        assert_eq!(report.episodes.len(), 2);
        assert_eq!(report.episodes[0].direction, TradeDirection::Long);
        assert_eq!(report.episodes[0].end, ts(2));
        assert_eq!(report.episodes[1].direction, TradeDirection::Short);
        assert_eq!(report.episodes[1].start, ts(3));
    }

    #[test]
    fn test_labels_index_episodes_densely() {
        // Every labeled timestamp points at the episode covering it, and
        // each episode's bar count matches its label occurrences.
        let mut segmenter = nine_bar_segmenter();
        let report = segmenter.trade_report(ts(0), ts(8)).unwrap();

        for (pos, label) in report.labels.iter().enumerate() {
            if let Some(id) = label {
                let episode = &report.episodes[*id];
                let t = report.timestamps[pos];
                assert!(episode.start <= t && t <= episode.end);
            }
        }
        for (id, episode) in report.episodes.iter().enumerate() {
            let bars = report.labels.iter().filter(|l| **l == Some(id)).count();
            assert_eq!(bars, episode.bars);
        }
    }

    #[test]
    fn test_no_trades_in_range_is_an_error() {
        let mut segmenter = nine_bar_segmenter();
        assert_eq!(
            segmenter.trade_report(ts(0), ts(1)),
            Err(TradeError::InsufficientData)
        );
    }

    #[test]
    fn test_report_is_idempotent_and_cache_exact_match_only() {
        let mut segmenter = nine_bar_segmenter();

        let first = segmenter.trade_report(ts(0), ts(8)).unwrap();
        let cached = segmenter.trade_report(ts(0), ts(8)).unwrap();
        assert_eq!(first, cached);

        // A different range forces recomputation, then the original range
        // recomputes from scratch and still matches.
        let narrower = segmenter.trade_report(ts(2), ts(7)).unwrap();
        assert_ne!(first, narrower);
        let again = segmenter.trade_report(ts(0), ts(8)).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn test_mid_and_log_bases() {
        let bars = vec![
            Bar {
                timestamp: ts(0),
                open: dec!(100),
                high: dec!(104),
                low: dec!(98),
                close: dec!(102),
                volume: 1_000,
            },
            Bar {
                timestamp: ts(1),
                open: dec!(102),
                high: dec!(108),
                low: dec!(101),
                close: dec!(106),
                volume: 1_000,
            },
        ];
        let series = PriceSeries::new(bars).unwrap();

        let mut mid = TradeSegmenter::new(
            series.clone(),
            SegmenterConfig {
                use_mid: true,
                use_log: false,
            },
        );
        mid.set_signals(signals_from(&[1, 1], 2)).unwrap();
        let report = mid.trade_report(ts(0), ts(1)).unwrap();
        // Mid prices: 101 -> 104.
        assert!((report.episodes[0].compounded_return - (104.0 / 101.0 - 1.0)).abs() < 1e-12);

        let mut log = TradeSegmenter::new(
            series,
            SegmenterConfig {
                use_mid: false,
                use_log: true,
            },
        );
        log.set_signals(signals_from(&[1, 1], 2)).unwrap();
        let report = log.trade_report(ts(0), ts(1)).unwrap();
        let expected = (1.0 + (106.0f64 / 102.0).ln()) - 1.0;
        assert!((report.episodes[0].compounded_return - expected).abs() < 1e-12);
    }
}
