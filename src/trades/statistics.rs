//! Per-direction trade return statistics.
//!
//! Aggregates the compounded returns of trade episodes sharing a
//! direction into distribution moments. Statistics are recomputed on
//! demand from the current episode set; nothing is persisted here.

use serde::{Deserialize, Serialize};

use super::segmenter::{TradeDirection, TradeEpisode};

/// Distribution summary of compounded returns for one trade direction.
///
/// `std_dev` is the population standard deviation; `skewness` is the
/// third standardized moment and `kurtosis` the excess fourth (normal
/// distribution scores 0). Degenerate distributions (zero variance)
/// report zero skewness and kurtosis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionStats {
    pub direction: TradeDirection,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub skewness: f64,
    pub kurtosis: f64,
}

/// Group episodes by direction and summarize each group. Directions with
/// no episodes are omitted; long precedes short in the output.
pub fn direction_stats(episodes: &[TradeEpisode]) -> Vec<DirectionStats> {
    [TradeDirection::Long, TradeDirection::Short]
        .into_iter()
        .filter_map(|direction| {
            let returns: Vec<f64> = episodes
                .iter()
                .filter(|e| e.direction == direction)
                .map(|e| e.compounded_return)
                .collect();
            summarize(direction, &returns)
        })
        .collect()
}

fn summarize(direction: TradeDirection, returns: &[f64]) -> Option<DirectionStats> {
    if returns.is_empty() {
        return None;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;

    let moment = |p: i32| returns.iter().map(|r| (r - mean).powi(p)).sum::<f64>() / n;
    let m2 = moment(2);
    let std_dev = m2.sqrt();

    let (skewness, kurtosis) = if m2 > 0.0 {
        (moment(3) / m2.powf(1.5), moment(4) / (m2 * m2) - 3.0)
    } else {
        (0.0, 0.0)
    };

    Some(DirectionStats {
        direction,
        count: returns.len(),
        mean,
        median: median(returns),
        std_dev,
        skewness,
        kurtosis,
    })
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDateTime};

    fn ts(i: i64) -> NaiveDateTime {
        DateTime::from_timestamp(i * 3600, 0).unwrap().naive_utc()
    }

    fn episode(direction: TradeDirection, compounded_return: f64) -> TradeEpisode {
        TradeEpisode {
            start: ts(0),
            end: ts(1),
            direction,
            compounded_return,
            bars: 2,
        }
    }

    #[test]
    fn test_empty_episode_set_yields_no_stats() {
        assert!(direction_stats(&[]).is_empty());
    }

    #[test]
    fn test_single_direction_moments() {
        let episodes: Vec<TradeEpisode> = [0.01, 0.02, 0.03, 0.06]
            .iter()
            .map(|&r| episode(TradeDirection::Long, r))
            .collect();

        let stats = direction_stats(&episodes);
        assert_eq!(stats.len(), 1);

        let s = &stats[0];
        assert_eq!(s.direction, TradeDirection::Long);
        assert_eq!(s.count, 4);
        assert!((s.mean - 0.03).abs() < 1e-12);
        assert!((s.median - 0.025).abs() < 1e-12);

        // Population variance of [0.01, 0.02, 0.03, 0.06] around 0.03.
        let var: f64 = (0.0004 + 0.0001 + 0.0 + 0.0009) / 4.0;
        assert!((s.std_dev - var.sqrt()).abs() < 1e-12);

        // Right tail pulls skewness positive.
        assert!(s.skewness > 0.0);
    }

    #[test]
    fn test_directions_grouped_separately() {
        let episodes = vec![
            episode(TradeDirection::Long, 0.05),
            episode(TradeDirection::Short, -0.02),
            episode(TradeDirection::Long, 0.01),
        ];

        let stats = direction_stats(&episodes);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].direction, TradeDirection::Long);
        assert_eq!(stats[0].count, 2);
        assert!((stats[0].mean - 0.03).abs() < 1e-12);
        assert_eq!(stats[1].direction, TradeDirection::Short);
        assert_eq!(stats[1].count, 1);
        assert!((stats[1].mean + 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_distribution() {
        let episodes = vec![
            episode(TradeDirection::Short, 0.01),
            episode(TradeDirection::Short, 0.01),
        ];

        let stats = direction_stats(&episodes);
        assert_eq!(stats[0].std_dev, 0.0);
        assert_eq!(stats[0].skewness, 0.0);
        assert_eq!(stats[0].kurtosis, 0.0);
    }

    #[test]
    fn test_symmetric_returns_have_zero_skew() {
        let episodes: Vec<TradeEpisode> = [-0.02, 0.0, 0.02]
            .iter()
            .map(|&r| episode(TradeDirection::Long, r))
            .collect();

        let stats = direction_stats(&episodes);
        assert!(stats[0].skewness.abs() < 1e-12);
    }
}
