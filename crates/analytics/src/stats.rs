//! Distribution statistics over numeric series.

use serde::{Deserialize, Serialize};

/// Mean, spread, and range of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributionStats {
    pub count: usize,
    pub mean: f64,
    /// Standard deviation; 0.0 for a single sample.
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl DistributionStats {
    /// Compute statistics over `series`, skipping non-finite values.
    ///
    /// `std` is the sample deviation. Returns `None` when no finite value
    /// remains.
    pub fn from_series(series: &[f64]) -> Option<Self> {
        Self::with_ddof(series, 1)
    }

    /// Like [`from_series`](Self::from_series) with the population
    /// deviation (n denominator).
    pub fn from_population(series: &[f64]) -> Option<Self> {
        Self::with_ddof(series, 0)
    }

    fn with_ddof(series: &[f64], ddof: usize) -> Option<Self> {
        let finite: Vec<f64> = series.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return None;
        }

        let count = finite.len();
        let mean = finite.iter().sum::<f64>() / count as f64;
        let std = if count <= ddof || count < 2 {
            0.0
        } else {
            let sum_sq = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
            (sum_sq / (count - ddof) as f64).sqrt()
        };
        let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(Self {
            count,
            mean,
            std,
            min,
            max,
        })
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Fraction of samples strictly greater than `threshold`.
pub fn fraction_above(series: &[f64], threshold: f64) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    series.iter().filter(|v| **v > threshold).count() as f64 / series.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_of_known_series() {
        let stats =
            DistributionStats::from_series(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(stats.count, 8);
        assert!((stats.mean - 5.0).abs() < 1e-12);
        // Sample variance = 32 / 7.
        assert!((stats.std - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
        assert_eq!(stats.range(), 7.0);
    }

    #[test]
    fn population_std_divides_by_count() {
        let stats =
            DistributionStats::from_population(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((stats.std - 2.0).abs() < 1e-12);
        assert_eq!(DistributionStats::from_population(&[3.0]).unwrap().std, 0.0);
    }

    #[test]
    fn empty_and_single_series() {
        assert!(DistributionStats::from_series(&[]).is_none());
        assert!(DistributionStats::from_series(&[f64::NAN]).is_none());

        let one = DistributionStats::from_series(&[0.3]).unwrap();
        assert_eq!(one.std, 0.0);
        assert_eq!(one.min, one.max);
    }

    #[test]
    fn fraction_above_is_strict() {
        assert_eq!(fraction_above(&[0.5, 0.6, 0.4, 0.9], 0.5), 0.5);
        assert_eq!(fraction_above(&[], 0.5), 0.0);
    }
}
