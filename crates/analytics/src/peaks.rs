//! Peak detection and dwell-time approximation.

use serde::{Deserialize, Serialize};

/// A local maximum in a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Position in the series.
    pub index: usize,
    pub value: f64,
    /// Timestamp at `index`, or `None` when the timestamp series is shorter.
    pub timestamp: Option<f64>,
}

/// Find strict interior local maxima above `min_height`.
///
/// A sample at `i` (with both neighbors present) is a peak iff it is
/// strictly greater than both neighbors and strictly greater than
/// `min_height`. Series shorter than three samples have no peaks.
pub fn find_peaks(series: &[f64], timestamps: &[f64], min_height: f64) -> Vec<Peak> {
    if series.len() < 3 {
        return Vec::new();
    }

    series
        .windows(3)
        .enumerate()
        .filter_map(|(offset, w)| {
            let (prev, value, next) = (w[0], w[1], w[2]);
            if value > prev && value > next && value > min_height {
                let index = offset + 1;
                Some(Peak {
                    index,
                    value,
                    timestamp: timestamps.get(index).copied(),
                })
            } else {
                None
            }
        })
        .collect()
}

/// Approximate seconds spent strictly above `threshold`.
///
/// Each sample stands for `frame_skip` camera frames at `nominal_fps`, so
/// the result is `count * frame_skip / nominal_fps`. This drifts from real
/// elapsed time whenever the nominal rate is not sustained.
pub fn duration_above_threshold(
    series: &[f64],
    threshold: f64,
    frame_skip: u32,
    nominal_fps: f64,
) -> f64 {
    if series.is_empty() || nominal_fps <= 0.0 {
        return 0.0;
    }
    let count = series.iter().filter(|v| **v > threshold).count();
    (count as f64 * f64::from(frame_skip)) / nominal_fps
}
