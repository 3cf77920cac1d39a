//! Gaze-point statistics.

use faceit_session_model::GazeEntry;
use serde::{Deserialize, Serialize};

use crate::heatmap::{GazeHeatmap, HeatmapCell};
use crate::stats::DistributionStats;

/// A point in gaze coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazePoint {
    pub x: f64,
    pub y: f64,
}

/// Aggregate view of where attention went during a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazeStatistics {
    pub total_points: usize,
    pub x: DistributionStats,
    pub y: DistributionStats,
    pub range_x: f64,
    pub range_y: f64,

    /// Mean gaze position.
    pub attention_center: GazePoint,

    /// Per-axis population standard deviation around the center.
    pub attention_spread: GazePoint,

    /// Confidence-weighted non-empty cells, ordered by row then column.
    pub heatmap: Vec<HeatmapCell>,

    /// The hottest heatmap cell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotspot: Option<HeatmapCell>,
}

impl GazeStatistics {
    /// Summarize `points`; `None` when no point has finite coordinates.
    pub fn from_points(points: &[GazeEntry], grid_pitch: f64) -> Option<Self> {
        let finite: Vec<&GazeEntry> = points
            .iter()
            .filter(|p| p.x.is_finite() && p.y.is_finite())
            .collect();
        let xs: Vec<f64> = finite.iter().map(|p| p.x).collect();
        let ys: Vec<f64> = finite.iter().map(|p| p.y).collect();

        let x = DistributionStats::from_population(&xs)?;
        let y = DistributionStats::from_population(&ys)?;
        let heatmap = GazeHeatmap::from_gaze(points, grid_pitch);

        Some(Self {
            total_points: finite.len(),
            range_x: x.range(),
            range_y: y.range(),
            attention_center: GazePoint { x: x.mean, y: y.mean },
            attention_spread: GazePoint { x: x.std, y: y.std },
            hotspot: heatmap.hotspot(),
            heatmap: heatmap.cells(),
            x,
            y,
        })
    }
}
