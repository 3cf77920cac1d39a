//! Sparse gaze heatmap binning.

use std::collections::HashMap;

use faceit_session_model::GazeEntry;
use serde::{Deserialize, Serialize};

/// One non-empty heatmap bucket.
///
/// `x`/`y` are the cell origin: the point coordinates floored to a multiple
/// of the grid pitch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatmapCell {
    pub x: f64,
    pub y: f64,
    pub weight: f64,
}

/// Weighted point density on a square grid. Only non-empty cells are stored.
#[derive(Debug, Clone)]
pub struct GazeHeatmap {
    pub grid_pitch: f64,
    cells: HashMap<(i64, i64), f64>,
    pub max_weight: f64,
    pub total_weight: f64,
}

impl GazeHeatmap {
    /// Bin `(x, y, weight)` points. A non-positive pitch falls back to 1.0;
    /// points with non-finite coordinates or weights are skipped.
    pub fn from_points<I>(points: I, grid_pitch: f64) -> Self
    where
        I: IntoIterator<Item = (f64, f64, f64)>,
    {
        let grid_pitch = if grid_pitch > 0.0 && grid_pitch.is_finite() {
            grid_pitch
        } else {
            tracing::warn!(grid_pitch, "Invalid heatmap grid pitch, using 1.0");
            1.0
        };

        let mut cells: HashMap<(i64, i64), f64> = HashMap::new();
        for (x, y, weight) in points {
            if !(x.is_finite() && y.is_finite() && weight.is_finite()) {
                continue;
            }
            let key = (
                (x / grid_pitch).floor() as i64,
                (y / grid_pitch).floor() as i64,
            );
            *cells.entry(key).or_insert(0.0) += weight;
        }

        let max_weight = cells.values().copied().fold(0.0_f64, f64::max);
        let total_weight = cells.values().sum();
        Self {
            grid_pitch,
            cells,
            max_weight,
            total_weight,
        }
    }

    /// Unweighted point counts.
    pub fn from_xy<I>(points: I, grid_pitch: f64) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        Self::from_points(points.into_iter().map(|(x, y)| (x, y, 1.0)), grid_pitch)
    }

    /// Gaze points weighted by their confidence.
    pub fn from_gaze(points: &[GazeEntry], grid_pitch: f64) -> Self {
        Self::from_points(points.iter().map(|p| (p.x, p.y, p.confidence)), grid_pitch)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Weight of the cell containing `(x, y)`.
    pub fn cell_at(&self, x: f64, y: f64) -> Option<f64> {
        let key = (
            (x / self.grid_pitch).floor() as i64,
            (y / self.grid_pitch).floor() as i64,
        );
        self.cells.get(&key).copied()
    }

    /// Cell weight divided by the hottest cell's weight.
    pub fn normalized_at(&self, x: f64, y: f64) -> Option<f64> {
        let value = self.cell_at(x, y)?;
        if self.max_weight <= 0.0 {
            return Some(0.0);
        }
        Some(value / self.max_weight)
    }

    /// Non-empty cells ordered by row, then column.
    pub fn cells(&self) -> Vec<HeatmapCell> {
        let mut keys: Vec<&(i64, i64)> = self.cells.keys().collect();
        keys.sort_by_key(|(cx, cy)| (*cy, *cx));
        keys.into_iter()
            .map(|key| HeatmapCell {
                x: key.0 as f64 * self.grid_pitch,
                y: key.1 as f64 * self.grid_pitch,
                weight: self.cells[key],
            })
            .collect()
    }

    /// The hottest cell, ties broken by position.
    pub fn hotspot(&self) -> Option<HeatmapCell> {
        self.cells()
            .into_iter()
            .fold(None, |best: Option<HeatmapCell>, cell| match best {
                Some(b) if b.weight >= cell.weight => Some(b),
                _ => Some(cell),
            })
    }
}
