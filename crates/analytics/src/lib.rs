//! FaceIt Analytics
//!
//! Derives statistics from a recorded session:
//! - **Distribution statistics:** mean, standard deviation, min, max per channel
//! - **Peaks:** local maxima above a minimum height, with their timestamps
//! - **Dwell:** approximate duration a channel stayed above a threshold
//! - **Heatmaps:** sparse grid binning of weighted gaze points
//! - **Game statistics:** event counts, score progression, level changes
//!
//! This crate is pure computation: every function takes session data by
//! reference and never mutates it. Empty series yield `None` or empty
//! collections, never errors.

pub mod emotion;
pub mod game;
pub mod gaze;
pub mod heatmap;
pub mod peaks;
pub mod stats;
pub mod summary;

pub use emotion::{ActionUnitStats, EmotionChannelStats, KeyMoment};
pub use game::GameStatistics;
pub use gaze::GazeStatistics;
pub use heatmap::{GazeHeatmap, HeatmapCell};
pub use peaks::{duration_above_threshold, find_peaks, Peak};
pub use stats::DistributionStats;
pub use summary::{FrameStatistics, SessionAnalyzer, SessionSummary};
