//! The session aggregate and its sanitized export.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use faceit_common::error::{FaceitError, FaceitResult};
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::event::GameEvent;
use crate::reading::{EmotionEntry, GazeEntry};

/// Session identity and lifecycle stamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// `session_<unix seconds>` of the start time.
    pub session_id: String,

    /// Start time as fractional unix seconds.
    pub start_time: f64,

    /// Start time (RFC 3339).
    pub start_datetime: String,

    /// Stop time as fractional unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,

    /// Stop time (RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_datetime: Option<String>,

    /// `end_time - start_time` in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    /// Persisted video, when a sink was opened for the session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_file: Option<PathBuf>,
}

impl SessionInfo {
    pub fn is_finalized(&self) -> bool {
        self.end_time.is_some()
    }
}

/// Serializable time-series content of a session.
///
/// Invariants maintained by the recorder: `timestamps.len() == frame_count`,
/// timestamps are non-decreasing, and every entry's `frame_number` is at
/// most `frame_count`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub session_info: SessionInfo,
    pub emotions: Vec<EmotionEntry>,
    pub gaze_points: Vec<GazeEntry>,
    pub game_events: Vec<GameEvent>,
    pub timestamps: Vec<f64>,
    pub frame_count: u64,
}

impl SessionData {
    pub fn new(session_info: SessionInfo) -> Self {
        Self {
            session_info,
            ..Self::default()
        }
    }

    /// Whether nothing at all was recorded.
    pub fn is_empty(&self) -> bool {
        self.frame_count == 0 && self.game_events.is_empty()
    }

    /// Check the aggregate invariants, returning a description of the first
    /// violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.timestamps.len() as u64 != self.frame_count {
            return Err(format!(
                "timestamps length {} != frame_count {}",
                self.timestamps.len(),
                self.frame_count
            ));
        }
        if let Some(pos) = self.timestamps.windows(2).position(|w| w[1] < w[0]) {
            return Err(format!("timestamps decrease at index {}", pos + 1));
        }
        let max_tag = self
            .emotions
            .iter()
            .map(|e| e.frame_number)
            .chain(self.gaze_points.iter().map(|g| g.frame_number))
            .chain(self.game_events.iter().map(|e| e.frame_number))
            .max()
            .unwrap_or(0);
        if max_tag > self.frame_count {
            return Err(format!(
                "frame_number {max_tag} exceeds frame_count {}",
                self.frame_count
            ));
        }
        Ok(())
    }
}

/// A frame retained in memory, already normalized to the sink frame size.
#[derive(Debug, Clone)]
pub struct BufferedFrame {
    /// Seconds since session start.
    pub timestamp: f64,

    /// Shared because snapshots clone the frame list.
    pub image: Arc<RgbImage>,
}

/// Immutable copy of a session handed out by the recorder.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub data: SessionData,

    /// In-memory frames (bounded by the recorder's frame cap).
    pub video_frames: Vec<BufferedFrame>,
}

impl SessionSnapshot {
    /// Produce the JSON-safe export of this snapshot.
    ///
    /// Pixel data is replaced by a placeholder naming the frame count, and
    /// values JSON cannot represent (NaN, infinities) are dropped: emotion
    /// channels are removed from their entry, gaze points with a non-finite
    /// coordinate are omitted, and a non-finite confidence falls back to 1.0.
    pub fn to_export(&self) -> SessionExport {
        let data = &self.data;

        let emotions = data
            .emotions
            .iter()
            .map(|entry| EmotionEntry {
                timestamp: entry.timestamp,
                frame_number: entry.frame_number,
                channels: entry
                    .channels
                    .iter()
                    .filter(|(_, v)| v.is_finite())
                    .map(|(k, v)| (k.clone(), *v))
                    .collect(),
            })
            .collect();

        let gaze_points = data
            .gaze_points
            .iter()
            .filter(|g| g.x.is_finite() && g.y.is_finite())
            .map(|g| GazeEntry {
                confidence: if g.confidence.is_finite() {
                    g.confidence
                } else {
                    crate::reading::DEFAULT_GAZE_CONFIDENCE
                },
                ..*g
            })
            .collect();

        SessionExport {
            session_info: data.session_info.clone(),
            video_frames: frames_placeholder(self.video_frames.len()),
            emotions,
            gaze_points,
            game_events: data.game_events.clone(),
            timestamps: data.timestamps.clone(),
            frame_count: data.frame_count,
        }
    }
}

/// Placeholder text that stands in for in-memory frames in an export.
pub fn frames_placeholder(count: usize) -> String {
    format!("Removed {count} frames to reduce file size")
}

/// The textual export of a session (`faceit_session_<stamp>.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionExport {
    pub session_info: SessionInfo,

    /// Placeholder summary; pixel data never reaches the export.
    pub video_frames: String,

    pub emotions: Vec<EmotionEntry>,
    pub gaze_points: Vec<GazeEntry>,
    pub game_events: Vec<GameEvent>,
    pub timestamps: Vec<f64>,
    pub frame_count: u64,
}

impl SessionExport {
    /// Conventional export file name for a `YYYYMMDD_HHMMSS` stamp.
    pub fn file_name(stamp: &str) -> String {
        format!("faceit_session_{stamp}.json")
    }

    /// Write the export as indented UTF-8 JSON, creating parent directories.
    pub fn write_to(&self, path: &Path) -> FaceitResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), frames = self.frame_count, "Session exported");
        Ok(())
    }

    /// Load an export written by [`SessionExport::write_to`].
    pub fn load(path: &Path) -> FaceitResult<Self> {
        if !path.exists() {
            return Err(FaceitError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| FaceitError::export(format!("{}: {e}", path.display())))
    }

    /// Time-series content, for analytics over a loaded export.
    pub fn data(&self) -> SessionData {
        SessionData {
            session_info: self.session_info.clone(),
            emotions: self.emotions.clone(),
            gaze_points: self.gaze_points.clone(),
            game_events: self.game_events.clone(),
            timestamps: self.timestamps.clone(),
            frame_count: self.frame_count,
        }
    }
}
