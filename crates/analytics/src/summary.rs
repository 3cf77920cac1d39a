//! The session summary report.

use std::collections::BTreeMap;
use std::path::Path;

use faceit_common::config::AnalyticsConfig;
use faceit_common::error::FaceitResult;
use faceit_session_model::{SessionData, SessionInfo};
use serde::{Deserialize, Serialize};

use crate::emotion::{
    action_unit_statistics, dominant_emotion, emotion_statistics, identify_key_moments,
    ActionUnitStats, EmotionChannelStats, KeyMoment,
};
use crate::game::GameStatistics;
use crate::gaze::GazeStatistics;

/// Frame counts and rates of the recording.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameStatistics {
    pub total_frames: u64,

    /// Frame rate the session was recorded at.
    pub fps: f64,

    /// `total_frames / duration` for finalized sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measured_fps: Option<f64>,
}

/// Derived statistics for one session (`faceit_summary_<stamp>.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_info: SessionInfo,
    pub frame_statistics: FrameStatistics,
    pub emotion_statistics: BTreeMap<String, EmotionChannelStats>,
    pub action_unit_statistics: BTreeMap<String, ActionUnitStats>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gaze_statistics: Option<GazeStatistics>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_statistics: Option<GameStatistics>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dominant_emotion: Option<String>,

    pub key_moments: Vec<KeyMoment>,
}

impl SessionSummary {
    /// Conventional report file name for a `YYYYMMDD_HHMMSS` stamp.
    pub fn file_name(stamp: &str) -> String {
        format!("faceit_summary_{stamp}.json")
    }

    /// Write the report as indented JSON, creating parent directories.
    pub fn write_to(&self, path: &Path) -> FaceitResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        tracing::info!(path = %path.display(), "Summary report saved");
        Ok(())
    }
}

/// Computes a [`SessionSummary`] from session data.
#[derive(Debug, Clone)]
pub struct SessionAnalyzer {
    config: AnalyticsConfig,
    recording_fps: f64,
}

impl SessionAnalyzer {
    pub fn new(config: AnalyticsConfig) -> Self {
        let recording_fps = config.nominal_fps;
        Self {
            config,
            recording_fps,
        }
    }

    /// Report `fps` as the recording frame rate instead of the nominal one.
    pub fn with_recording_fps(mut self, fps: f64) -> Self {
        self.recording_fps = fps;
        self
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Derive every statistic the data supports. Never fails: missing series
    /// yield empty maps or absent sections.
    pub fn summarize(&self, data: &SessionData) -> SessionSummary {
        let emotion_statistics = emotion_statistics(&data.emotions, &self.config);
        let action_unit_statistics = action_unit_statistics(&data.emotions, &self.config);
        let gaze_statistics =
            GazeStatistics::from_points(&data.gaze_points, self.config.heatmap_grid_pitch);
        let game_statistics = GameStatistics::from_events(&data.game_events);
        let dominant_emotion = dominant_emotion(&emotion_statistics);
        let key_moments = identify_key_moments(&data.emotions, self.config.key_moment_threshold);

        let measured_fps = data
            .session_info
            .duration
            .filter(|d| *d > 0.0)
            .map(|d| data.frame_count as f64 / d);

        tracing::debug!(
            session_id = %data.session_info.session_id,
            emotion_channels = emotion_statistics.len(),
            action_units = action_unit_statistics.len(),
            key_moments = key_moments.len(),
            "Session summarized"
        );

        SessionSummary {
            session_info: data.session_info.clone(),
            frame_statistics: FrameStatistics {
                total_frames: data.frame_count,
                fps: self.recording_fps,
                measured_fps,
            },
            emotion_statistics,
            action_unit_statistics,
            gaze_statistics,
            game_statistics,
            dominant_emotion,
            key_moments,
        }
    }
}
