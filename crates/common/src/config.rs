//! Application configuration.
//!
//! One explicit `AppConfig` value is built at startup and each component
//! receives the section it needs. Nothing reads configuration from
//! process-wide state.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FaceitError, FaceitResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Camera acquisition settings.
    pub camera: CameraConfig,

    /// Processing loop cadence and analyzer switches.
    pub processing: ProcessingConfig,

    /// Session recorder settings.
    pub recording: RecordingConfig,

    /// Analytics thresholds.
    pub analytics: AnalyticsConfig,

    /// Export locations.
    pub export: ExportConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Camera acquisition parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Explicit device index. `None` probes indices in ascending order.
    pub default_index: Option<u32>,

    /// Requested capture resolution (best effort).
    pub width: u32,
    pub height: u32,

    /// Requested capture frame rate (best effort).
    pub fps: u32,

    /// Number of indices probed during auto-detection (`0..probe_limit`).
    pub probe_limit: u32,

    /// Per-read timeout inside the acquisition thread.
    pub read_timeout_ms: u64,

    /// Timeout for the verification read performed when opening a device.
    pub open_timeout_ms: u64,

    /// Bound on the acquisition thread join during `stop`.
    pub stop_timeout_ms: u64,

    /// Sleep after a failed read before retrying.
    pub retry_delay_ms: u64,
}

/// Processing loop parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Loop iterations per second.
    pub target_fps: u32,

    /// Forward frames to the emotion analyzer.
    pub emotion_enabled: bool,

    /// Forward frames to the gaze analyzer.
    pub gaze_enabled: bool,
}

/// Session recorder parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Directory for persisted session video.
    pub output_dir: PathBuf,

    /// Fixed frame size of the persisted video.
    pub frame_width: u32,
    pub frame_height: u32,

    /// Frame rate declared to the video sink.
    pub fps: u32,

    /// Maximum number of frames retained in memory.
    pub frame_cap: usize,

    /// Whether frames are retained in memory at all.
    pub retain_frames: bool,

    /// Container extension of the persisted video.
    pub video_extension: String,
}

/// Analytics thresholds and grid settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Minimum peak height for emotion channels.
    pub peak_min_height: f64,

    /// Minimum peak height for action-unit channels.
    pub peak_min_height_au: f64,

    /// Heatmap cell size in gaze coordinate units.
    pub heatmap_grid_pitch: f64,

    /// Emotion analyzer subsampling factor (process every Nth frame).
    pub emotion_frame_skip: u32,

    /// Nominal frame rate used to convert sample counts to seconds.
    pub nominal_fps: f64,

    /// Threshold for duration-above-threshold.
    pub duration_threshold: f64,

    /// Threshold above which an action unit counts as active.
    pub au_activation_threshold: f64,

    /// Threshold above which an emotion value is reported as a key moment.
    pub key_moment_threshold: f64,
}

/// Export locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory for session exports and summary reports.
    pub export_dir: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "faceit=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            default_index: None,
            width: 1280,
            height: 720,
            fps: 30,
            probe_limit: 10,
            read_timeout_ms: 100,
            open_timeout_ms: 2_000,
            stop_timeout_ms: 2_000,
            retry_delay_ms: 10,
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            target_fps: 30,
            emotion_enabled: true,
            gaze_enabled: true,
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("recordings"),
            frame_width: 640,
            frame_height: 480,
            fps: 30,
            frame_cap: 1000,
            retain_frames: false,
            video_extension: "mkv".to_string(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            peak_min_height: 0.5,
            peak_min_height_au: 0.5,
            heatmap_grid_pitch: 50.0,
            emotion_frame_skip: 30,
            nominal_fps: 30.0,
            duration_threshold: 0.5,
            au_activation_threshold: 0.5,
            key_moment_threshold: 0.7,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            export_dir: PathBuf::from("exports"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path.
    pub fn load_from(path: &Path) -> FaceitResult<Self> {
        if !path.exists() {
            return Err(FaceitError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> FaceitResult<()> {
        let mut errors = Vec::new();

        if self.camera.width == 0 || self.camera.height == 0 {
            errors.push("camera resolution must be non-zero".to_string());
        }
        if self.camera.fps == 0 {
            errors.push("camera fps must be non-zero".to_string());
        }
        if self.processing.target_fps == 0 {
            errors.push("processing target_fps must be non-zero".to_string());
        }
        if self.recording.frame_width == 0 || self.recording.frame_height == 0 {
            errors.push("recording frame size must be non-zero".to_string());
        }
        if self.recording.fps == 0 {
            errors.push("recording fps must be non-zero".to_string());
        }
        if self.analytics.heatmap_grid_pitch <= 0.0 {
            errors.push("heatmap_grid_pitch must be positive".to_string());
        }
        if self.analytics.emotion_frame_skip == 0 {
            errors.push("emotion_frame_skip must be at least 1".to_string());
        }
        if self.analytics.nominal_fps <= 0.0 {
            errors.push("nominal_fps must be positive".to_string());
        }
        if self.analytics.peak_min_height < 0.0 || self.analytics.peak_min_height_au < 0.0 {
            errors.push("peak thresholds must not be negative".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(FaceitError::config(errors.join("; ")))
        }
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("faceit").join("config.json")
}
