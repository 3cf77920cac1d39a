//! Fixed-cadence processing loop.
//!
//! Each tick takes whatever frame is newest, runs the enabled analyzers on
//! it, and hands the result to the recorder. The loop never reads the
//! device itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use faceit_common::clock::interval_for_hz;
use faceit_common::config::ProcessingConfig;
use faceit_common::error::{FaceitError, FaceitResult};
use tokio::time::MissedTickBehavior;

use crate::analyzer::FrameAnalyzer;
use crate::frame_source::LatestFrame;
use crate::recorder::{AppendOutcome, SessionRecorder};

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No frame has arrived yet.
    Idle,
    /// The frame was analyzed and recorded as `frame_number`.
    Recorded { frame_number: u64 },
    /// The frame was analyzed but no session was active.
    Unrecorded,
}

/// Counters kept across ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub idle_ticks: u64,
    pub processed_frames: u64,
    pub emotion_readings: u64,
    pub gaze_readings: u64,
}

/// Drives frames from the latest-frame slot through analyzers into the
/// recorder.
pub struct ProcessingLoop {
    config: ProcessingConfig,
    frames: LatestFrame,
    recorder: SessionRecorder,
    emotion: Option<Box<dyn FrameAnalyzer>>,
    gaze: Option<Box<dyn FrameAnalyzer>>,
    stats: LoopStats,
}

impl ProcessingLoop {
    pub fn new(config: ProcessingConfig, frames: LatestFrame, recorder: SessionRecorder) -> Self {
        Self {
            config,
            frames,
            recorder,
            emotion: None,
            gaze: None,
            stats: LoopStats::default(),
        }
    }

    pub fn with_emotion_analyzer(mut self, analyzer: Box<dyn FrameAnalyzer>) -> Self {
        self.emotion = Some(analyzer);
        self
    }

    pub fn with_gaze_analyzer(mut self, analyzer: Box<dyn FrameAnalyzer>) -> Self {
        self.gaze = Some(analyzer);
        self
    }

    /// Start every attached analyzer, stopping the ones already started if
    /// one fails. Failures are reported as [`FaceitError::Analyzer`].
    pub fn start_analyzers(&mut self) -> FaceitResult<()> {
        if let Some(emotion) = self.emotion.as_mut() {
            emotion.start().map_err(|e| start_failure(emotion.name(), e))?;
            tracing::info!(analyzer = emotion.name(), "Emotion analyzer started");
        }
        if let Some(gaze) = self.gaze.as_mut() {
            if let Err(e) = gaze.start() {
                if let Some(emotion) = self.emotion.as_mut() {
                    emotion.stop();
                }
                return Err(start_failure(gaze.name(), e));
            }
            tracing::info!(analyzer = gaze.name(), "Gaze analyzer started");
        }
        Ok(())
    }

    pub fn stop_analyzers(&mut self) {
        for analyzer in [self.emotion.as_mut(), self.gaze.as_mut()]
            .into_iter()
            .flatten()
        {
            analyzer.stop();
            tracing::debug!(analyzer = analyzer.name(), "Analyzer stopped");
        }
    }

    /// Run one iteration.
    pub fn tick(&mut self) -> TickOutcome {
        self.stats.ticks += 1;
        let Some(frame) = self.frames.load() else {
            self.stats.idle_ticks += 1;
            return TickOutcome::Idle;
        };
        let timestamp = Instant::now();

        let emotion = match self.emotion.as_mut() {
            Some(analyzer) if self.config.emotion_enabled => analyzer.process_frame(&frame),
            _ => None,
        };
        let gaze = match self.gaze.as_mut() {
            Some(analyzer) if self.config.gaze_enabled => analyzer.process_frame(&frame),
            _ => None,
        };

        self.stats.processed_frames += 1;
        self.stats.emotion_readings += u64::from(emotion.is_some());
        self.stats.gaze_readings += u64::from(gaze.is_some());

        match self
            .recorder
            .add_frame_data(timestamp, &frame, emotion.as_ref(), gaze.as_ref())
        {
            AppendOutcome::Appended { frame_number } => TickOutcome::Recorded { frame_number },
            AppendOutcome::Ignored => TickOutcome::Unrecorded,
        }
    }

    /// Tick at the configured rate until `stop` is set.
    ///
    /// Late ticks are delayed rather than bunched up.
    pub async fn run(&mut self, stop: &AtomicBool) -> LoopStats {
        let mut ticker = tokio::time::interval(interval_for_hz(self.config.target_fps));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(target_fps = self.config.target_fps, "Processing loop started");
        while !stop.load(Ordering::Relaxed) {
            ticker.tick().await;
            if let TickOutcome::Recorded { frame_number } = self.tick() {
                tracing::trace!(frame_number, "Frame processed");
            }
        }
        tracing::info!(
            ticks = self.stats.ticks,
            idle_ticks = self.stats.idle_ticks,
            processed = self.stats.processed_frames,
            "Processing loop stopped"
        );
        self.stats
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn recorder(&self) -> &SessionRecorder {
        &self.recorder
    }
}

fn start_failure(name: &str, error: FaceitError) -> FaceitError {
    match error {
        FaceitError::Analyzer { .. } => error,
        other => FaceitError::analyzer(format!("{name} failed to start: {other}")),
    }
}
