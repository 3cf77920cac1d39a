//! Session orchestration.
//!
//! Start order is camera, recorder, analyzers, games: a missing camera is
//! reported before anything is recorded. Stop order is camera, games,
//! analyzers, recorder, so the recorder is finalized last and late
//! callbacks are simply ignored.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use faceit_common::config::AppConfig;
use faceit_common::error::FaceitResult;
use faceit_session_model::{SessionInfo, SessionSnapshot};

use crate::analyzer::FrameAnalyzer;
use crate::device::{DeviceInfo, DeviceProvider, DeviceSelection};
use crate::frame_source::FrameSource;
use crate::game::GameEventSource;
use crate::processing::{LoopStats, ProcessingLoop, TickOutcome};
use crate::recorder::SessionRecorder;
use crate::sink::SinkFactory;

/// A started session.
#[derive(Debug, Clone)]
pub struct StartedSession {
    pub device: DeviceInfo,
    pub info: SessionInfo,
}

/// Owns every pipeline component for one recording at a time.
pub struct SessionController {
    source: FrameSource,
    recorder: SessionRecorder,
    processing: ProcessingLoop,
    games: Vec<Box<dyn GameEventSource>>,
    running: bool,
}

impl SessionController {
    pub fn new(
        config: &AppConfig,
        devices: Arc<dyn DeviceProvider>,
        sinks: Option<Arc<dyn SinkFactory>>,
    ) -> Self {
        let source = FrameSource::new(devices, config.camera.clone());
        let recorder = match sinks {
            Some(sinks) => SessionRecorder::new(config.recording.clone(), sinks),
            None => SessionRecorder::in_memory(config.recording.clone()),
        };
        let processing =
            ProcessingLoop::new(config.processing.clone(), source.handle(), recorder.clone());
        Self {
            source,
            recorder,
            processing,
            games: Vec::new(),
            running: false,
        }
    }

    pub fn with_emotion_analyzer(mut self, analyzer: Box<dyn FrameAnalyzer>) -> Self {
        self.processing = self.processing.with_emotion_analyzer(analyzer);
        self
    }

    pub fn with_gaze_analyzer(mut self, analyzer: Box<dyn FrameAnalyzer>) -> Self {
        self.processing = self.processing.with_gaze_analyzer(analyzer);
        self
    }

    pub fn with_game(mut self, game: Box<dyn GameEventSource>) -> Self {
        self.games.push(game);
        self
    }

    /// Start every component. On failure, whatever already started is
    /// stopped again and nothing remains recording.
    pub fn start(&mut self, selection: DeviceSelection) -> FaceitResult<StartedSession> {
        if self.running {
            self.stop();
        }

        let device = self.source.start(selection)?;
        let info = self.recorder.start_session();

        if let Err(e) = self.processing.start_analyzers() {
            self.source.stop();
            self.recorder.stop_session();
            return Err(e);
        }

        let callback = self.recorder.game_event_callback();
        for i in 0..self.games.len() {
            if let Err(e) = self.games[i].start(Arc::clone(&callback)) {
                for game in &mut self.games[..i] {
                    game.stop();
                }
                self.source.stop();
                self.processing.stop_analyzers();
                self.recorder.stop_session();
                return Err(e);
            }
            tracing::info!(game = self.games[i].name(), "Game started");
        }

        self.running = true;
        Ok(StartedSession { device, info })
    }

    /// Run one processing iteration.
    pub fn tick(&mut self) -> TickOutcome {
        self.processing.tick()
    }

    /// Drive the processing loop until `stop` is set.
    pub async fn run(&mut self, stop: &AtomicBool) -> LoopStats {
        self.processing.run(stop).await
    }

    /// Stop everything and return the finalized session.
    ///
    /// Safe to call repeatedly or without a prior start.
    pub fn stop(&mut self) -> SessionSnapshot {
        self.source.stop();
        if self.running {
            for game in &mut self.games {
                game.stop();
            }
            self.processing.stop_analyzers();
        }
        self.running = false;
        self.recorder.stop_session()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn recorder(&self) -> &SessionRecorder {
        &self.recorder
    }

    pub fn frame_source(&self) -> &FrameSource {
        &self.source
    }

    pub fn loop_stats(&self) -> LoopStats {
        self.processing.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CountingAnalyzer, FakeCamera, FakeProvider, FakeSinkFactory};
    use crate::game::GameEventCallback;
    use faceit_common::error::FaceitError;
    use faceit_session_model::EventPayload;

    #[derive(Default)]
    struct ScriptedGame {
        callback: Option<GameEventCallback>,
    }

    impl GameEventSource for ScriptedGame {
        fn name(&self) -> &str {
            "scripted"
        }

        fn start(&mut self, callback: GameEventCallback) -> FaceitResult<()> {
            callback("game_start", EventPayload::new());
            self.callback = Some(callback);
            Ok(())
        }

        fn stop(&mut self) {
            self.callback = None;
        }
    }

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.camera.probe_limit = 2;
        config.camera.read_timeout_ms = 5;
        config.camera.open_timeout_ms = 20;
        config.recording.frame_width = 8;
        config.recording.frame_height = 6;
        config.recording.output_dir = std::env::temp_dir().join("faceit_controller_unit");
        config
    }

    #[test]
    fn missing_camera_fails_before_recording() {
        let provider = Arc::new(FakeProvider::empty());
        let mut controller = SessionController::new(&config(), provider, None);
        let err = controller.start(DeviceSelection::Auto).unwrap_err();
        assert!(matches!(err, FaceitError::NoDeviceFound { .. }));
        assert!(!controller.recorder().is_active());
        assert!(!controller.is_running());
    }

    #[test]
    fn full_lifecycle_records_frames_and_events() {
        let provider = FakeProvider::new(vec![(0, FakeCamera::streaming(0, 16, 12))]);
        let sinks = Arc::new(FakeSinkFactory::default());
        let factory: Arc<dyn SinkFactory> = sinks.clone();
        let mut controller = SessionController::new(&config(), Arc::new(provider), Some(factory))
            .with_emotion_analyzer(Box::new(CountingAnalyzer::new("emotion")))
            .with_game(Box::new(ScriptedGame::default()));

        let started = controller.start(DeviceSelection::Index(0)).unwrap();
        assert_eq!(started.device.index, 0);
        assert!(started.info.video_file.is_some());

        for _ in 0..5 {
            controller.tick();
        }
        let snapshot = controller.stop();

        assert_eq!(snapshot.data.frame_count, 5);
        assert_eq!(snapshot.data.emotions.len(), 5);
        assert_eq!(snapshot.data.game_events[0].event_type, "game_start");
        assert!(snapshot.data.session_info.is_finalized());
        assert_eq!(sinks.log().closes, 1);
        assert!(!controller.frame_source().is_active());

        let again = controller.stop();
        assert_eq!(again.data.frame_count, 5);
    }

    #[test]
    fn stop_without_start_is_a_no_op() {
        let provider = Arc::new(FakeProvider::empty());
        let mut controller = SessionController::new(&config(), provider, None);
        let snapshot = controller.stop();
        assert!(snapshot.data.is_empty());
    }
}
