//! Session recording.
//!
//! The recorder is the single place where camera frames, analyzer readings,
//! and game events are placed on one time axis. Its whole aggregate sits
//! behind one mutex: the processing loop and game threads append
//! concurrently, and update rates are tens per second at most.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use faceit_common::clock::RecordingClock;
use faceit_common::config::RecordingConfig;
use faceit_session_model::{
    BufferedFrame, EmotionEntry, EventPayload, Frame, GameEvent, GazeEntry, Reading,
    SessionData, SessionInfo, SessionSnapshot,
};

use crate::game::GameEventCallback;
use crate::sink::{video_file_path, SinkFactory, VideoSink};

/// Result of an append call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Recorded; `frame_number` is the tag the entry received.
    Appended { frame_number: u64 },
    /// No session is active. Not an error: in-flight callbacks may race a stop.
    Ignored,
}

#[derive(Default)]
struct RecorderState {
    active: bool,
    clock: Option<RecordingClock>,
    data: SessionData,
    frames: Vec<BufferedFrame>,
    sink: Option<Box<dyn VideoSink>>,
    last_timestamp: f64,
}

/// Aggregation authority for one session at a time.
///
/// Cloning yields another handle on the same session.
#[derive(Clone)]
pub struct SessionRecorder {
    config: Arc<RecordingConfig>,
    sinks: Option<Arc<dyn SinkFactory>>,
    state: Arc<Mutex<RecorderState>>,
}

impl SessionRecorder {
    /// Recorder persisting video through `sinks`.
    pub fn new(config: RecordingConfig, sinks: Arc<dyn SinkFactory>) -> Self {
        Self::build(config, Some(sinks))
    }

    /// Recorder that never opens a video sink.
    pub fn in_memory(config: RecordingConfig) -> Self {
        Self::build(config, None)
    }

    fn build(config: RecordingConfig, sinks: Option<Arc<dyn SinkFactory>>) -> Self {
        Self {
            config: Arc::new(config),
            sinks,
            state: Arc::new(Mutex::new(RecorderState::default())),
        }
    }

    pub fn config(&self) -> &RecordingConfig {
        &self.config
    }

    /// Begin a new session anchored to now.
    pub fn start_session(&self) -> SessionInfo {
        self.start_session_with(RecordingClock::start())
    }

    /// Begin a new session anchored to `clock`, replacing any previous one.
    ///
    /// A video sink that fails to open is logged and the session records
    /// in memory only.
    pub fn start_session_with(&self, clock: RecordingClock) -> SessionInfo {
        let mut info = SessionInfo {
            session_id: clock.session_id(),
            start_time: clock.epoch_unix_secs(),
            start_datetime: clock.epoch_rfc3339(),
            ..SessionInfo::default()
        };

        let previous = {
            let mut state = self.lock();
            if state.active {
                tracing::warn!(
                    session_id = %state.data.session_info.session_id,
                    "Replacing a session that was never stopped"
                );
                state.active = false;
                state.sink.take()
            } else {
                None
            }
        };
        // The old file must be finalized before a sink for the new one opens.
        if let Some(mut old) = previous {
            close_sink(old.as_mut());
        }

        let sink = self.open_sink(&clock);
        info.video_file = sink.as_ref().map(|s| s.path().to_path_buf());

        *self.lock() = RecorderState {
            active: true,
            clock: Some(clock),
            data: SessionData::new(info.clone()),
            frames: Vec::new(),
            sink,
            last_timestamp: 0.0,
        };

        tracing::info!(
            session_id = %info.session_id,
            video = ?info.video_file,
            "Session started"
        );
        info
    }

    fn open_sink(&self, clock: &RecordingClock) -> Option<Box<dyn VideoSink>> {
        let factory = self.sinks.as_ref()?;
        let config = &self.config;
        let stamp = clock.file_stamp();
        let mut path = video_file_path(&config.output_dir, &stamp, &config.video_extension);
        // Sessions started within the same second get a numeric suffix.
        let mut suffix = 1;
        while path.exists() {
            let numbered = format!("{stamp}_{suffix}");
            path = video_file_path(&config.output_dir, &numbered, &config.video_extension);
            suffix += 1;
        }

        let opened = ensure_parent(&path).and_then(|()| {
            factory.open(&path, config.frame_width, config.frame_height, config.fps)
        });
        match opened {
            Ok(sink) => Some(sink),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Video sink unavailable; recording in memory only"
                );
                None
            }
        }
    }

    /// Record one processed frame and the readings computed from it.
    ///
    /// Timestamps are clamped so they never decrease. Frames go to the video
    /// sink when one is open and are kept in memory only while below the
    /// frame cap.
    pub fn add_frame_data(
        &self,
        timestamp: Instant,
        frame: &Frame,
        emotion: Option<&Reading>,
        gaze: Option<&Reading>,
    ) -> AppendOutcome {
        let (outcome, failed_sink) = {
            let mut guard = self.lock();
            self.append_frame(&mut guard, timestamp, frame, emotion, gaze)
        };
        // Closing drains the encoder; keep that off the recorder lock.
        if let Some(mut sink) = failed_sink {
            close_sink(sink.as_mut());
        }
        outcome
    }

    fn append_frame(
        &self,
        state: &mut RecorderState,
        timestamp: Instant,
        frame: &Frame,
        emotion: Option<&Reading>,
        gaze: Option<&Reading>,
    ) -> (AppendOutcome, Option<Box<dyn VideoSink>>) {
        if !state.active {
            tracing::trace!("Frame ignored; no active session");
            return (AppendOutcome::Ignored, None);
        }
        let Some(clock) = state.clock.as_ref() else {
            return (AppendOutcome::Ignored, None);
        };

        let relative = clock.relative_secs(timestamp).max(state.last_timestamp);
        state.last_timestamp = relative;
        state.data.timestamps.push(relative);
        state.data.frame_count += 1;
        let frame_number = state.data.frame_count;

        let mut failed_sink = None;
        let config = &self.config;
        let retain = config.retain_frames && state.frames.len() < config.frame_cap;
        if state.sink.is_some() || retain {
            let normalized = frame.resized(config.frame_width, config.frame_height);

            let write_failed = match state.sink.as_mut() {
                Some(sink) => match sink.write(&normalized) {
                    Ok(()) => false,
                    Err(e) => {
                        tracing::warn!(
                            frame_number,
                            error = %e,
                            "Video sink write failed; disabling video for this session"
                        );
                        true
                    }
                },
                None => false,
            };
            if write_failed {
                failed_sink = state.sink.take();
            }

            if retain {
                state.frames.push(BufferedFrame {
                    timestamp: relative,
                    image: Arc::new(normalized),
                });
            }
        }

        if let Some(reading) = emotion {
            state.data.emotions.push(EmotionEntry {
                timestamp: relative,
                frame_number,
                channels: reading.channels().clone(),
            });
        }

        if let Some(reading) = gaze {
            match reading.as_gaze_point() {
                Some((x, y, confidence)) => state.data.gaze_points.push(GazeEntry {
                    timestamp: relative,
                    frame_number,
                    x,
                    y,
                    confidence,
                }),
                None => {
                    tracing::debug!(frame_number, "Gaze reading without coordinates dropped")
                }
            }
        }

        (AppendOutcome::Appended { frame_number }, failed_sink)
    }

    /// Record a game event, tagged with the current frame count.
    ///
    /// The tag approximates which frame the event happened near; it is not a
    /// synchronized join. Event timestamps are not clamped.
    pub fn add_game_event(
        &self,
        timestamp: Instant,
        event_type: &str,
        data: EventPayload,
    ) -> AppendOutcome {
        let mut state = self.lock();
        if !state.active {
            tracing::trace!(event_type, "Game event ignored; no active session");
            return AppendOutcome::Ignored;
        }
        let Some(relative) = state.clock.as_ref().map(|c| c.relative_secs(timestamp)) else {
            return AppendOutcome::Ignored;
        };

        let frame_number = state.data.frame_count;
        state.data.game_events.push(GameEvent {
            timestamp: relative,
            event_type: event_type.to_string(),
            data,
            frame_number,
        });
        tracing::debug!(event_type, frame_number, "Game event recorded");
        AppendOutcome::Appended { frame_number }
    }

    /// Callback handing game events to this recorder, stamped on arrival.
    pub fn game_event_callback(&self) -> GameEventCallback {
        let recorder = self.clone();
        Arc::new(move |event_type: &str, data: EventPayload| {
            recorder.add_game_event(Instant::now(), event_type, data);
        })
    }

    /// Finalize the active session and return its snapshot.
    ///
    /// Stopping again, or without a session, changes nothing and returns the
    /// current (possibly empty) snapshot.
    pub fn stop_session(&self) -> SessionSnapshot {
        let (snapshot, sink) = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let mut sink = None;
            if state.active {
                state.active = false;
                if let Some(clock) = state.clock.as_ref() {
                    let now = Instant::now();
                    let info = &mut state.data.session_info;
                    info.end_time = Some(clock.unix_secs_at(now));
                    info.end_datetime = Some(clock.rfc3339_at(now));
                    info.duration = Some(clock.relative_secs(now));
                }
                sink = state.sink.take();
            }
            (snapshot_of(state), sink)
        };

        if let Some(mut sink) = sink {
            let written = sink.frames_written();
            close_sink(sink.as_mut());
            tracing::info!(path = %sink.path().display(), frames = written, "Video finalized");
        }

        if snapshot.data.session_info.is_finalized() {
            tracing::info!(
                session_id = %snapshot.data.session_info.session_id,
                frames = snapshot.data.frame_count,
                emotions = snapshot.data.emotions.len(),
                gaze_points = snapshot.data.gaze_points.len(),
                events = snapshot.data.game_events.len(),
                "Session stopped"
            );
        }
        snapshot
    }

    /// Copy of the session as recorded so far.
    pub fn snapshot(&self) -> SessionSnapshot {
        snapshot_of(&self.lock())
    }

    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    /// Whether the active session is still persisting video.
    pub fn has_video(&self) -> bool {
        self.lock().sink.is_some()
    }

    pub fn frame_count(&self) -> u64 {
        self.lock().data.frame_count
    }

    /// Clock of the current (or last) session.
    pub fn clock(&self) -> Option<RecordingClock> {
        self.lock().clock.clone()
    }

    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn snapshot_of(state: &RecorderState) -> SessionSnapshot {
    SessionSnapshot {
        data: state.data.clone(),
        video_frames: state.frames.clone(),
    }
}

fn ensure_parent(path: &Path) -> faceit_common::error::FaceitResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn close_sink(sink: &mut dyn VideoSink) {
    if let Err(e) = sink.close() {
        tracing::warn!(path = %sink.path().display(), error = %e, "Video sink close failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeSinkFactory;
    use proptest::prelude::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn small_config() -> RecordingConfig {
        RecordingConfig {
            output_dir: std::env::temp_dir().join("faceit_recorder_unit"),
            frame_width: 8,
            frame_height: 6,
            ..RecordingConfig::default()
        }
    }

    fn at(recorder: &SessionRecorder, millis: u64) -> Instant {
        recorder.clock().unwrap().epoch() + Duration::from_millis(millis)
    }

    #[test]
    fn appends_are_ignored_without_a_session() {
        let recorder = SessionRecorder::in_memory(small_config());
        let frame = Frame::solid(4, 4, [1, 2, 3]);
        assert_eq!(
            recorder.add_frame_data(Instant::now(), &frame, None, None),
            AppendOutcome::Ignored
        );
        assert_eq!(
            recorder.add_game_event(Instant::now(), "score", EventPayload::new()),
            AppendOutcome::Ignored
        );
        assert_eq!(recorder.frame_count(), 0);
    }

    #[test]
    fn readings_are_tagged_with_the_frame_they_belong_to() {
        let recorder = SessionRecorder::in_memory(small_config());
        recorder.start_session();
        let frame = Frame::solid(4, 4, [0, 0, 0]);
        let emotion = Reading::new().with("happiness", 0.7).with("AU12", 0.4);
        let gaze = Reading::gaze(120.0, 80.0);

        recorder.add_frame_data(at(&recorder, 10), &frame, None, None);
        let outcome =
            recorder.add_frame_data(at(&recorder, 43), &frame, Some(&emotion), Some(&gaze));
        assert_eq!(outcome, AppendOutcome::Appended { frame_number: 2 });

        let data = recorder.snapshot().data;
        assert_eq!(data.emotions[0].frame_number, 2);
        assert_eq!(data.emotions[0].value("AU12"), Some(0.4));
        assert_eq!(data.gaze_points[0].confidence, 1.0);
        assert!((data.gaze_points[0].timestamp - 0.043).abs() < 1e-9);
        assert!(data.check_invariants().is_ok());
    }

    #[test]
    fn gaze_without_coordinates_is_dropped() {
        let recorder = SessionRecorder::in_memory(small_config());
        recorder.start_session();
        let frame = Frame::solid(4, 4, [0, 0, 0]);
        let partial = Reading::new().with("x", 3.0);
        recorder.add_frame_data(at(&recorder, 1), &frame, None, Some(&partial));
        let data = recorder.snapshot().data;
        assert_eq!(data.frame_count, 1);
        assert!(data.gaze_points.is_empty());
    }

    #[test]
    fn events_carry_current_frame_count() {
        let recorder = SessionRecorder::in_memory(small_config());
        recorder.start_session();
        let frame = Frame::solid(4, 4, [0, 0, 0]);

        recorder.add_game_event(at(&recorder, 5), "game_start", EventPayload::new());
        recorder.add_frame_data(at(&recorder, 10), &frame, None, None);
        recorder.add_frame_data(at(&recorder, 20), &frame, None, None);
        let callback = recorder.game_event_callback();
        callback("target_hit", EventPayload::new());

        let events = recorder.snapshot().data.game_events;
        assert_eq!(events[0].frame_number, 0);
        assert_eq!(events[1].frame_number, 2);
        assert_eq!(events[1].event_type, "target_hit");
    }

    #[test]
    fn stale_timestamps_are_clamped() {
        let recorder = SessionRecorder::in_memory(small_config());
        recorder.start_session();
        let frame = Frame::solid(4, 4, [0, 0, 0]);
        recorder.add_frame_data(at(&recorder, 100), &frame, None, None);
        recorder.add_frame_data(at(&recorder, 50), &frame, None, None);
        let timestamps = recorder.snapshot().data.timestamps;
        assert_eq!(timestamps, vec![0.1, 0.1]);
    }

    #[test]
    fn memory_is_bounded_by_the_frame_cap() {
        let config = RecordingConfig {
            frame_cap: 1000,
            retain_frames: true,
            ..small_config()
        };
        let recorder = SessionRecorder::in_memory(config);
        recorder.start_session();
        let frame = Frame::solid(8, 6, [9, 9, 9]);
        for i in 0..5000u64 {
            recorder.add_frame_data(at(&recorder, i), &frame, None, None);
        }
        let snapshot = recorder.stop_session();
        assert_eq!(snapshot.video_frames.len(), 1000);
        assert_eq!(snapshot.data.frame_count, 5000);
        assert_eq!(snapshot.data.timestamps.len(), 5000);
    }

    #[test]
    fn frames_are_not_retained_unless_enabled() {
        let recorder = SessionRecorder::in_memory(small_config());
        recorder.start_session();
        let frame = Frame::solid(4, 4, [0, 0, 0]);
        recorder.add_frame_data(at(&recorder, 1), &frame, None, None);
        assert!(recorder.snapshot().video_frames.is_empty());
    }

    #[test]
    fn sink_receives_normalized_frames_and_is_closed_once() {
        let factory = Arc::new(FakeSinkFactory::default());
        let recorder = SessionRecorder::new(small_config(), factory.clone());
        let info = recorder.start_session();
        let path: PathBuf = info.video_file.clone().unwrap();
        assert!(path.to_string_lossy().ends_with(".mkv"));
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("session_"));

        let frame = Frame::solid(32, 24, [1, 1, 1]);
        for i in 0..3 {
            recorder.add_frame_data(at(&recorder, i * 33), &frame, None, None);
        }
        let first = recorder.stop_session();
        let second = recorder.stop_session();

        let log = factory.log();
        assert_eq!(log.sizes, vec![(8, 6); 3]);
        assert_eq!(log.closes, 1);
        assert!(first.data.session_info.is_finalized());
        assert_eq!(first.data.session_info, second.data.session_info);
        assert_eq!(second.data.frame_count, 3);
    }

    #[test]
    fn sink_open_failure_degrades_to_memory() {
        let factory = Arc::new(FakeSinkFactory::refusing());
        let recorder = SessionRecorder::new(small_config(), factory);
        let info = recorder.start_session();
        assert!(info.video_file.is_none());
        assert!(recorder.is_active());
        assert!(!recorder.has_video());

        let frame = Frame::solid(4, 4, [0, 0, 0]);
        recorder.add_frame_data(at(&recorder, 1), &frame, None, None);
        assert_eq!(recorder.stop_session().data.frame_count, 1);
    }

    #[test]
    fn mid_session_write_failure_keeps_recording() {
        let factory = Arc::new(FakeSinkFactory::failing_after(2));
        let recorder = SessionRecorder::new(small_config(), factory.clone());
        recorder.start_session();
        let frame = Frame::solid(8, 6, [0, 0, 0]);
        for i in 0..5 {
            let outcome = recorder.add_frame_data(at(&recorder, i), &frame, None, None);
            assert!(matches!(outcome, AppendOutcome::Appended { .. }));
        }
        assert!(!recorder.has_video());
        assert_eq!(factory.log().closes, 1);
        assert_eq!(recorder.stop_session().data.frame_count, 5);
        assert_eq!(factory.log().closes, 1);
    }

    #[test]
    fn failed_sink_is_closed_outside_the_lock() {
        let slow_close = Duration::from_millis(400);
        let factory = Arc::new(FakeSinkFactory::failing_after(0).with_close_delay(slow_close));
        let recorder = SessionRecorder::new(small_config(), factory.clone());
        recorder.start_session();

        let writer = recorder.clone();
        let frames = std::thread::spawn(move || {
            let frame = Frame::solid(8, 6, [0, 0, 0]);
            writer.add_frame_data(Instant::now(), &frame, None, None)
        });
        std::thread::sleep(Duration::from_millis(50));

        let before = Instant::now();
        recorder.add_game_event(Instant::now(), "target_hit", EventPayload::new());
        assert!(before.elapsed() < Duration::from_millis(200));

        assert!(matches!(frames.join().unwrap(), AppendOutcome::Appended { .. }));
        assert_eq!(factory.log().closes, 1);
        assert_eq!(recorder.snapshot().data.game_events.len(), 1);
    }

    #[test]
    fn replacing_a_session_closes_its_sink_before_opening_the_next() {
        let config = RecordingConfig {
            output_dir: std::env::temp_dir().join("faceit_recorder_replace"),
            ..small_config()
        };
        let _ = std::fs::remove_dir_all(&config.output_dir);
        let factory = Arc::new(FakeSinkFactory::default());
        let recorder = SessionRecorder::new(config, factory.clone());

        let clock = RecordingClock::start();
        recorder.start_session_with(clock.clone());
        recorder.start_session_with(clock);

        let log = factory.log();
        assert_eq!(log.opened.len(), 2);
        assert_eq!(log.closes, 1);
        assert_eq!(log.max_open, 1);
    }

    #[test]
    fn existing_video_files_are_not_overwritten() {
        let config = RecordingConfig {
            output_dir: std::env::temp_dir().join("faceit_recorder_unique"),
            ..small_config()
        };
        let _ = std::fs::remove_dir_all(&config.output_dir);
        std::fs::create_dir_all(&config.output_dir).unwrap();

        let clock = RecordingClock::start();
        let taken = video_file_path(&config.output_dir, &clock.file_stamp(), "mkv");
        std::fs::write(&taken, b"previous").unwrap();

        let recorder = SessionRecorder::new(config.clone(), Arc::new(FakeSinkFactory::default()));
        let info = recorder.start_session_with(clock.clone());
        let expected = video_file_path(
            &config.output_dir,
            &format!("{}_1", clock.file_stamp()),
            "mkv",
        );
        assert_eq!(info.video_file, Some(expected));
        let _ = std::fs::remove_dir_all(&config.output_dir);
    }

    #[test]
    fn stop_without_start_returns_empty_snapshot() {
        let recorder = SessionRecorder::in_memory(small_config());
        let first = recorder.stop_session();
        let second = recorder.stop_session();
        assert!(first.data.is_empty());
        assert!(second.data.is_empty());
        assert!(!first.data.session_info.is_finalized());
    }

    #[test]
    fn restart_resets_the_session() {
        let recorder = SessionRecorder::in_memory(small_config());
        recorder.start_session();
        let frame = Frame::solid(4, 4, [0, 0, 0]);
        recorder.add_frame_data(at(&recorder, 1), &frame, None, None);
        recorder.stop_session();

        recorder.start_session();
        assert_eq!(recorder.frame_count(), 0);
        assert!(recorder.snapshot().data.timestamps.is_empty());
    }

    proptest! {
        #[test]
        fn frame_count_and_timestamps_stay_consistent(
            offsets in proptest::collection::vec(0u64..10_000, 0..200)
        ) {
            let recorder = SessionRecorder::in_memory(small_config());
            recorder.start_session();
            let frame = Frame::solid(2, 2, [0, 0, 0]);
            for ms in &offsets {
                recorder.add_frame_data(at(&recorder, *ms), &frame, None, None);
            }
            let data = recorder.stop_session().data;
            prop_assert_eq!(data.frame_count, offsets.len() as u64);
            prop_assert_eq!(data.timestamps.len(), offsets.len());
            prop_assert!(data.timestamps.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
