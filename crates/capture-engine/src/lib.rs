//! FaceIt Capture Engine
//!
//! Acquires camera frames, runs them through analyzers at a fixed cadence,
//! and records the session.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐  latest   ┌────────────────┐        ┌─────────────────┐
//! │  FrameSource  │──frame───▶│ ProcessingLoop │───────▶│ SessionRecorder │
//! │ (own thread)  │   slot    │  (~30 Hz tick) │        │  (one mutex)    │
//! └───────────────┘           └───────┬────────┘        └────────▲────────┘
//!                                     │                          │
//!                           ┌─────────▼─────────┐      ┌─────────┴───────┐
//!                           │ emotion / gaze    │      │ GameEventSource │
//!                           │ FrameAnalyzer     │      │ (own thread)    │
//!                           └───────────────────┘      └─────────────────┘
//! ```

pub mod analyzer;
pub mod backend;
pub mod controller;
pub mod device;
pub mod frame_source;
pub mod game;
pub mod processing;
pub mod recorder;
pub mod sink;

#[cfg(test)]
pub(crate) mod test_support;

pub use analyzer::{FrameAnalyzer, FrameSkip};
pub use backend::GstBackend;
pub use controller::{SessionController, StartedSession};
pub use device::{CaptureDevice, DeviceInfo, DeviceProvider, DeviceSelection};
pub use frame_source::{FrameSource, LatestFrame};
pub use game::{GameEventCallback, GameEventSource};
pub use processing::{LoopStats, ProcessingLoop, TickOutcome};
pub use recorder::{AppendOutcome, SessionRecorder};
pub use sink::{video_file_path, SinkFactory, VideoSink};
