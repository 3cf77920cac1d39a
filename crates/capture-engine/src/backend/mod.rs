//! GStreamer implementations of the device and sink seams.
//!
//! Cameras are read through `v4l2src ! ... ! appsink`; session video is
//! encoded through `appsrc ! x264enc ! matroskamux ! filesink`.

pub mod camera;
pub mod encoder;

use std::path::Path;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use faceit_common::config::CameraConfig;
use faceit_common::error::{FaceitError, FaceitResult};
use gst::prelude::*;
use gstreamer as gst;

use crate::device::{CaptureDevice, DeviceProvider};
use crate::sink::{SinkFactory, VideoSink};

pub use camera::GstCamera;
pub use encoder::GstVideoSink;

/// Bound on pipeline state changes and EOS drains.
const STATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens V4L2 cameras and x264/Matroska sinks.
#[derive(Debug, Clone)]
pub struct GstBackend {
    state_timeout: Duration,
}

impl GstBackend {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            state_timeout: Duration::from_millis(config.open_timeout_ms).max(STATE_TIMEOUT),
        }
    }
}

impl Default for GstBackend {
    fn default() -> Self {
        Self::new(&CameraConfig::default())
    }
}

impl DeviceProvider for GstBackend {
    fn open(&self, index: u32) -> FaceitResult<Box<dyn CaptureDevice>> {
        Ok(Box::new(GstCamera::open(index, self.state_timeout)?))
    }
}

impl SinkFactory for GstBackend {
    fn open(
        &self,
        path: &Path,
        width: u32,
        height: u32,
        fps: u32,
    ) -> FaceitResult<Box<dyn VideoSink>> {
        Ok(Box::new(GstVideoSink::open(path, width, height, fps)?))
    }
}

pub(crate) fn init_gstreamer() -> FaceitResult<()> {
    static GST_INIT: OnceLock<Result<(), String>> = OnceLock::new();
    let init_res = GST_INIT.get_or_init(|| gst::init().map_err(|e| e.to_string()));
    match init_res {
        Ok(()) => Ok(()),
        Err(e) => Err(FaceitError::capture(format!(
            "Failed to initialize GStreamer: {e}"
        ))),
    }
}

/// Parse a launch line into a pipeline.
pub(crate) fn launch_pipeline(launch: &str) -> FaceitResult<gst::Pipeline> {
    init_gstreamer()?;
    let element = gst::parse::launch(launch)
        .map_err(|e| FaceitError::capture(format!("Failed to build pipeline: {e}")))?;
    element
        .dynamic_cast::<gst::Pipeline>()
        .map_err(|_| FaceitError::capture("Launch string did not produce a pipeline"))
}

/// Set a pipeline playing and wait for the transition.
pub(crate) fn play(pipeline: &gst::Pipeline, name: &str, timeout: Duration) -> FaceitResult<()> {
    pipeline
        .set_state(gst::State::Playing)
        .map_err(|e| FaceitError::capture(format!("Failed to start {name} pipeline: {e:?}")))?;

    let timeout_ns = gst::ClockTime::from_nseconds(timeout.as_nanos() as u64);
    match pipeline.state(timeout_ns) {
        (Ok(_), gst::State::Playing, _) => Ok(()),
        (Ok(_), state, _) => {
            tracing::warn!(
                pipeline = name,
                ?state,
                "Pipeline did not reach Playing state within timeout"
            );
            Ok(())
        }
        (Err(e), _, _) => {
            let _ = pipeline.set_state(gst::State::Null);
            Err(FaceitError::capture(format!(
                "{name} pipeline failed to reach Playing state: {e:?}"
            )))
        }
    }
}

/// Wait for EOS (or an error) to reach the bus, at most `deadline`.
pub(crate) fn drain_eos(pipeline: &gst::Pipeline, name: &str, deadline: Duration) {
    let Some(bus) = pipeline.bus() else {
        return;
    };
    let start = Instant::now();
    loop {
        let elapsed = start.elapsed();
        if elapsed >= deadline {
            tracing::warn!(pipeline = name, "EOS drain timed out");
            break;
        }
        let remaining = gst::ClockTime::from_nseconds((deadline - elapsed).as_nanos() as u64);
        match bus.timed_pop(remaining) {
            Some(msg) => match msg.view() {
                gst::MessageView::Eos(_) => {
                    tracing::debug!(pipeline = name, "EOS received; pipeline drained");
                    break;
                }
                gst::MessageView::Error(e) => {
                    tracing::warn!(
                        pipeline = name,
                        error = %e.error(),
                        "Pipeline error during EOS drain"
                    );
                    break;
                }
                _ => {}
            },
            None => {
                tracing::warn!(pipeline = name, "EOS drain timed out");
                break;
            }
        }
    }
}

pub(crate) fn escape_path(path: &Path) -> String {
    path.to_string_lossy().replace('"', "\\\"")
}

/// Row stride GStreamer uses for packed RGB: rows padded to 4 bytes.
pub(crate) fn rgb_stride(width: u32) -> usize {
    (width as usize * 3 + 3) & !3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_rows_are_padded_to_four_bytes() {
        assert_eq!(rgb_stride(640), 1920);
        assert_eq!(rgb_stride(5), 16);
        assert_eq!(rgb_stride(1), 4);
    }

    #[test]
    fn quotes_in_paths_are_escaped() {
        assert_eq!(
            escape_path(Path::new("/tmp/a\"b.mkv")),
            "/tmp/a\\\"b.mkv".to_string()
        );
    }
}
