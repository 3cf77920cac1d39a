//! H.264/Matroska session video fed through an appsrc.

use std::path::{Path, PathBuf};

use faceit_common::error::{FaceitError, FaceitResult};
use gst::prelude::*;
use gstreamer as gst;
use gstreamer_app as gst_app;
use image::RgbImage;

use super::{drain_eos, escape_path, launch_pipeline, play, rgb_stride, STATE_TIMEOUT};
use crate::sink::VideoSink;

pub struct GstVideoSink {
    path: PathBuf,
    pipeline: gst::Pipeline,
    appsrc: gst_app::AppSrc,
    width: u32,
    height: u32,
    frame_duration_ns: u64,
    written: u64,
    closed: bool,
}

impl GstVideoSink {
    pub fn open(path: &Path, width: u32, height: u32, fps: u32) -> FaceitResult<Self> {
        Self::build(path, width, height, fps)
            .map_err(|e| FaceitError::sink_open(path, e.to_string()))
    }

    fn build(path: &Path, width: u32, height: u32, fps: u32) -> FaceitResult<Self> {
        let fps = fps.max(1);
        let location = escape_path(path);
        // One keyframe every 2 seconds keeps seeking reasonable at low size.
        let keyint = fps.saturating_mul(2).max(2);
        let launch = [
            "appsrc name=src is-live=true".to_string(),
            "videoconvert".to_string(),
            format!("x264enc tune=zerolatency speed-preset=veryfast key-int-max={keyint}"),
            "h264parse".to_string(),
            "matroskamux".to_string(),
            format!("filesink location=\"{location}\""),
        ]
        .join(" ! ");
        let pipeline = launch_pipeline(&launch)?;

        let appsrc = pipeline
            .by_name("src")
            .ok_or_else(|| FaceitError::capture("encoder pipeline has no appsrc"))?
            .dynamic_cast::<gst_app::AppSrc>()
            .map_err(|_| FaceitError::capture("encoder source is not an appsrc"))?;

        let caps = gst::Caps::builder("video/x-raw")
            .field("format", "RGB")
            .field("width", width as i32)
            .field("height", height as i32)
            .field("framerate", gst::Fraction::new(fps as i32, 1))
            .build();
        appsrc.set_caps(Some(&caps));
        appsrc.set_format(gst::Format::Time);

        play(&pipeline, "video-sink", STATE_TIMEOUT)?;
        tracing::info!(path = %path.display(), width, height, fps, "Video sink opened");

        Ok(Self {
            path: path.to_path_buf(),
            pipeline,
            appsrc,
            width,
            height,
            frame_duration_ns: 1_000_000_000 / u64::from(fps),
            written: 0,
            closed: false,
        })
    }
}

impl VideoSink for GstVideoSink {
    fn write(&mut self, frame: &RgbImage) -> FaceitResult<()> {
        if self.closed {
            return Err(FaceitError::capture("video sink closed"));
        }
        if frame.dimensions() != (self.width, self.height) {
            return Err(FaceitError::capture(format!(
                "frame is {}x{}, sink expects {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }

        let mut buffer = gst::Buffer::from_mut_slice(pad_rgb_rows(frame));
        {
            let buf = buffer
                .get_mut()
                .ok_or_else(|| FaceitError::capture("frame buffer is shared"))?;
            buf.set_pts(gst::ClockTime::from_nseconds(self.written * self.frame_duration_ns));
            buf.set_duration(gst::ClockTime::from_nseconds(self.frame_duration_ns));
        }
        self.appsrc
            .push_buffer(buffer)
            .map_err(|e| FaceitError::capture(format!("push failed: {e:?}")))?;
        self.written += 1;
        Ok(())
    }

    fn close(&mut self) -> FaceitResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        // EOS lets the muxer write its index; without it the file is truncated.
        match self.appsrc.end_of_stream() {
            Ok(_) => drain_eos(&self.pipeline, "video-sink", STATE_TIMEOUT),
            Err(e) => tracing::warn!(error = ?e, "Failed to send EOS; output may be truncated"),
        }

        self.pipeline.set_state(gst::State::Null).map_err(|e| {
            FaceitError::capture(format!("Failed to stop video sink pipeline: {e:?}"))
        })?;
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn frames_written(&self) -> u64 {
        self.written
    }
}

impl Drop for GstVideoSink {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Video sink close on drop failed"
            );
        }
    }
}

/// Lay out packed RGB rows with GStreamer's 4-byte row alignment.
pub(crate) fn pad_rgb_rows(frame: &RgbImage) -> Vec<u8> {
    let row = frame.width() as usize * 3;
    let stride = rgb_stride(frame.width());
    if stride == row {
        return frame.as_raw().clone();
    }
    let mut padded = vec![0u8; stride * frame.height() as usize];
    for (y, chunk) in frame.as_raw().chunks_exact(row).enumerate() {
        padded[y * stride..y * stride + row].copy_from_slice(chunk);
    }
    padded
}
