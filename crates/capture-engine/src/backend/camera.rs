//! V4L2 camera read through an appsink.

use std::path::Path;
use std::time::Duration;

use faceit_common::error::{FaceitError, FaceitResult};
use faceit_session_model::Frame;
use gst::prelude::*;
use gstreamer as gst;
use gstreamer_app as gst_app;
use image::RgbImage;

use super::{launch_pipeline, play, rgb_stride};
use crate::device::{CaptureDevice, DeviceInfo};

/// Frame rate reported until the device negotiates one.
const UNKNOWN_FPS: f64 = 0.0;

pub struct GstCamera {
    index: u32,
    pipeline: gst::Pipeline,
    appsink: gst_app::AppSink,
    format: gst::Element,
    info: DeviceInfo,
    released: bool,
}

impl GstCamera {
    /// Open `/dev/video<index>` and start streaming RGB frames.
    pub fn open(index: u32, state_timeout: Duration) -> FaceitResult<Self> {
        let device = device_path(index);
        if !Path::new(&device).exists() {
            return Err(FaceitError::device_unavailable(
                index,
                format!("{device} does not exist"),
            ));
        }

        // The appsink keeps a single buffer and drops older ones: the reader
        // only ever wants the newest frame.
        let launch = [
            format!("v4l2src device=\"{device}\" do-timestamp=true"),
            "videoconvert".to_string(),
            "videoscale".to_string(),
            "videorate".to_string(),
            "capsfilter name=format caps=video/x-raw,format=RGB".to_string(),
            "appsink name=sink max-buffers=1 drop=true sync=false".to_string(),
        ]
        .join(" ! ");
        let pipeline = launch_pipeline(&launch)?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| FaceitError::capture("camera pipeline has no appsink"))?
            .dynamic_cast::<gst_app::AppSink>()
            .map_err(|_| FaceitError::capture("camera sink is not an appsink"))?;
        let format = pipeline
            .by_name("format")
            .ok_or_else(|| FaceitError::capture("camera pipeline has no capsfilter"))?;

        play(&pipeline, &format!("camera-{index}"), state_timeout)
            .map_err(|e| FaceitError::device_unavailable(index, e.to_string()))?;

        tracing::debug!(index, device = %device, "Camera pipeline playing");
        Ok(Self {
            index,
            pipeline,
            appsink,
            format,
            info: DeviceInfo {
                index,
                width: 0,
                height: 0,
                fps: UNKNOWN_FPS,
            },
            released: false,
        })
    }

    fn update_info(&mut self, structure: &gst::StructureRef) {
        let width = structure.get::<i32>("width");
        let height = structure.get::<i32>("height");
        if let (Ok(width), Ok(height)) = (width, height) {
            self.info.width = width.max(0) as u32;
            self.info.height = height.max(0) as u32;
        }
        if let Ok(rate) = structure.get::<gst::Fraction>("framerate") {
            if rate.denom() != 0 && rate.numer() > 0 {
                self.info.fps = f64::from(rate.numer()) / f64::from(rate.denom());
            }
        }
    }
}

impl CaptureDevice for GstCamera {
    fn index(&self) -> u32 {
        self.index
    }

    fn read_frame(&mut self, timeout: Duration) -> FaceitResult<Option<Frame>> {
        if self.released {
            return Err(FaceitError::capture("camera released"));
        }
        let timeout_ns = gst::ClockTime::from_nseconds(timeout.as_nanos() as u64);
        let Some(sample) = self.appsink.try_pull_sample(timeout_ns) else {
            if self.appsink.is_eos() {
                return Err(FaceitError::capture("camera stream ended"));
            }
            return Ok(None);
        };

        let structure = sample
            .caps()
            .and_then(|caps| caps.structure(0))
            .ok_or_else(|| FaceitError::capture("sample without caps"))?;
        self.update_info(structure);

        let buffer = sample
            .buffer()
            .ok_or_else(|| FaceitError::capture("sample without buffer"))?;
        let map = buffer
            .map_readable()
            .map_err(|e| FaceitError::capture(format!("unreadable buffer: {e}")))?;

        let image = unpack_rgb(map.as_slice(), self.info.width, self.info.height)?;
        Ok(Some(Frame::new(image)))
    }

    fn request_format(&mut self, width: u32, height: u32, fps: u32) -> FaceitResult<()> {
        let fps = i32::try_from(fps).map_err(|_| FaceitError::capture("fps out of range"))?;
        let caps = gst::Caps::builder("video/x-raw")
            .field("format", "RGB")
            .field("width", width as i32)
            .field("height", height as i32)
            .field("framerate", gst::Fraction::new(fps, 1))
            .build();
        self.format.set_property("caps", &caps);

        // Confirm the renegotiated stream still delivers; otherwise go back
        // to whatever the device produced before.
        match self.read_frame(Duration::from_secs(2)) {
            Ok(Some(_)) => Ok(()),
            Ok(None) | Err(_) => {
                let fallback = gst::Caps::builder("video/x-raw").field("format", "RGB").build();
                self.format.set_property("caps", &fallback);
                Err(FaceitError::capture(format!(
                    "camera {} did not deliver {width}x{height}@{fps}",
                    self.index
                )))
            }
        }
    }

    fn info(&self) -> DeviceInfo {
        self.info
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            tracing::warn!(index = self.index, error = ?e, "Failed to stop camera pipeline");
        }
    }
}

impl Drop for GstCamera {
    fn drop(&mut self) {
        self.release();
    }
}

fn device_path(index: u32) -> String {
    format!("/dev/video{index}")
}

/// Copy stride-padded RGB rows into a tightly packed image.
pub(crate) fn unpack_rgb(data: &[u8], width: u32, height: u32) -> FaceitResult<RgbImage> {
    let row = width as usize * 3;
    let stride = rgb_stride(width);
    let needed = if height == 0 {
        0
    } else {
        stride * (height as usize - 1) + row
    };
    if width == 0 || height == 0 || data.len() < needed {
        return Err(FaceitError::capture(format!(
            "buffer of {} bytes does not hold {width}x{height} RGB",
            data.len()
        )));
    }

    let mut pixels = Vec::with_capacity(row * height as usize);
    for y in 0..height as usize {
        let start = y * stride;
        pixels.extend_from_slice(&data[start..start + row]);
    }
    RgbImage::from_raw(width, height, pixels)
        .ok_or_else(|| FaceitError::capture("pixel buffer size mismatch"))
}
