//! Capture device seams.
//!
//! A [`DeviceProvider`] opens numbered capture devices; each opened
//! [`CaptureDevice`] is driven by exactly one thread at a time.

use std::time::Duration;

use faceit_common::error::FaceitResult;
use faceit_session_model::Frame;
use serde::{Deserialize, Serialize};

/// Which camera to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceSelection {
    /// Probe indices in ascending order until one yields a frame.
    #[default]
    Auto,
    /// Open exactly this index.
    Index(u32),
}

impl From<Option<u32>> for DeviceSelection {
    fn from(index: Option<u32>) -> Self {
        index.map_or(Self::Auto, Self::Index)
    }
}

/// Negotiated properties of an opened camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// An opened camera.
pub trait CaptureDevice: Send {
    /// Device index this handle was opened with.
    fn index(&self) -> u32;

    /// Block for at most `timeout` waiting for the next frame.
    ///
    /// `Ok(None)` means no frame arrived in time; `Err` means the read
    /// failed. Neither is terminal: callers may retry.
    fn read_frame(&mut self, timeout: Duration) -> FaceitResult<Option<Frame>>;

    /// Ask for a capture resolution and rate. Devices may refuse or
    /// silently deliver something else.
    fn request_format(&mut self, width: u32, height: u32, fps: u32) -> FaceitResult<()>;

    /// Current negotiated format.
    fn info(&self) -> DeviceInfo;

    /// Release the underlying handle. Must be idempotent.
    fn release(&mut self);
}

/// Opens capture devices by index.
pub trait DeviceProvider: Send + Sync {
    fn open(&self, index: u32) -> FaceitResult<Box<dyn CaptureDevice>>;
}
