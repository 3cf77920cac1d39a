//! Threaded camera acquisition with a single latest-frame slot.
//!
//! The acquisition thread overwrites one shared slot; consumers always get
//! the newest frame and never a backlog. Older unread frames are dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use faceit_common::config::CameraConfig;
use faceit_common::error::{FaceitError, FaceitResult};
use faceit_session_model::Frame;

use crate::device::{CaptureDevice, DeviceInfo, DeviceProvider, DeviceSelection};

/// Poll interval while waiting for the acquisition thread to exit.
const JOIN_POLL: Duration = Duration::from_millis(5);

/// Single-slot overwrite buffer shared between the acquisition thread and
/// its consumers.
#[derive(Debug, Clone, Default)]
pub struct LatestFrame {
    slot: Arc<Mutex<Option<Frame>>>,
}

impl LatestFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the slot contents.
    pub fn store(&self, frame: Frame) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);
    }

    /// Copy of the newest frame, if any has arrived.
    pub fn load(&self) -> Option<Frame> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Continuously reads a camera on a dedicated thread.
pub struct FrameSource {
    provider: Arc<dyn DeviceProvider>,
    config: CameraConfig,
    latest: LatestFrame,
    worker: Option<Acquisition>,
    info: Option<DeviceInfo>,
}

/// One run of the acquisition thread. Every run gets its own stop flag, so a
/// detached thread from an earlier run can never be revived.
struct Acquisition {
    stop: Arc<AtomicBool>,
    handle: thread::JoinHandle<()>,
}

impl FrameSource {
    pub fn new(provider: Arc<dyn DeviceProvider>, config: CameraConfig) -> Self {
        Self {
            provider,
            config,
            latest: LatestFrame::new(),
            worker: None,
            info: None,
        }
    }

    /// Open a camera, verify it yields a frame, and start acquisition.
    ///
    /// An explicit index that cannot be read fails with
    /// [`FaceitError::DeviceUnavailable`]; auto-probing that finds nothing
    /// fails with [`FaceitError::NoDeviceFound`].
    pub fn start(&mut self, selection: DeviceSelection) -> FaceitResult<DeviceInfo> {
        if self.worker.is_some() {
            return Err(FaceitError::capture("Frame source already running"));
        }

        let open_timeout = Duration::from_millis(self.config.open_timeout_ms);
        let (mut device, first_frame) = match selection {
            DeviceSelection::Index(index) => {
                open_verified(self.provider.as_ref(), index, open_timeout)?
            }
            DeviceSelection::Auto => self.probe(open_timeout)?,
        };

        let (width, height, fps) = (self.config.width, self.config.height, self.config.fps);
        if let Err(e) = device.request_format(width, height, fps) {
            tracing::warn!(
                index = device.index(),
                width,
                height,
                fps,
                error = %e,
                "Camera refused requested format; keeping its default"
            );
        }

        let info = device.info();
        self.latest.store(first_frame);

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let latest = self.latest.clone();
        let read_timeout = Duration::from_millis(self.config.read_timeout_ms);
        let retry_delay = Duration::from_millis(self.config.retry_delay_ms);

        let spawned = thread::Builder::new()
            .name(format!("camera-{}", info.index))
            .spawn(move || {
                acquisition_loop(device, latest, thread_stop, read_timeout, retry_delay)
            });

        match spawned {
            Ok(handle) => self.worker = Some(Acquisition { stop, handle }),
            Err(e) => {
                self.latest.clear();
                return Err(FaceitError::capture(format!(
                    "Failed to spawn camera thread: {e}"
                )));
            }
        }

        tracing::info!(
            index = info.index,
            width = info.width,
            height = info.height,
            fps = info.fps,
            "Camera started"
        );
        self.info = Some(info);
        Ok(info)
    }

    /// Newest frame, or `None` before the first successful read.
    pub fn get_frame(&self) -> Option<Frame> {
        self.latest.load()
    }

    /// Shared handle on the latest-frame slot.
    pub fn handle(&self) -> LatestFrame {
        self.latest.clone()
    }

    /// Signal the acquisition thread and wait for it (bounded). The thread
    /// releases the device itself once its last read has returned. Safe to
    /// call at any time, including before `start`.
    pub fn stop(&mut self) {
        let Some(Acquisition { stop, handle }) = self.worker.take() else {
            return;
        };
        stop.store(true, Ordering::SeqCst);

        let timeout = Duration::from_millis(self.config.stop_timeout_ms);
        let deadline = Instant::now() + timeout;
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(JOIN_POLL);
        }

        let index = self.info.map(|info| info.index);
        if handle.is_finished() {
            match handle.join() {
                Ok(()) => tracing::info!(?index, "Camera stopped"),
                Err(_) => tracing::warn!(?index, "Camera thread panicked"),
            }
        } else {
            tracing::warn!(
                ?index,
                timeout_ms = self.config.stop_timeout_ms,
                "Camera thread did not exit in time; detaching"
            );
        }

        self.info = None;
        self.latest.clear();
    }

    /// Format of the running camera.
    pub fn device_info(&self) -> Option<DeviceInfo> {
        self.info
    }

    pub fn is_active(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.handle.is_finished())
    }

    /// Probe `0..probe_limit` and describe every index that yields a frame.
    ///
    /// Each device is opened, test-read, and released immediately.
    pub fn list_available_devices(
        provider: &dyn DeviceProvider,
        config: &CameraConfig,
    ) -> Vec<DeviceInfo> {
        let timeout = Duration::from_millis(config.open_timeout_ms);
        (0..config.probe_limit)
            .filter_map(|index| match open_verified(provider, index, timeout) {
                Ok((mut device, _)) => {
                    let info = device.info();
                    device.release();
                    Some(info)
                }
                Err(e) => {
                    tracing::debug!(index, error = %e, "Camera probe failed");
                    None
                }
            })
            .collect()
    }

    fn probe(&self, timeout: Duration) -> FaceitResult<(Box<dyn CaptureDevice>, Frame)> {
        for index in 0..self.config.probe_limit {
            match open_verified(self.provider.as_ref(), index, timeout) {
                Ok(found) => {
                    tracing::info!(index, "Camera found");
                    return Ok(found);
                }
                Err(e) => tracing::debug!(index, error = %e, "Camera probe failed"),
            }
        }
        Err(FaceitError::NoDeviceFound {
            probed: self.config.probe_limit,
        })
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Open `index` and read one frame to prove the device actually delivers.
fn open_verified(
    provider: &dyn DeviceProvider,
    index: u32,
    timeout: Duration,
) -> FaceitResult<(Box<dyn CaptureDevice>, Frame)> {
    let mut device = provider
        .open(index)
        .map_err(|e| FaceitError::device_unavailable(index, e.to_string()))?;

    match device.read_frame(timeout) {
        Ok(Some(frame)) => Ok((device, frame)),
        Ok(None) => {
            device.release();
            Err(FaceitError::device_unavailable(
                index,
                format!("opened but no frame within {} ms", timeout.as_millis()),
            ))
        }
        Err(e) => {
            device.release();
            Err(FaceitError::device_unavailable(index, e.to_string()))
        }
    }
}

fn acquisition_loop(
    mut device: Box<dyn CaptureDevice>,
    latest: LatestFrame,
    stop: Arc<AtomicBool>,
    read_timeout: Duration,
    retry_delay: Duration,
) {
    let mut failing = false;
    while !stop.load(Ordering::Relaxed) {
        match device.read_frame(read_timeout) {
            Ok(Some(frame)) => {
                if failing {
                    tracing::info!(index = device.index(), "Camera reads recovered");
                    failing = false;
                }
                // A read that returns after stop belongs to a finished run.
                if !stop.load(Ordering::SeqCst) {
                    latest.store(frame);
                }
            }
            Ok(None) => {}
            Err(e) => {
                if !failing {
                    tracing::warn!(
                        index = device.index(),
                        error = %e,
                        "Camera read failed; retrying"
                    );
                    failing = true;
                } else {
                    tracing::trace!(index = device.index(), error = %e, "Camera read failed");
                }
                thread::sleep(retry_delay);
            }
        }
    }
    device.release();
    tracing::debug!(index = device.index(), "Camera released");
}
