//! In-process fakes for the device, sink, and analyzer seams.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use faceit_common::error::{FaceitError, FaceitResult};
use faceit_session_model::{Frame, Reading};
use image::RgbImage;

use crate::analyzer::FrameAnalyzer;
use crate::device::{CaptureDevice, DeviceInfo, DeviceProvider};
use crate::sink::{SinkFactory, VideoSink};

/// A camera that either streams solid frames or never delivers any.
#[derive(Clone)]
pub struct FakeCamera {
    index: u32,
    size: Option<(u32, u32)>,
    fail_every: Option<u64>,
    read_delay: Duration,
    reads: u64,
    total_reads: Arc<AtomicU64>,
    released: Arc<AtomicBool>,
}

impl FakeCamera {
    pub fn streaming(index: u32, width: u32, height: u32) -> Self {
        Self {
            index,
            size: Some((width, height)),
            fail_every: None,
            read_delay: Duration::from_millis(1),
            reads: 0,
            total_reads: Arc::new(AtomicU64::new(0)),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn silent(index: u32) -> Self {
        Self {
            size: None,
            ..Self::streaming(index, 0, 0)
        }
    }

    /// Every `n`-th read after the first returns an error.
    pub fn failing_every(mut self, n: u64) -> Self {
        self.fail_every = Some(n.max(2));
        self
    }

    /// Every read blocks for `delay`.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    /// Reads across every clone handed out for this camera.
    pub fn read_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.total_reads)
    }

    pub fn released_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.released)
    }
}

impl CaptureDevice for FakeCamera {
    fn index(&self) -> u32 {
        self.index
    }

    fn read_frame(&mut self, _timeout: Duration) -> FaceitResult<Option<Frame>> {
        self.reads += 1;
        self.total_reads.fetch_add(1, Ordering::SeqCst);
        let Some((width, height)) = self.size else {
            return Ok(None);
        };
        if self.fail_every.is_some_and(|n| self.reads % n == 0) {
            return Err(FaceitError::capture("simulated read failure"));
        }
        std::thread::sleep(self.read_delay);
        let red = (self.index % 256) as u8;
        Ok(Some(Frame::solid(width, height, [red, (self.reads % 200) as u8, 50])))
    }

    fn request_format(&mut self, _width: u32, _height: u32, _fps: u32) -> FaceitResult<()> {
        Err(FaceitError::capture("format is fixed"))
    }

    fn info(&self) -> DeviceInfo {
        let (width, height) = self.size.unwrap_or((0, 0));
        DeviceInfo {
            index: self.index,
            width,
            height,
            fps: 30.0,
        }
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Hands out clones of pre-registered cameras.
pub struct FakeProvider {
    cameras: HashMap<u32, FakeCamera>,
}

impl FakeProvider {
    pub fn new(cameras: Vec<(u32, FakeCamera)>) -> Self {
        Self {
            cameras: cameras.into_iter().collect(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl DeviceProvider for FakeProvider {
    fn open(&self, index: u32) -> FaceitResult<Box<dyn CaptureDevice>> {
        self.cameras
            .get(&index)
            .cloned()
            .map(|camera| Box::new(camera) as Box<dyn CaptureDevice>)
            .ok_or_else(|| FaceitError::capture(format!("no device at index {index}")))
    }
}

/// What fake sinks observed.
#[derive(Debug, Clone, Default)]
pub struct SinkLog {
    pub opened: Vec<PathBuf>,
    pub sizes: Vec<(u32, u32)>,
    pub closes: usize,
    /// Most sinks that were open at the same time.
    pub max_open: usize,
    open_now: usize,
}

/// Sink factory recording writes in memory.
#[derive(Default)]
pub struct FakeSinkFactory {
    refuse: bool,
    fail_after: Option<u64>,
    close_delay: Option<Duration>,
    log: Arc<Mutex<SinkLog>>,
}

impl FakeSinkFactory {
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    /// Sinks accept `n` frames, then fail every write.
    pub fn failing_after(n: u64) -> Self {
        Self {
            fail_after: Some(n),
            ..Self::default()
        }
    }

    /// Sinks take `delay` to close, like an encoder draining on EOS.
    pub fn with_close_delay(mut self, delay: Duration) -> Self {
        self.close_delay = Some(delay);
        self
    }

    pub fn log(&self) -> SinkLog {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl SinkFactory for FakeSinkFactory {
    fn open(
        &self,
        path: &Path,
        _width: u32,
        _height: u32,
        _fps: u32,
    ) -> FaceitResult<Box<dyn VideoSink>> {
        if self.refuse {
            return Err(FaceitError::sink_open(path, "refused"));
        }
        if let Ok(mut log) = self.log.lock() {
            log.opened.push(path.to_path_buf());
            log.open_now += 1;
            log.max_open = log.max_open.max(log.open_now);
        }
        Ok(Box::new(FakeSink {
            path: path.to_path_buf(),
            written: 0,
            fail_after: self.fail_after,
            close_delay: self.close_delay,
            closed: false,
            log: Arc::clone(&self.log),
        }))
    }
}

struct FakeSink {
    path: PathBuf,
    written: u64,
    fail_after: Option<u64>,
    close_delay: Option<Duration>,
    closed: bool,
    log: Arc<Mutex<SinkLog>>,
}

impl VideoSink for FakeSink {
    fn write(&mut self, frame: &RgbImage) -> FaceitResult<()> {
        if self.fail_after.is_some_and(|n| self.written >= n) {
            return Err(FaceitError::capture("disk full"));
        }
        self.written += 1;
        if let Ok(mut log) = self.log.lock() {
            log.sizes.push(frame.dimensions());
        }
        Ok(())
    }

    fn close(&mut self) -> FaceitResult<()> {
        if !self.closed {
            self.closed = true;
            if let Some(delay) = self.close_delay {
                std::thread::sleep(delay);
            }
            if let Ok(mut log) = self.log.lock() {
                log.closes += 1;
                log.open_now = log.open_now.saturating_sub(1);
            }
        }
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn frames_written(&self) -> u64 {
        self.written
    }
}

/// Analyzer returning its call count, a fixed reading, or nothing.
pub struct CountingAnalyzer {
    name: String,
    calls: u64,
    fixed: Option<Reading>,
    silent: bool,
    refuse_start: bool,
}

impl CountingAnalyzer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: 0,
            fixed: None,
            silent: false,
            refuse_start: false,
        }
    }

    pub fn fixed(name: &str, reading: Reading) -> Self {
        Self {
            fixed: Some(reading),
            ..Self::new(name)
        }
    }

    pub fn silent(name: &str) -> Self {
        Self {
            silent: true,
            ..Self::new(name)
        }
    }

    /// `start` fails with a capture error.
    pub fn refusing_start(name: &str) -> Self {
        Self {
            refuse_start: true,
            ..Self::new(name)
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl FrameAnalyzer for CountingAnalyzer {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&mut self) -> FaceitResult<()> {
        if self.refuse_start {
            return Err(FaceitError::capture("model weights missing"));
        }
        Ok(())
    }

    fn process_frame(&mut self, _frame: &Frame) -> Option<Reading> {
        self.calls += 1;
        if self.silent {
            return None;
        }
        Some(
            self.fixed
                .clone()
                .unwrap_or_else(|| Reading::new().with("calls", self.calls as f64)),
        )
    }
}
