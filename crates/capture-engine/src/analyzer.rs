//! Frame analyzer contract.
//!
//! Emotion and gaze estimators are opaque: they take a frame and may return
//! a [`Reading`]. Slow analyzers throttle themselves; the processing loop
//! never skips ticks on their behalf.

use faceit_common::error::FaceitResult;
use faceit_session_model::{Frame, Reading};

/// An external per-frame estimator.
pub trait FrameAnalyzer: Send {
    fn name(&self) -> &str;

    fn start(&mut self) -> FaceitResult<()> {
        Ok(())
    }

    fn stop(&mut self) {}

    /// Analyze one frame. `None` when nothing could be estimated.
    fn process_frame(&mut self, frame: &Frame) -> Option<Reading>;
}

impl<A: FrameAnalyzer + ?Sized> FrameAnalyzer for Box<A> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn start(&mut self) -> FaceitResult<()> {
        (**self).start()
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn process_frame(&mut self, frame: &Frame) -> Option<Reading> {
        (**self).process_frame(frame)
    }
}

/// Runs the wrapped analyzer on every `every`-th frame and repeats its last
/// reading in between (nothing before the first run).
pub struct FrameSkip<A> {
    inner: A,
    every: u32,
    seen: u64,
    last: Option<Reading>,
}

impl<A: FrameAnalyzer> FrameSkip<A> {
    /// `every` below 1 is treated as 1.
    pub fn new(inner: A, every: u32) -> Self {
        Self {
            inner,
            every: every.max(1),
            seen: 0,
            last: None,
        }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    pub fn into_inner(self) -> A {
        self.inner
    }
}

impl<A: FrameAnalyzer> FrameAnalyzer for FrameSkip<A> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn start(&mut self) -> FaceitResult<()> {
        self.seen = 0;
        self.last = None;
        self.inner.start()
    }

    fn stop(&mut self) {
        self.inner.stop()
    }

    fn process_frame(&mut self, frame: &Frame) -> Option<Reading> {
        let due = self.seen % u64::from(self.every) == 0;
        self.seen += 1;
        if due {
            self.last = self.inner.process_frame(frame);
        }
        self.last.clone()
    }
}
