//! Persistent video sink seam.

use std::path::{Path, PathBuf};

use faceit_common::error::FaceitResult;
use image::RgbImage;

/// An open video file accepting fixed-size frames.
pub trait VideoSink: Send {
    /// Append one frame. The image must match the size given at open time.
    fn write(&mut self, frame: &RgbImage) -> FaceitResult<()>;

    /// Flush and release the file. Must be idempotent.
    fn close(&mut self) -> FaceitResult<()>;

    fn path(&self) -> &Path;

    fn frames_written(&self) -> u64;
}

/// Opens video sinks.
pub trait SinkFactory: Send + Sync {
    fn open(&self, path: &Path, width: u32, height: u32, fps: u32)
        -> FaceitResult<Box<dyn VideoSink>>;
}

/// `<output_dir>/session_<stamp>.<extension>`
pub fn video_file_path(output_dir: &Path, stamp: &str, extension: &str) -> PathBuf {
    output_dir.join(format!("session_{stamp}.{extension}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_files_are_named_by_stamp() {
        let path = video_file_path(Path::new("recordings"), "20260101_093000", "mkv");
        assert_eq!(path, PathBuf::from("recordings/session_20260101_093000.mkv"));
    }
}
