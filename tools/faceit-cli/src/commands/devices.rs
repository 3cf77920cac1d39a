//! List cameras that deliver frames.

use faceit_capture_engine::{FrameSource, GstBackend};
use faceit_common::config::AppConfig;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Probing cameras 0..{}", config.camera.probe_limit);

    let backend = GstBackend::new(&config.camera);
    let devices = FrameSource::list_available_devices(&backend, &config.camera);

    if devices.is_empty() {
        println!("  No camera delivered a frame.");
        return Ok(());
    }
    for device in &devices {
        println!(
            "  [{}] {}x{} @ {:.1}fps",
            device.index, device.width, device.height, device.fps
        );
    }
    Ok(())
}
