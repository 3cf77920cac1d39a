//! Record a session.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use faceit_analytics::{SessionAnalyzer, SessionSummary};
use faceit_capture_engine::{DeviceSelection, GstBackend, SessionController, SinkFactory};
use faceit_common::clock::file_stamp_now;
use faceit_common::config::AppConfig;
use faceit_session_model::SessionExport;

pub async fn run(
    mut config: AppConfig,
    camera: Option<u32>,
    duration: Option<f64>,
    output: Option<PathBuf>,
    retain_frames: bool,
) -> anyhow::Result<()> {
    if let Some(dir) = output {
        config.recording.output_dir = dir.clone();
        config.export.export_dir = dir;
    }
    config.recording.retain_frames |= retain_frames;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;
    let limit = duration.map(recording_limit).transpose()?;

    let backend = Arc::new(GstBackend::new(&config.camera));
    let sinks: Arc<dyn SinkFactory> = backend.clone();
    let mut controller = SessionController::new(&config, backend, Some(sinks));

    let selection = DeviceSelection::from(camera.or(config.camera.default_index));
    let started = match controller.start(selection) {
        Ok(started) => started,
        Err(e) if e.is_device_error() => {
            anyhow::bail!("Failed to start session: {e} (run `faceit devices` to list cameras)")
        }
        Err(e) => anyhow::bail!("Failed to start session: {e}"),
    };

    println!("Recording session: {}", started.info.session_id);
    println!(
        "  Camera: [{}] {}x{} @ {:.1}fps",
        started.device.index, started.device.width, started.device.height, started.device.fps
    );
    match &started.info.video_file {
        Some(path) => println!("  Video: {}", path.display()),
        None => println!("  Video: not persisted"),
    }
    match duration {
        Some(secs) => println!("Recording for {secs:.1}s (Ctrl+C stops early)..."),
        None => println!("Press Ctrl+C to stop recording..."),
    }
    println!();

    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    tokio::spawn(async move {
        match limit {
            Some(limit) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = tokio::time::sleep(limit) => {}
                }
            }
            None => {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!(error = %e, "Ctrl+C handler unavailable; stopping");
                }
            }
        }
        flag.store(true, Ordering::SeqCst);
    });

    let stats = controller.run(&stop).await;
    let snapshot = controller.stop();

    let stamp = controller
        .recorder()
        .clock()
        .map(|clock| clock.file_stamp())
        .unwrap_or_else(file_stamp_now);
    let export_dir = &config.export.export_dir;

    let export_path = export_dir.join(SessionExport::file_name(&stamp));
    snapshot
        .to_export()
        .write_to(&export_path)
        .map_err(|e| anyhow::anyhow!("Failed to write export: {e}"))?;

    let summary = SessionAnalyzer::new(config.analytics.clone())
        .with_recording_fps(f64::from(config.recording.fps))
        .summarize(&snapshot.data);
    let summary_path = export_dir.join(SessionSummary::file_name(&stamp));
    summary
        .write_to(&summary_path)
        .map_err(|e| anyhow::anyhow!("Failed to write summary: {e}"))?;

    println!();
    println!("Session finished:");
    println!("  Frames: {}", snapshot.data.frame_count);
    println!(
        "  Loop: {} ticks, {} idle",
        stats.ticks, stats.idle_ticks
    );
    if let Some(duration) = snapshot.data.session_info.duration {
        println!("  Duration: {duration:.1}s");
    }
    println!("  Export: {}", export_path.display());
    println!("  Summary: {}", summary_path.display());

    Ok(())
}

fn recording_limit(secs: f64) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|e| anyhow::anyhow!("Invalid --duration {secs}: {e}"))
}
