//! Show session export information.

use std::collections::BTreeMap;
use std::path::PathBuf;

use faceit_session_model::SessionExport;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let export =
        SessionExport::load(&path).map_err(|e| anyhow::anyhow!("Failed to load export: {e}"))?;
    let info = &export.session_info;

    println!("Session: {}", info.session_id);
    println!("  Started: {}", info.start_datetime);
    if let Some(ref end) = info.end_datetime {
        println!("  Ended: {end}");
    }
    if let Some(duration) = info.duration {
        println!("  Duration: {duration:.1}s");
    }
    if let Some(ref video) = info.video_file {
        println!("  Video: {}", video.display());
    }
    println!();

    println!("Content:");
    println!("  Frames: {}", export.frame_count);
    println!("  Emotion readings: {}", export.emotions.len());
    println!("  Gaze points: {}", export.gaze_points.len());
    println!("  Game events: {}", export.game_events.len());
    println!("  In-memory frames: {}", export.video_frames);

    let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
    for event in &export.game_events {
        *by_type.entry(event.event_type.as_str()).or_default() += 1;
    }
    if !by_type.is_empty() {
        println!();
        println!("Events:");
        for (event_type, count) in by_type {
            println!("  {event_type}: {count}");
        }
    }

    Ok(())
}
