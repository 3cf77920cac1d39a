use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use faceit_session_model::{
    BufferedFrame, EmotionEntry, GameEvent, GazeEntry, SessionData, SessionExport, SessionInfo,
    SessionSnapshot,
};
use image::RgbImage;
use serde_json::json;

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(name);
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn sample_snapshot() -> SessionSnapshot {
    let mut channels = BTreeMap::new();
    channels.insert("happiness".to_string(), 0.9);
    channels.insert("AU06".to_string(), 0.7);

    SessionSnapshot {
        data: SessionData {
            session_info: SessionInfo {
                session_id: "session_1760000000".to_string(),
                start_time: 1_760_000_000.0,
                start_datetime: "2025-10-09T08:53:20+00:00".to_string(),
                end_time: Some(1_760_000_002.0),
                end_datetime: Some("2025-10-09T08:53:22+00:00".to_string()),
                duration: Some(2.0),
                video_file: Some(PathBuf::from("recordings/session_20251009_085320.mkv")),
            },
            emotions: vec![EmotionEntry {
                timestamp: 0.5,
                frame_number: 2,
                channels,
            }],
            gaze_points: vec![GazeEntry {
                timestamp: 0.5,
                frame_number: 2,
                x: 640.0,
                y: 360.0,
                confidence: 1.0,
            }],
            game_events: vec![GameEvent {
                timestamp: 0.7,
                event_type: "target_hit".to_string(),
                data: json!({"score": 10, "points": 10})
                    .as_object()
                    .cloned()
                    .unwrap(),
                frame_number: 2,
            }],
            timestamps: vec![0.0, 0.5],
            frame_count: 2,
        },
        video_frames: vec![BufferedFrame {
            timestamp: 0.0,
            image: Arc::new(RgbImage::new(640, 480)),
        }],
    }
}

#[test]
fn export_file_is_indented_json_with_expected_keys() {
    let dir = temp_dir("faceit_test_export_file");
    let path = dir.join(SessionExport::file_name("20251009_085320"));

    let export = sample_snapshot().to_export();
    export.write_to(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\n  \"session_info\""));
    assert!(text.contains("Removed 1 frames"));
    assert!(!text.contains("\"image\""));

    let loaded = SessionExport::load(&path).unwrap();
    assert_eq!(loaded, export);
    assert_eq!(loaded.data().emotions[0].value("AU06"), Some(0.7));
    assert!(loaded.data().check_invariants().is_ok());

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn load_reports_missing_and_malformed_files() {
    let dir = temp_dir("faceit_test_export_malformed");
    std::fs::create_dir_all(&dir).unwrap();

    assert!(SessionExport::load(&dir.join("absent.json")).is_err());

    let bad = dir.join("bad.json");
    std::fs::write(&bad, "{\"session_info\": 3}").unwrap();
    let err = SessionExport::load(&bad).unwrap_err();
    assert!(err.to_string().contains("bad.json"));

    std::fs::remove_dir_all(&dir).ok();
}
