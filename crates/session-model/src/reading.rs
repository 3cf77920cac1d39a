//! Analyzer readings and the tagged entries a session stores for them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Gaze channel carrying the horizontal coordinate.
pub const GAZE_X: &str = "x";
/// Gaze channel carrying the vertical coordinate.
pub const GAZE_Y: &str = "y";
/// Optional gaze channel carrying the estimator's confidence.
pub const GAZE_CONFIDENCE: &str = "confidence";

/// Confidence assigned to gaze points whose analyzer reports none.
pub const DEFAULT_GAZE_CONFIDENCE: f64 = 1.0;

/// Prefix identifying facial action-unit channels (`AU01`, `AU12`, ...).
pub const ACTION_UNIT_PREFIX: &str = "AU";

/// Emotion labels produced by the emotion analyzer.
pub const EMOTION_LABELS: [&str; 7] = [
    "anger",
    "disgust",
    "fear",
    "happiness",
    "sadness",
    "surprise",
    "neutral",
];

/// Whether a channel name denotes a facial action unit.
pub fn is_action_unit(channel: &str) -> bool {
    channel.starts_with(ACTION_UNIT_PREFIX)
}

/// Structured numeric output of an analyzer for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reading {
    channels: BTreeMap<String, f64>,
}

impl Reading {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style channel insertion.
    pub fn with(mut self, channel: impl Into<String>, value: f64) -> Self {
        self.channels.insert(channel.into(), value);
        self
    }

    /// A gaze reading without confidence.
    pub fn gaze(x: f64, y: f64) -> Self {
        Self::new().with(GAZE_X, x).with(GAZE_Y, y)
    }

    pub fn insert(&mut self, channel: impl Into<String>, value: f64) {
        self.channels.insert(channel.into(), value);
    }

    pub fn get(&self, channel: &str) -> Option<f64> {
        self.channels.get(channel).copied()
    }

    pub fn channels(&self) -> &BTreeMap<String, f64> {
        &self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Interpret the reading as a gaze point `(x, y, confidence)`.
    ///
    /// Returns `None` when either coordinate is missing.
    pub fn as_gaze_point(&self) -> Option<(f64, f64, f64)> {
        let x = self.get(GAZE_X)?;
        let y = self.get(GAZE_Y)?;
        let confidence = self
            .get(GAZE_CONFIDENCE)
            .unwrap_or(DEFAULT_GAZE_CONFIDENCE);
        Some((x, y, confidence))
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Reading {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            channels: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// An emotion reading tagged with its session position.
///
/// Channels are flattened next to the tag fields in the export, so an entry
/// serializes as `{"timestamp":1.2,"frame_number":36,"happiness":0.8,...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionEntry {
    /// Seconds since session start.
    pub timestamp: f64,

    /// Frame count at the time the reading was recorded.
    pub frame_number: u64,

    /// Emotion and action-unit intensities.
    #[serde(flatten)]
    pub channels: BTreeMap<String, f64>,
}

impl EmotionEntry {
    pub fn value(&self, channel: &str) -> Option<f64> {
        self.channels.get(channel).copied()
    }
}

/// A gaze point tagged with its session position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeEntry {
    /// Seconds since session start.
    pub timestamp: f64,

    /// Frame count at the time the reading was recorded.
    pub frame_number: u64,

    pub x: f64,
    pub y: f64,

    /// Estimator confidence; 1.0 when the analyzer does not supply one.
    pub confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaze_point_defaults_confidence() {
        assert_eq!(Reading::gaze(10.0, 20.0).as_gaze_point(), Some((10.0, 20.0, 1.0)));

        let with_conf = Reading::gaze(1.0, 2.0).with(GAZE_CONFIDENCE, 0.25);
        assert_eq!(with_conf.as_gaze_point(), Some((1.0, 2.0, 0.25)));

        let missing_y = Reading::new().with(GAZE_X, 1.0);
        assert_eq!(missing_y.as_gaze_point(), None);
    }

    #[test]
    fn emotion_entry_flattens_channels() {
        let entry = EmotionEntry {
            timestamp: 1.5,
            frame_number: 45,
            channels: [("happiness".to_string(), 0.8), ("AU12".to_string(), 0.6)]
                .into_iter()
                .collect(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["frame_number"], 45);
        assert_eq!(json["happiness"], 0.8);
        assert_eq!(json["AU12"], 0.6);

        let parsed: EmotionEntry = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn action_unit_detection() {
        assert!(is_action_unit("AU04"));
        assert!(!is_action_unit("anger"));
        let reading: Reading = [("fear", 0.1), ("AU01", 0.3)].into_iter().collect();
        assert_eq!(reading.len(), 2);
        assert_eq!(reading.get("fear"), Some(0.1));
    }
}
