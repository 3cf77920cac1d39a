//! Game events recorded alongside the camera stream.
//!
//! Games emit events asynchronously on their own threads. The frame number
//! attached to an event is the recorder's frame count at insertion time, a
//! best-effort correlation rather than a synchronized join.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event type marking a difficulty level transition.
pub const DIFFICULTY_CHANGE: &str = "difficulty_change";

/// Payload key holding a running score.
pub const SCORE_KEY: &str = "score";

/// Free-form event payload.
pub type EventPayload = Map<String, Value>;

/// A discrete game event tagged with its session position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Seconds since session start.
    pub timestamp: f64,

    /// Event type as emitted by the game (e.g. `target_hit`).
    #[serde(rename = "type")]
    pub event_type: String,

    /// Event payload.
    pub data: EventPayload,

    /// Frame count when the event was inserted (approximate).
    pub frame_number: u64,
}

impl GameEvent {
    /// Numeric `score` carried in the payload, if any.
    pub fn score(&self) -> Option<f64> {
        self.data.get(SCORE_KEY).and_then(Value::as_f64)
    }

    /// Numeric payload field, defaulting to zero like the games' own readers.
    pub fn number_or_zero(&self, key: &str) -> f64 {
        self.data.get(key).and_then(Value::as_f64).unwrap_or(0.0)
    }

    pub fn is_difficulty_change(&self) -> bool {
        self.event_type == DIFFICULTY_CHANGE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(event_type: &str, data: Value) -> GameEvent {
        GameEvent {
            timestamp: 2.0,
            event_type: event_type.to_string(),
            data: data.as_object().cloned().unwrap_or_default(),
            frame_number: 60,
        }
    }

    #[test]
    fn score_requires_a_number() {
        assert_eq!(event("target_hit", json!({"score": 12})).score(), Some(12.0));
        assert_eq!(event("target_hit", json!({"score": "12"})).score(), None);
        assert_eq!(event("game_start", json!({})).score(), None);
    }

    #[test]
    fn serializes_type_key() {
        let change = event(DIFFICULTY_CHANGE, json!({"from": 1, "to": 2}));
        let json = serde_json::to_string(&change).unwrap();
        assert!(json.contains("\"type\":\"difficulty_change\""));
        assert!(json.contains("\"frame_number\":60"));
        let e = event(DIFFICULTY_CHANGE, json!({"to": 2}));
        assert!(e.is_difficulty_change());
        assert_eq!(e.number_or_zero("from"), 0.0);
        assert_eq!(e.number_or_zero("to"), 2.0);
    }
}
