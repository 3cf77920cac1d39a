//! Game event statistics.

use std::collections::BTreeMap;

use faceit_session_model::GameEvent;
use serde::{Deserialize, Serialize};

/// A score observed at a point in the session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScorePoint {
    pub timestamp: f64,
    pub score: f64,
}

/// A difficulty transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelChange {
    pub timestamp: f64,
    pub from_level: f64,
    pub to_level: f64,
}

/// Aggregate view of the game events of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStatistics {
    pub total_events: usize,
    pub event_types: BTreeMap<String, usize>,
    pub score_progression: Vec<ScorePoint>,
    pub level_changes: Vec<LevelChange>,
    pub final_score: Option<f64>,
    pub max_level: Option<f64>,
}

impl GameStatistics {
    /// Summarize `events`; `None` when there are none.
    pub fn from_events(events: &[GameEvent]) -> Option<Self> {
        if events.is_empty() {
            return None;
        }

        let mut event_types = BTreeMap::new();
        for event in events {
            *event_types.entry(event.event_type.clone()).or_insert(0) += 1;
        }

        // Stable sort keeps insertion order for equal timestamps.
        let mut ordered: Vec<&GameEvent> = events.iter().collect();
        ordered.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        let score_progression: Vec<ScorePoint> = ordered
            .iter()
            .filter_map(|event| {
                event.score().map(|score| ScorePoint {
                    timestamp: event.timestamp,
                    score,
                })
            })
            .collect();

        let level_changes: Vec<LevelChange> = ordered
            .iter()
            .filter(|event| event.is_difficulty_change())
            .map(|event| LevelChange {
                timestamp: event.timestamp,
                from_level: event.number_or_zero("from"),
                to_level: event.number_or_zero("to"),
            })
            .collect();

        let final_score = score_progression.last().map(|p| p.score);
        let max_level = level_changes
            .iter()
            .map(|c| c.to_level)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))));

        Some(Self {
            total_events: events.len(),
            event_types,
            score_progression,
            level_changes,
            final_score,
            max_level,
        })
    }
}
