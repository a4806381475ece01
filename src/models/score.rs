use serde::{Deserialize, Serialize};

/// Per-player total as returned by the scoring service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Punkte")]
    pub total_points: i64,
}

impl ScoreResult {
    pub fn new(name: impl Into<String>, total_points: i64) -> Self {
        Self {
            name: name.into(),
            total_points,
        }
    }
}

/// A superlative derived from one scoring run. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Award {
    pub winner_name: String,
    pub label: String,
    pub points: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Awards {
    pub top_scorer: Award,
    pub underdog: Award,
}
