use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::live::Position;

/// Risk classification assigned by the scoring service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SmurfClassification {
    LikelySmurf,
    PossibleSmurf,
    Unlikely,
    Unknown,
}

impl SmurfClassification {
    pub fn label(self) -> &'static str {
        match self {
            SmurfClassification::LikelySmurf => "LIKELY SMURF",
            SmurfClassification::PossibleSmurf => "POSSIBLE SMURF",
            SmurfClassification::Unlikely => "UNLIKELY",
            SmurfClassification::Unknown => "UNKNOWN",
        }
    }
}

/// Scored participant, produced entirely by the scoring service.
///
/// Everything beyond `classification`, `total_score` and `position` is
/// opaque to the pipeline and passed through for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedPlayer {
    pub puuid: String,
    pub riot_id_name: String,
    pub riot_id_tag: String,
    pub summoner_level: u32,
    #[serde(default)]
    pub champion_id: Option<u32>,
    #[serde(default)]
    pub position: Position,
    pub total_score: f64,
    pub classification: SmurfClassification,
    pub confidence: String,
    #[serde(default)]
    pub indicator_scores: BTreeMap<String, Option<f64>>,
    #[serde(default)]
    pub raw_metrics: serde_json::Value,
    pub analyzed_at: DateTime<Utc>,
}

/// Streamer-mode participant the platform declines to expose.
///
/// Kept as its own shape so it can never be mistaken for a scored player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiddenPlayer {
    #[serde(default)]
    pub champion_id: Option<u32>,
    #[serde(default)]
    pub position: Position,
    pub team_id: u16,
    #[serde(default = "default_hidden")]
    pub is_hidden: bool,
}

fn default_hidden() -> bool {
    true
}

/// Full analysis of an active game. `blue_team`, `red_team` and
/// `hidden_players` together cover every participant exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchAnalysis {
    pub game_id: u64,
    pub game_mode: String,
    pub blue_team: Vec<AnalyzedPlayer>,
    pub red_team: Vec<AnalyzedPlayer>,
    #[serde(default)]
    pub hidden_players: Vec<HiddenPlayer>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_analysis_wire_shape() {
        let raw = r#"{
            "game_id": 7201449317,
            "game_mode": "Ranked Solo/Duo",
            "blue_team": [{
                "puuid": "p1",
                "riot_id_name": "TopDiff",
                "riot_id_tag": "NA1",
                "summoner_level": 44,
                "champion_id": 266,
                "position": "TOP",
                "total_score": 82.5,
                "classification": "LIKELY_SMURF",
                "confidence": "high",
                "indicator_scores": {"winrate": 91.0, "kda": null},
                "raw_metrics": {"games_analyzed": 5},
                "analyzed_at": "2026-08-07T10:15:00Z"
            }],
            "red_team": [],
            "hidden_players": [{
                "champion_id": null,
                "position": "UNKNOWN",
                "team_id": 200,
                "is_hidden": true
            }]
        }"#;
        let analysis: MatchAnalysis = serde_json::from_str(raw).expect("decode analysis");
        assert_eq!(analysis.game_id, 7201449317);
        let player = &analysis.blue_team[0];
        assert_eq!(player.classification, SmurfClassification::LikelySmurf);
        assert_eq!(player.position, Position::Top);
        assert_eq!(player.indicator_scores.get("winrate"), Some(&Some(91.0)));
        assert_eq!(player.indicator_scores.get("kda"), Some(&None));
        assert_eq!(analysis.hidden_players[0].team_id, 200);
        assert!(analysis.hidden_players[0].is_hidden);
        assert!(analysis.hidden_players[0].champion_id.is_none());
    }

    #[test]
    fn hidden_players_default_to_empty() {
        let raw = r#"{
            "game_id": 1,
            "game_mode": "ARAM",
            "blue_team": [],
            "red_team": []
        }"#;
        let analysis: MatchAnalysis = serde_json::from_str(raw).expect("decode analysis");
        assert!(analysis.hidden_players.is_empty());
    }
}
