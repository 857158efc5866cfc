use serde::{Deserialize, Serialize};

pub const BLUE_TEAM_ID: u16 = 100;
pub const RED_TEAM_ID: u16 = 200;

/// Lane assignment reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Position {
    Top,
    Jungle,
    Mid,
    Bot,
    Support,
    #[default]
    Unknown,
}

impl Position {
    /// Fixed display order: TOP < JUNGLE < MID < BOT < SUPPORT < UNKNOWN.
    pub fn sort_rank(self) -> u8 {
        match self {
            Position::Top => 0,
            Position::Jungle => 1,
            Position::Mid => 2,
            Position::Bot => 3,
            Position::Support => 4,
            Position::Unknown => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Position::Top => "TOP",
            Position::Jungle => "JUNGLE",
            Position::Mid => "MID",
            Position::Bot => "BOT",
            Position::Support => "SUPPORT",
            Position::Unknown => "?",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub puuid: String,
    pub champion_id: u32,
    pub team_id: u16,
    #[serde(default)]
    pub position: Position,
}

/// Active-game payload for a player confirmed to be in a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveGame {
    pub game_id: u64,
    pub game_mode: String,
    #[serde(default)]
    pub participants: Vec<Participant>,
}

/// Definitive live-game verdict. `Absent` is a state, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiveGameMembership {
    Absent,
    Present(LiveGame),
}

impl LiveGameMembership {
    pub fn is_present(&self) -> bool {
        matches!(self, LiveGameMembership::Present(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_order_is_total() {
        let mut positions = vec![
            Position::Unknown,
            Position::Support,
            Position::Bot,
            Position::Mid,
            Position::Jungle,
            Position::Top,
        ];
        positions.sort_by_key(|p| p.sort_rank());
        assert_eq!(
            positions,
            vec![
                Position::Top,
                Position::Jungle,
                Position::Mid,
                Position::Bot,
                Position::Support,
                Position::Unknown,
            ]
        );
    }

    #[test]
    fn participant_position_defaults_to_unknown() {
        let raw = r#"{"puuid": "p1", "champion_id": 266, "team_id": 100}"#;
        let participant: Participant = serde_json::from_str(raw).expect("decode participant");
        assert_eq!(participant.position, Position::Unknown);
    }

    #[test]
    fn position_uses_wire_casing() {
        let decoded: Position = serde_json::from_str("\"JUNGLE\"").expect("decode position");
        assert_eq!(decoded, Position::Jungle);
        assert_eq!(
            serde_json::to_string(&Position::Support).expect("encode position"),
            "\"SUPPORT\""
        );
    }
}
