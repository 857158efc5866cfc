use serde::{Deserialize, Serialize};

/// Resolved identity record returned by the backend.
///
/// `puuid` is the stable join key for the live-game and analysis stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summoner {
    pub puuid: String,
    #[serde(rename = "riot_id_name")]
    pub display_name: String,
    #[serde(rename = "riot_id_tag")]
    pub tag: String,
    #[serde(rename = "summoner_level")]
    pub level: u32,
    #[serde(rename = "solo_tier", default)]
    pub rank_tier: Option<String>,
    #[serde(rename = "solo_rank", default)]
    pub rank_division: Option<String>,
    #[serde(rename = "solo_lp", default)]
    pub league_points: Option<i32>,
}

impl Summoner {
    /// Ranked solo-queue line, e.g. `GOLD II - 45 LP`, when ranked data exists.
    pub fn rank_line(&self) -> Option<String> {
        let tier = self.rank_tier.as_deref()?;
        let mut line = tier.to_string();
        if let Some(division) = self.rank_division.as_deref() {
            line.push(' ');
            line.push_str(division);
        }
        if let Some(lp) = self.league_points {
            line.push_str(&format!(" - {lp} LP"));
        }
        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wire_shape() {
        let raw = r#"{
            "puuid": "abc-123",
            "riot_id_name": "Faker",
            "riot_id_tag": "KR1",
            "summoner_level": 612,
            "profile_icon_id": 6,
            "solo_tier": "CHALLENGER",
            "solo_rank": "I",
            "solo_lp": 1042
        }"#;
        let summoner: Summoner = serde_json::from_str(raw).expect("decode summoner");
        assert_eq!(summoner.puuid, "abc-123");
        assert_eq!(summoner.display_name, "Faker");
        assert_eq!(summoner.level, 612);
        assert_eq!(
            summoner.rank_line().as_deref(),
            Some("CHALLENGER I - 1042 LP")
        );
    }

    #[test]
    fn unranked_summoner_has_no_rank_line() {
        let raw = r#"{
            "puuid": "abc-123",
            "riot_id_name": "FreshAccount",
            "riot_id_tag": "EUW",
            "summoner_level": 34
        }"#;
        let summoner: Summoner = serde_json::from_str(raw).expect("decode summoner");
        assert!(summoner.rank_line().is_none());
    }
}
