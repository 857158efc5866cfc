//! Merge and classification view over a match analysis.
//!
//! Pure projection: scored and hidden participants are merged into one
//! tagged roster per team, ordered by lane, and summarized into a per-team
//! threat level. No I/O and no dependence on anything but the input.

use serde::Serialize;

use scry_types::analysis::{AnalyzedPlayer, HiddenPlayer, MatchAnalysis, SmurfClassification};
use scry_types::live::{Position, BLUE_TEAM_ID, RED_TEAM_ID};

pub const NO_PLAYER_DATA: &str = "No player data available";
pub const NO_SMURFS_DETECTED: &str = "No smurfs detected";

/// One roster row: a scored player or a streamer-mode placeholder.
///
/// Hidden players stay a separate variant so nothing downstream can read a
/// classification off them by accident.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum RosterSlot {
    Analyzed(AnalyzedPlayer),
    Hidden(HiddenPlayer),
}

impl RosterSlot {
    pub fn position(&self) -> Position {
        match self {
            RosterSlot::Analyzed(player) => player.position,
            RosterSlot::Hidden(player) => player.position,
        }
    }

    pub fn classification(&self) -> Option<SmurfClassification> {
        match self {
            RosterSlot::Analyzed(player) => Some(player.classification),
            RosterSlot::Hidden(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ThreatLevel {
    High,
    Medium,
    Low,
}

impl ThreatLevel {
    pub fn label(self) -> &'static str {
        match self {
            ThreatLevel::High => "HIGH",
            ThreatLevel::Medium => "MEDIUM",
            ThreatLevel::Low => "LOW",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamSummary {
    pub likely_count: usize,
    pub possible_count: usize,
    /// `None` means no likely or possible smurfs at all, which renders as
    /// the fixed "no smurfs" label no matter how many players are UNKNOWN.
    pub threat: Option<ThreatLevel>,
}

impl TeamSummary {
    fn from_slots(slots: &[RosterSlot]) -> Self {
        let likely_count = slots
            .iter()
            .filter(|slot| slot.classification() == Some(SmurfClassification::LikelySmurf))
            .count();
        let possible_count = slots
            .iter()
            .filter(|slot| slot.classification() == Some(SmurfClassification::PossibleSmurf))
            .count();

        let threat = if likely_count == 0 && possible_count == 0 {
            None
        } else {
            let score = 2 * likely_count + possible_count;
            Some(if score >= 4 {
                ThreatLevel::High
            } else if score >= 2 {
                ThreatLevel::Medium
            } else {
                ThreatLevel::Low
            })
        };

        Self {
            likely_count,
            possible_count,
            threat,
        }
    }

    pub fn label(&self) -> String {
        match self.threat {
            None => NO_SMURFS_DETECTED.to_string(),
            Some(threat) => format!(
                "{} likely, {} possible ({} threat)",
                self.likely_count,
                self.possible_count,
                threat.label()
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamView {
    pub slots: Vec<RosterSlot>,
    pub summary: TeamSummary,
}

impl TeamView {
    fn build(analyzed: &[AnalyzedPlayer], hidden: Vec<&HiddenPlayer>) -> Self {
        let mut slots: Vec<RosterSlot> = analyzed
            .iter()
            .cloned()
            .map(RosterSlot::Analyzed)
            .collect();
        slots.extend(hidden.into_iter().cloned().map(RosterSlot::Hidden));
        // Vec::sort_by_key is stable, so equal positions keep input order.
        slots.sort_by_key(|slot| slot.position().sort_rank());
        let summary = TeamSummary::from_slots(&slots);
        Self { slots, summary }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchView {
    pub game_id: u64,
    pub game_mode: String,
    pub blue: TeamView,
    pub red: TeamView,
}

/// Deterministic projection of a match analysis into per-team rosters and
/// summaries. Total over any well-formed input, including teams with no
/// visible players.
pub fn render(analysis: &MatchAnalysis) -> MatchView {
    let blue_hidden: Vec<&HiddenPlayer> = analysis
        .hidden_players
        .iter()
        .filter(|hidden| hidden.team_id == BLUE_TEAM_ID)
        .collect();
    let red_hidden: Vec<&HiddenPlayer> = analysis
        .hidden_players
        .iter()
        .filter(|hidden| hidden.team_id == RED_TEAM_ID)
        .collect();

    MatchView {
        game_id: analysis.game_id,
        game_mode: analysis.game_mode.clone(),
        blue: TeamView::build(&analysis.blue_team, blue_hidden),
        red: TeamView::build(&analysis.red_team, red_hidden),
    }
}
