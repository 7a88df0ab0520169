//! Immutable match records and cumulative player profiles.
//!
//! A [`MatchRecord`] is written exactly once when a match finalizes and is
//! never mutated; the profile pages and match-history views render these
//! structures verbatim, so field names are contractual.

use serde::{Deserialize, Serialize};

use scrimnet_protocol::{LobbyCode, PlayerId, TeamId};

/// Per-player combat totals reported by the game server, when available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CombatStats {
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub damage: u64,
    pub healing: u64,
}

/// One participant's row in a match record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPlayer {
    pub odiscord_id: PlayerId,
    pub username: String,
    pub old_elo: i32,
    pub new_elo: i32,
    /// `None` renders as "No stats recorded" on the match page.
    #[serde(default)]
    pub stats: Option<CombatStats>,
}

/// The persisted outcome of one match. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    /// Random hex id assigned at finalization.
    pub id: String,
    pub lobby_code: LobbyCode,
    /// Unix epoch milliseconds.
    pub created_at_ms: u64,
    /// `None` for draws.
    pub winner_team: Option<TeamId>,
    pub is_draw: bool,
    pub is_ranked: bool,
    /// Rating gained per winner. Equals `eloLoss` (zero-sum), 0 for
    /// casual matches.
    pub elo_gain: i32,
    /// Rating lost per loser.
    pub elo_loss: i32,
    /// Winning roster (team1 on a draw).
    pub winners: Vec<MatchPlayer>,
    /// Losing roster (team2 on a draw).
    pub losers: Vec<MatchPlayer>,
}

/// A player's cumulative profile, owned by the external store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    pub odiscord_id: PlayerId,
    pub username: String,
    pub elo: i32,
    pub wins: u32,
    pub losses: u32,
    pub games_played: u32,
    pub total_kills: u32,
    pub total_deaths: u32,
    pub total_assists: u32,
    pub total_damage: u64,
    pub total_healing: u64,
}

impl PlayerProfile {
    /// A fresh profile at the default rating.
    pub fn new(odiscord_id: PlayerId, username: String) -> Self {
        Self {
            odiscord_id,
            username,
            elo: crate::elo::DEFAULT_ELO,
            wins: 0,
            losses: 0,
            games_played: 0,
            total_kills: 0,
            total_deaths: 0,
            total_assists: 0,
            total_damage: 0,
            total_healing: 0,
        }
    }

    /// Folds one match result into the cumulative totals.
    pub fn apply(&mut self, result: &MatchPlayer, won: bool, draw: bool) {
        self.elo = result.new_elo;
        self.games_played += 1;
        if draw {
            // Draws count as a game played, not a win or a loss.
        } else if won {
            self.wins += 1;
        } else {
            self.losses += 1;
        }
        if let Some(stats) = &result.stats {
            self.total_kills += stats.kills;
            self.total_deaths += stats.deaths;
            self.total_assists += stats.assists;
            self.total_damage += stats.damage;
            self.total_healing += stats.healing;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, new_elo: i32, stats: Option<CombatStats>) -> MatchPlayer {
        MatchPlayer {
            odiscord_id: PlayerId::from(id),
            username: id.to_string(),
            old_elo: 500,
            new_elo,
            stats,
        }
    }

    #[test]
    fn test_match_record_field_names_match_client() {
        let record = MatchRecord {
            id: "abc123".into(),
            lobby_code: LobbyCode("AB3X9".into()),
            created_at_ms: 1_700_000_000_000,
            winner_team: Some(TeamId::Team1),
            is_draw: false,
            is_ranked: true,
            elo_gain: 16,
            elo_loss: 16,
            winners: vec![result("w", 516, None)],
            losers: vec![result("l", 484, None)],
        };
        let json: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert_eq!(json["eloGain"], 16);
        assert_eq!(json["eloLoss"], 16);
        assert_eq!(json["isRanked"], true);
        assert_eq!(json["winnerTeam"], "team1");
        assert_eq!(json["winners"][0]["oldElo"], 500);
        assert_eq!(json["winners"][0]["newElo"], 516);
        assert!(json["winners"][0]["stats"].is_null());
    }

    #[test]
    fn test_profile_apply_win_updates_totals() {
        let mut profile = PlayerProfile::new(PlayerId::from("1"), "kira".into());
        let stats = CombatStats {
            kills: 7,
            deaths: 3,
            assists: 2,
            damage: 4200,
            healing: 0,
        };
        profile.apply(&result("1", 516, Some(stats)), true, false);

        assert_eq!(profile.elo, 516);
        assert_eq!(profile.wins, 1);
        assert_eq!(profile.losses, 0);
        assert_eq!(profile.games_played, 1);
        assert_eq!(profile.total_kills, 7);
        assert_eq!(profile.total_damage, 4200);
    }

    #[test]
    fn test_profile_apply_draw_counts_neither_win_nor_loss() {
        let mut profile = PlayerProfile::new(PlayerId::from("1"), "kira".into());
        profile.apply(&result("1", 500, None), false, true);
        assert_eq!(profile.wins, 0);
        assert_eq!(profile.losses, 0);
        assert_eq!(profile.games_played, 1);
    }
}
