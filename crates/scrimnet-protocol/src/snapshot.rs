//! Full lobby snapshots, broadcast to every member after any mutation.
//!
//! The client is purely presentational: it re-renders from whatever
//! `lobbyUpdate` carries, so the snapshot must describe the entire lobby,
//! including the phase-specific sub-states while they exist.

use serde::{Deserialize, Serialize};

use crate::{DraftMode, LobbyCode, Phase, PlayerId, TeamId};

/// A member as the client renders it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyPlayer {
    pub odiscord_id: PlayerId,
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
    /// Display-only rating snapshot taken at join time; the authoritative
    /// value lives in the external profile store.
    pub elo: i32,
}

/// The two team rosters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Teams {
    pub team1: Vec<LobbyPlayer>,
    pub team2: Vec<LobbyPlayer>,
}

/// Round score per team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Score {
    pub team1: u32,
    pub team2: u32,
}

impl Score {
    /// Score for one team.
    pub fn get(&self, team: TeamId) -> u32 {
        match team {
            TeamId::Team1 => self.team1,
            TeamId::Team2 => self.team2,
        }
    }
}

/// Purge progress, present only during the `purging` phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeSnapshot {
    /// Member count when the purge started.
    pub original_count: usize,
    /// Member count the purge reduces the lobby to.
    pub target_count: usize,
    /// Players eliminated so far, in elimination order.
    pub eliminated: Vec<PlayerId>,
    /// Players exempted this round by an immunity token.
    pub immune: Vec<PlayerId>,
    /// Seconds until the first elimination, while counting down.
    pub countdown_seconds: Option<u64>,
}

/// One resolved auction sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionSale {
    pub odiscord_id: PlayerId,
    pub team: TeamId,
    /// Winning bid; 0 for no-bid fallback assignments.
    pub amount: u32,
}

/// Per-team current bids during an auction window. `None` = no bid yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bids {
    pub team1: Option<u32>,
    pub team2: Option<u32>,
}

/// Per-team remaining auction budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budgets {
    pub team1: u32,
    pub team2: u32,
}

/// Auction progress, present only during the `market` phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionSnapshot {
    /// The player currently up for auction.
    pub current: Option<PlayerId>,
    /// Seconds left in the current bidding window.
    pub seconds_left: Option<u64>,
    pub budgets: Budgets,
    pub bids: Bids,
    /// Sales resolved so far, in auction order.
    pub sold: Vec<AuctionSale>,
}

/// The full lobby state as broadcast in `lobbyUpdate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbySnapshot {
    /// Lobby id — equal to `code`; the client addresses intents by it.
    pub id: LobbyCode,
    pub code: LobbyCode,
    pub host: LobbyPlayer,
    /// All members in join order (includes everyone already on a team).
    pub players: Vec<LobbyPlayer>,
    pub max_players: usize,
    pub is_public: bool,
    pub is_ranked: bool,
    pub draft_mode: DraftMode,
    pub phase: Phase,
    /// Team color ids (0–7), chosen by the host.
    pub team1_color: u8,
    pub team2_color: u8,
    /// 0–2 captains, in selection order (first → team1, second → team2).
    pub captains: Vec<PlayerId>,
    pub teams: Teams,
    /// Team on turn during `drafting`.
    pub current_turn: Option<TeamId>,
    /// Picks remaining during `drafting`.
    pub picks_left: Option<usize>,
    pub score: Score,
    pub whitelist: Vec<PlayerId>,
    #[serde(default)]
    pub purge: Option<PurgeSnapshot>,
    #[serde(default)]
    pub auction: Option<AuctionSnapshot>,
}

/// A public lobby as listed in `lobbiesUpdate` for the browse page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicLobby {
    pub code: LobbyCode,
    pub player_count: usize,
    pub max_players: usize,
    pub phase: Phase,
    pub is_ranked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str) -> LobbyPlayer {
        LobbyPlayer {
            odiscord_id: PlayerId::from(id),
            username: id.to_string(),
            avatar: None,
            elo: 500,
        }
    }

    #[test]
    fn test_snapshot_field_names_match_client() {
        let snap = LobbySnapshot {
            id: LobbyCode("AB3X9".into()),
            code: LobbyCode("AB3X9".into()),
            host: player("h"),
            players: vec![player("h")],
            max_players: 8,
            is_public: true,
            is_ranked: true,
            draft_mode: DraftMode::Turns,
            phase: Phase::Waiting,
            team1_color: 1,
            team2_color: 5,
            captains: vec![],
            teams: Teams::default(),
            current_turn: None,
            picks_left: None,
            score: Score::default(),
            whitelist: vec![],
            purge: None,
            auction: None,
        };
        let json: serde_json::Value = serde_json::to_value(&snap).unwrap();

        // The client reads these exact keys.
        assert_eq!(json["id"], "AB3X9");
        assert_eq!(json["maxPlayers"], 8);
        assert_eq!(json["isRanked"], true);
        assert_eq!(json["draftMode"], "turns");
        assert_eq!(json["team1Color"], 1);
        assert_eq!(json["host"]["odiscordId"], "h");
        assert_eq!(json["players"][0]["elo"], 500);
        assert_eq!(json["score"]["team1"], 0);
        assert!(json["teams"]["team1"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_auction_snapshot_round_trip() {
        let auction = AuctionSnapshot {
            current: Some(PlayerId::from("p1")),
            seconds_left: Some(30),
            budgets: Budgets { team1: 1000, team2: 940 },
            bids: Bids { team1: None, team2: Some(60) },
            sold: vec![AuctionSale {
                odiscord_id: PlayerId::from("p0"),
                team: TeamId::Team2,
                amount: 60,
            }],
        };
        let bytes = serde_json::to_vec(&auction).unwrap();
        let decoded: AuctionSnapshot = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(auction, decoded);
    }

    #[test]
    fn test_score_get_by_team() {
        let score = Score { team1: 3, team2: 1 };
        assert_eq!(score.get(TeamId::Team1), 3);
        assert_eq!(score.get(TeamId::Team2), 1);
    }
}
