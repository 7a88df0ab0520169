//! Client→server intents.
//!
//! Wire format is internally tagged JSON: `{"type": "joinLobby", ...}` with
//! the payload fields flattened alongside the tag, matching what the web
//! client emits. Tag values and field names are contractual.

use serde::{Deserialize, Serialize};

use crate::{DraftMode, LobbyCode, PlayerId, TeamId, UserData, Winner};

fn default_true() -> bool {
    true
}

/// Everything a client can ask the service to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientIntent {
    /// Create a lobby and become its host.
    #[serde(rename_all = "camelCase")]
    CreateLobby {
        user_data: UserData,
        max_players: usize,
        #[serde(default = "default_true")]
        is_public: bool,
        #[serde(default = "default_true")]
        is_ranked: bool,
        #[serde(default)]
        draft_mode: DraftMode,
    },

    /// Join (or rejoin after a disconnect) a lobby by code.
    #[serde(rename_all = "camelCase")]
    JoinLobby { code: LobbyCode, user_data: UserData },

    #[serde(rename_all = "camelCase")]
    LeaveLobby { lobby_id: LobbyCode },

    /// Host-only: remove a player from the lobby.
    #[serde(rename_all = "camelCase")]
    KickPlayer {
        lobby_id: LobbyCode,
        odiscord_id: PlayerId,
    },

    #[serde(rename_all = "camelCase")]
    WhitelistPlayer {
        lobby_id: LobbyCode,
        odiscord_id: PlayerId,
    },

    #[serde(rename_all = "camelCase")]
    UnwhitelistPlayer {
        lobby_id: LobbyCode,
        odiscord_id: PlayerId,
    },

    /// Host-only: bar a player from joining *any* lobby for `duration`
    /// minutes.
    #[serde(rename_all = "camelCase")]
    TimeoutPlayer {
        odiscord_id: PlayerId,
        duration: u64,
        #[serde(default)]
        reason: Option<String>,
    },

    /// Host-only: change one or both team colors (0–7).
    #[serde(rename_all = "camelCase")]
    SetTeamColors {
        lobby_id: LobbyCode,
        #[serde(default)]
        team1_color: Option<u8>,
        #[serde(default)]
        team2_color: Option<u8>,
    },

    /// Host-only: leave `waiting` and begin forming teams.
    #[serde(rename_all = "camelCase")]
    StartCaptainSelect { lobby_id: LobbyCode },

    /// Host-only: promote a member to captain. The second selection
    /// advances the lobby into its draft mode.
    #[serde(rename_all = "camelCase")]
    SelectCaptain {
        lobby_id: LobbyCode,
        odiscord_id: PlayerId,
    },

    #[serde(rename_all = "camelCase")]
    RemoveCaptain {
        lobby_id: LobbyCode,
        odiscord_id: PlayerId,
    },

    /// Captain-only: pick an unassigned player for your team.
    #[serde(rename_all = "camelCase")]
    DraftPick {
        lobby_id: LobbyCode,
        odiscord_id: PlayerId,
    },

    /// Captain-only: bid on the player currently up for auction.
    #[serde(rename_all = "camelCase")]
    PlaceBid { lobby_id: LobbyCode, amount: u32 },

    /// Host-only: award a round point to a team.
    #[serde(rename_all = "camelCase")]
    AddScore { lobby_id: LobbyCode, team: TeamId },

    /// Host-only: end the match with an explicit outcome.
    #[serde(rename_all = "camelCase")]
    DeclareWinner {
        lobby_id: LobbyCode,
        winner_team: Winner,
    },

    /// Host-only: loop a finished lobby back to `waiting`.
    #[serde(rename_all = "camelCase")]
    ResetLobby { lobby_id: LobbyCode },

    #[serde(rename_all = "camelCase")]
    CloseLobby { lobby_id: LobbyCode },

    /// Query voice-channel presence for the lobby's members.
    #[serde(rename = "checkVCStatus", rename_all = "camelCase")]
    CheckVcStatus { lobby_id: LobbyCode },

    /// List public lobbies for the browse page.
    GetPublicLobbies,
}
