//! Core identifier and enum types shared across the wire protocol.
//!
//! Everything here is serialized, so the serde attributes define the exact
//! JSON the client sees. Field and variant spellings are part of the
//! protocol contract and must not drift.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A stable player identifier issued by the external identity provider.
///
/// Opaque to the lobby core — we never parse it, only compare and route by
/// it. On the wire it appears as the `odiscordId` field of player objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Returns the raw identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A short human-shareable lobby code (5 uppercase alphanumerics).
///
/// The code doubles as the lobby id: snapshots expose it under both `code`
/// and `id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LobbyCode(pub String);

impl LobbyCode {
    /// Normalizes user input: trims whitespace and uppercases.
    pub fn normalized(raw: &str) -> Self {
        Self(raw.trim().to_ascii_uppercase())
    }

    /// Returns the raw code string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LobbyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

/// One of the two competing teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamId {
    Team1,
    Team2,
}

impl TeamId {
    /// The opposing team.
    pub fn other(self) -> Self {
        match self {
            Self::Team1 => Self::Team2,
            Self::Team2 => Self::Team1,
        }
    }

    /// Index into `[team1, team2]` arrays.
    pub fn index(self) -> usize {
        match self {
            Self::Team1 => 0,
            Self::Team2 => 1,
        }
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Team1 => write!(f, "team1"),
            Self::Team2 => write!(f, "team2"),
        }
    }
}

/// The declared outcome of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Team1,
    Team2,
    Draw,
}

impl Winner {
    /// The winning team, or `None` for a draw.
    pub fn team(self) -> Option<TeamId> {
        match self {
            Self::Team1 => Some(TeamId::Team1),
            Self::Team2 => Some(TeamId::Team2),
            Self::Draw => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Lobby lifecycle
// ---------------------------------------------------------------------------

/// The authoritative lobby lifecycle phase.
///
/// ```text
/// waiting → captain-select → {drafting | market} → playing → finished → waiting
///     └──→ purging ──┘                                            (reset)
/// ```
///
/// `purging` is entered from `waiting` when more players joined than slots
/// allow; it feeds into `captain-select` once eliminations complete.
/// Every phase-gated operation checks this enum first, so an illegal action
/// is rejected with a structured error rather than silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Waiting,
    CaptainSelect,
    Purging,
    Drafting,
    Market,
    Playing,
    Finished,
}

impl Phase {
    /// Returns `true` if new players may join in this phase.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// Returns `true` if team formation (draft or market) is underway.
    pub fn is_forming(&self) -> bool {
        matches!(self, Self::CaptainSelect | Self::Drafting | Self::Market)
    }

    /// Returns `true` if `target` is a legal next phase from `self`.
    ///
    /// Branching transitions (draft vs. market, purge detour) make this a
    /// relation rather than a single `next()` step.
    pub fn can_transition_to(self, target: Self) -> bool {
        use Phase::*;
        matches!(
            (self, target),
            (Waiting, CaptainSelect)
                | (Waiting, Purging)
                | (Purging, CaptainSelect)
                | (CaptainSelect, Drafting)
                | (CaptainSelect, Market)
                | (Drafting, Playing)
                | (Market, Playing)
                | (Playing, Finished)
                | (Finished, Waiting)
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Waiting => "waiting",
            Self::CaptainSelect => "captain-select",
            Self::Purging => "purging",
            Self::Drafting => "drafting",
            Self::Market => "market",
            Self::Playing => "playing",
            Self::Finished => "finished",
        };
        write!(f, "{s}")
    }
}

/// How the two teams are formed after captain selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftMode {
    /// Turn-based snake draft.
    #[default]
    Turns,
    /// Timed open-bid auction.
    Market,
}

// ---------------------------------------------------------------------------
// Player payloads
// ---------------------------------------------------------------------------

/// Identity payload a client attaches to `createLobby`/`joinLobby`.
///
/// Vetted by the external identity provider before it reaches us; the core
/// takes it at face value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub odiscord_id: PlayerId,
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

// ---------------------------------------------------------------------------
// Recipient — who should receive an event?
// ---------------------------------------------------------------------------

/// Specifies who should receive a server event.
///
/// Lobby mutations return `(Recipient, ServerEvent)` pairs; the actor's
/// dispatch loop decides which member channels each pair lands on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Every member of the lobby.
    All,
    /// One specific member.
    Player(PlayerId),
    /// Everyone except the specified member.
    AllExcept(PlayerId),
}

// =========================================================================
// Tests
// =========================================================================
