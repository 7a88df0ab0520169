//! The lobby aggregate: membership, phase machine, and the phase-gated
//! operations that drive it.
//!
//! Everything here is pure state manipulation — no channels, no timers, no
//! I/O. Each operation validates against the current phase, mutates, and
//! returns the events to dispatch, so the whole lifecycle is testable
//! without a runtime. The actor layer owns deadlines and delivery.

use std::time::Duration;

use tokio::time::Instant;

use scrimnet_protocol::{
    DraftMode, LobbyCode, LobbyPlayer, LobbySnapshot, Phase, PlayerId, Recipient, Score,
    ServerEvent, TeamId, Teams, Winner,
};
use scrimnet_rating::{LineupPlayer, MatchOutcome};

use crate::{AuctionState, DraftState, LobbyConfig, LobbyError, PurgeState};

/// Events produced by one lobby operation, in dispatch order.
pub type Events = Vec<(Recipient, ServerEvent)>;

/// Where `startCaptainSelect` routes the lobby.
#[derive(Debug, PartialEq, Eq)]
pub enum StartRoute {
    /// Straight to captain selection.
    CaptainSelect,
    /// Over capacity; a purge must trim the excess first.
    Purge { excess: usize },
}

/// Whether an auction resolution opened another window.
#[derive(Debug, PartialEq, Eq)]
pub enum AuctionProgress {
    /// A new player is up; re-arm the deadline.
    NextWindow,
    /// Every pooled player is assigned; the lobby is now `playing`.
    Complete,
}

struct Member {
    player: LobbyPlayer,
    connected: bool,
}

/// One lobby's entire authoritative state.
pub struct Lobby {
    code: LobbyCode,
    host: LobbyPlayer,
    members: Vec<Member>,
    max_players: usize,
    is_public: bool,
    is_ranked: bool,
    draft_mode: DraftMode,
    phase: Phase,
    team1_color: u8,
    team2_color: u8,
    captains: Vec<PlayerId>,
    teams: [Vec<PlayerId>; 2],
    draft: Option<DraftState>,
    auction: Option<AuctionState>,
    purge: Option<PurgeState>,
    score: Score,
    whitelist: Vec<PlayerId>,
    config: LobbyConfig,
}

impl Lobby {
    pub fn new(
        code: LobbyCode,
        host: LobbyPlayer,
        max_players: usize,
        is_public: bool,
        is_ranked: bool,
        draft_mode: DraftMode,
        config: LobbyConfig,
    ) -> Self {
        Self {
            code,
            members: Vec::new(),
            host,
            max_players,
            is_public,
            is_ranked,
            draft_mode,
            phase: Phase::Waiting,
            team1_color: 0,
            team2_color: 1,
            captains: Vec::new(),
            teams: [Vec::new(), Vec::new()],
            draft: None,
            auction: None,
            purge: None,
            score: Score::default(),
            whitelist: Vec::new(),
            config,
        }
    }

    // -- Accessors ---------------------------------------------------------

    pub fn code(&self) -> &LobbyCode {
        &self.code
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn host_id(&self) -> &PlayerId {
        &self.host.odiscord_id
    }

    pub fn is_host(&self, player: &PlayerId) -> bool {
        self.host.odiscord_id == *player
    }

    pub fn is_public(&self) -> bool {
        self.is_public
    }

    pub fn is_ranked(&self) -> bool {
        self.is_ranked
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn contains(&self, player: &PlayerId) -> bool {
        self.member_index(player).is_some()
    }

    pub fn member_ids(&self) -> Vec<PlayerId> {
        self.members
            .iter()
            .map(|m| m.player.odiscord_id.clone())
            .collect()
    }

    fn member_index(&self, player: &PlayerId) -> Option<usize> {
        self.members
            .iter()
            .position(|m| m.player.odiscord_id == *player)
    }

    fn player(&self, id: &PlayerId) -> Option<&LobbyPlayer> {
        self.members
            .iter()
            .map(|m| &m.player)
            .find(|p| p.odiscord_id == *id)
    }

    /// Team a player is rostered on, if any. Captains count once the
    /// formation phase has seated them.
    fn team_of(&self, player: &PlayerId) -> Option<TeamId> {
        if self.teams[0].contains(player) {
            Some(TeamId::Team1)
        } else if self.teams[1].contains(player) {
            Some(TeamId::Team2)
        } else {
            None
        }
    }

    /// Team captained by `player`: first-selected captain leads team1.
    fn captain_team(&self, player: &PlayerId) -> Option<TeamId> {
        match self.captains.iter().position(|c| c == player)? {
            0 => Some(TeamId::Team1),
            _ => Some(TeamId::Team2),
        }
    }

    pub fn require_host(&self, player: &PlayerId) -> Result<(), LobbyError> {
        if self.is_host(player) {
            Ok(())
        } else {
            Err(LobbyError::NotHost)
        }
    }

    fn require_phase(&self, action: &'static str, phase: Phase) -> Result<(), LobbyError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(LobbyError::WrongPhase {
                action,
                phase: self.phase,
            })
        }
    }

    fn update_all(&self) -> (Recipient, ServerEvent) {
        (
            Recipient::All,
            ServerEvent::LobbyUpdate {
                lobby: self.snapshot(),
            },
        )
    }

    // -- Membership --------------------------------------------------------

    /// Adds a joiner. While `waiting` the lobby accepts joins past
    /// `maxPlayers` (the purge trims the excess at start), up to a hard
    /// cap of twice the configured size.
    pub fn add_member(&mut self, player: LobbyPlayer) -> Result<Events, LobbyError> {
        if !self.phase.is_joinable() {
            return Err(LobbyError::WrongPhase {
                action: "join",
                phase: self.phase,
            });
        }
        if self.contains(&player.odiscord_id) {
            return Err(LobbyError::AlreadyInLobby(player.odiscord_id));
        }
        if self.members.len() >= self.max_players * 2 {
            return Err(LobbyError::LobbyFull(self.code.clone()));
        }
        if !self.is_public
            && !self.whitelist.contains(&player.odiscord_id)
            && !self.is_host(&player.odiscord_id)
        {
            return Err(LobbyError::NotWhitelisted);
        }

        let id = player.odiscord_id.clone();
        let is_creator = self.members.is_empty() && self.is_host(&id);
        self.members.push(Member {
            player,
            connected: true,
        });
        tracing::info!(code = %self.code, player = %id, members = self.members.len(), "player joined");

        let direct = if is_creator {
            ServerEvent::LobbyCreated {
                lobby: self.snapshot(),
            }
        } else {
            ServerEvent::LobbyJoined {
                lobby: self.snapshot(),
            }
        };
        Ok(vec![
            (Recipient::Player(id.clone()), direct),
            (
                Recipient::AllExcept(id),
                ServerEvent::LobbyUpdate {
                    lobby: self.snapshot(),
                },
            ),
        ])
    }

    /// Reconnection within the grace window: the member never left.
    pub fn mark_rejoined(&mut self, player: &PlayerId) -> Result<Events, LobbyError> {
        let idx = self
            .member_index(player)
            .ok_or_else(|| LobbyError::NotInLobby(player.clone()))?;
        self.members[idx].connected = true;
        tracing::info!(code = %self.code, %player, "player rejoined");

        Ok(vec![
            (
                Recipient::Player(player.clone()),
                ServerEvent::RejoinedLobby {
                    lobby: self.snapshot(),
                },
            ),
            (
                Recipient::AllExcept(player.clone()),
                ServerEvent::LobbyUpdate {
                    lobby: self.snapshot(),
                },
            ),
        ])
    }

    /// Marks a member disconnected. Returns `false` for non-members.
    pub fn mark_disconnected(&mut self, player: &PlayerId) -> bool {
        match self.member_index(player) {
            Some(idx) => {
                self.members[idx].connected = false;
                true
            }
            None => false,
        }
    }

    /// Removes a member (leave, kick, grace expiry). Leaving mid-formation
    /// aborts the formation back to `waiting` so no phase is left with a
    /// dangling sub-state.
    pub fn remove_member(&mut self, player: &PlayerId) -> Result<Events, LobbyError> {
        let idx = self
            .member_index(player)
            .ok_or_else(|| LobbyError::NotInLobby(player.clone()))?;
        self.members.remove(idx);
        self.teams[0].retain(|p| p != player);
        self.teams[1].retain(|p| p != player);
        self.captains.retain(|c| c != player);
        tracing::info!(code = %self.code, %player, members = self.members.len(), "player left");

        if self.phase.is_forming() || self.phase == Phase::Purging {
            self.abort_formation();
        }

        if self.members.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![self.update_all()])
    }

    fn abort_formation(&mut self) {
        tracing::info!(code = %self.code, phase = %self.phase, "formation aborted");
        self.captains.clear();
        self.teams = [Vec::new(), Vec::new()];
        self.draft = None;
        self.auction = None;
        self.purge = None;
        self.phase = Phase::Waiting;
    }

    /// Host removes a player outright.
    pub fn kick(&mut self, host: &PlayerId, target: &PlayerId) -> Result<Events, LobbyError> {
        self.require_host(host)?;
        if self.is_host(target) {
            return Err(LobbyError::Unsupported);
        }
        let mut events = vec![(
            Recipient::Player(target.clone()),
            ServerEvent::PlayerKicked {
                odiscord_id: target.clone(),
                reason: "kicked by host".into(),
            },
        )];
        events.extend(self.remove_member(target)?);
        Ok(events)
    }

    /// Host times a player out; the cross-lobby ledger entry is written by
    /// the actor. Kicks the target if they are a member here.
    pub fn timeout_member(
        &mut self,
        host: &PlayerId,
        target: &PlayerId,
        mins: u64,
    ) -> Result<Events, LobbyError> {
        self.require_host(host)?;
        if self.is_host(target) {
            return Err(LobbyError::Unsupported);
        }
        let mut events = vec![(
            Recipient::Player(host.clone()),
            ServerEvent::TimeoutSuccess {
                odiscord_id: target.clone(),
                mins,
            },
        )];
        if self.contains(target) {
            events.push((
                Recipient::Player(target.clone()),
                ServerEvent::PlayerKicked {
                    odiscord_id: target.clone(),
                    reason: "timed out".into(),
                },
            ));
            events.extend(self.remove_member(target)?);
        }
        Ok(events)
    }

    pub fn whitelist_add(&mut self, host: &PlayerId, target: PlayerId) -> Result<Events, LobbyError> {
        self.require_host(host)?;
        if !self.whitelist.contains(&target) {
            self.whitelist.push(target);
        }
        Ok(vec![self.update_all()])
    }

    pub fn whitelist_remove(
        &mut self,
        host: &PlayerId,
        target: &PlayerId,
    ) -> Result<Events, LobbyError> {
        self.require_host(host)?;
        self.whitelist.retain(|p| p != target);
        Ok(vec![self.update_all()])
    }

    pub fn set_colors(
        &mut self,
        host: &PlayerId,
        team1: Option<u8>,
        team2: Option<u8>,
    ) -> Result<Events, LobbyError> {
        self.require_host(host)?;
        for color in [team1, team2].into_iter().flatten() {
            if color > 7 {
                return Err(LobbyError::InvalidColor(color));
            }
        }
        if let Some(c) = team1 {
            self.team1_color = c;
        }
        if let Some(c) = team2 {
            self.team2_color = c;
        }
        Ok(vec![self.update_all()])
    }

    // -- Start / purge -----------------------------------------------------

    /// Validates `startCaptainSelect` and decides the route. Does not
    /// mutate; the actor follows up with [`enter_captain_select`] or
    /// [`enter_purge`].
    ///
    /// [`enter_captain_select`]: Self::enter_captain_select
    /// [`enter_purge`]: Self::enter_purge
    pub fn begin_start(
        &mut self,
        host: &PlayerId,
        present: &[PlayerId],
    ) -> Result<StartRoute, LobbyError> {
        self.require_host(host)?;
        self.require_phase("start", Phase::Waiting)?;
        if self.members.len() < self.config.min_players {
            return Err(LobbyError::NotEnoughPlayers {
                have: self.members.len(),
                need: self.config.min_players,
            });
        }
        if self.is_public {
            let all_present = self
                .members
                .iter()
                .all(|m| present.contains(&m.player.odiscord_id));
            if !all_present {
                return Err(LobbyError::MembersAbsent);
            }
        }

        if self.members.len() > self.max_players {
            Ok(StartRoute::Purge {
                excess: self.members.len() - self.max_players,
            })
        } else {
            Ok(StartRoute::CaptainSelect)
        }
    }

    pub fn enter_captain_select(&mut self) -> Events {
        self.phase = Phase::CaptainSelect;
        tracing::info!(code = %self.code, "captain selection started");
        vec![self.update_all()]
    }

    /// Enters `purging`. `immune` is the subset of members whose tokens
    /// the actor consumed from the immunity ledger.
    pub fn enter_purge(&mut self, immune: Vec<PlayerId>) -> Events {
        self.phase = Phase::Purging;
        let purge = PurgeState::new(
            self.member_ids(),
            immune.clone(),
            self.max_players,
            self.config.purge_countdown,
        );
        let count = purge.required();
        tracing::info!(code = %self.code, count, "purge started");

        let mut events = vec![(
            Recipient::All,
            ServerEvent::PurgeStart {
                count,
                seconds: self.config.purge_countdown.as_secs(),
            },
        )];
        for player in immune {
            events.push((
                Recipient::All,
                ServerEvent::ImmunityUsed {
                    odiscord_id: player,
                },
            ));
        }
        self.purge = Some(purge);
        events.push(self.update_all());
        events
    }

    /// Eliminates one player and removes them from the lobby. Returns the
    /// victim (for ledger/index cleanup) alongside the events.
    pub fn purge_eliminate<R: rand::Rng>(&mut self, rng: &mut R) -> (Option<PlayerId>, Events) {
        let Some(purge) = self.purge.as_mut() else {
            return (None, Vec::new());
        };
        purge.countdown_elapsed();
        let Some(victim) = purge.eliminate_one(rng) else {
            return (None, Vec::new());
        };

        // Eliminated players are always unassigned, so this never touches
        // team rosters.
        if let Some(idx) = self.member_index(&victim) {
            self.members.remove(idx);
        }
        tracing::info!(code = %self.code, player = %victim, "player purged");

        let events = vec![
            (
                Recipient::All,
                ServerEvent::PlayerEliminated {
                    odiscord_id: victim.clone(),
                },
            ),
            self.update_all(),
        ];
        (Some(victim), events)
    }

    /// `true` once the active purge has met its quota or run out of
    /// eligible players.
    pub fn purge_complete(&self) -> bool {
        self.purge.as_ref().is_some_and(|p| p.is_complete())
    }

    /// Ends the purge and advances to captain selection.
    pub fn finish_purge(&mut self) -> Events {
        if let Some(purge) = self.purge.take() {
            if purge.fell_short() {
                tracing::warn!(
                    code = %self.code,
                    eliminated = purge.eliminated().len(),
                    required = purge.required(),
                    "purge completed short; too many immune players"
                );
            }
        }
        self.phase = Phase::CaptainSelect;
        let survivors = self.member_ids();
        tracing::info!(code = %self.code, survivors = survivors.len(), "purge complete");
        vec![
            (Recipient::All, ServerEvent::PurgeComplete { survivors }),
            self.update_all(),
        ]
    }

    // -- Captains and formation --------------------------------------------

    /// Promotes a member to captain. Selecting the second captain seats
    /// both and advances into the lobby's draft mode, which the returned
    /// mode reports.
    pub fn select_captain(
        &mut self,
        host: &PlayerId,
        target: &PlayerId,
    ) -> Result<(Events, Option<DraftMode>), LobbyError> {
        self.require_host(host)?;
        self.require_phase("select a captain", Phase::CaptainSelect)?;
        if !self.contains(target) {
            return Err(LobbyError::NotInLobby(target.clone()));
        }
        if self.captains.contains(target) {
            return Err(LobbyError::AlreadyCaptain(target.clone()));
        }

        self.captains.push(target.clone());
        tracing::info!(code = %self.code, captain = %target, "captain selected");

        if self.captains.len() < 2 {
            return Ok((vec![self.update_all()], None));
        }
        let (events, mode) = self.start_formation();
        Ok((events, Some(mode)))
    }

    fn start_formation(&mut self) -> (Events, DraftMode) {
        self.teams[0] = vec![self.captains[0].clone()];
        self.teams[1] = vec![self.captains[1].clone()];

        let pool: Vec<&LobbyPlayer> = self
            .members
            .iter()
            .map(|m| &m.player)
            .filter(|p| !self.captains.contains(&p.odiscord_id))
            .collect();

        match self.draft_mode {
            DraftMode::Turns => {
                self.draft = Some(DraftState::new(pool.len()));
                self.phase = Phase::Drafting;
                tracing::info!(code = %self.code, pool = pool.len(), "draft started");
                (vec![self.update_all()], DraftMode::Turns)
            }
            DraftMode::Market => {
                let capacity = self.members.len().div_ceil(2);
                let mut auction = AuctionState::new(
                    pool.iter()
                        .map(|p| (p.odiscord_id.clone(), p.elo))
                        .collect(),
                    self.config.starting_budget,
                    capacity,
                    self.config.auction_window,
                );
                let mut events = Vec::new();
                if let Some(first) = auction.begin_next() {
                    events.push((
                        Recipient::All,
                        ServerEvent::AuctionStart {
                            odiscord_id: first,
                            seconds: auction.window_secs(),
                        },
                    ));
                }
                self.auction = Some(auction);
                self.phase = Phase::Market;
                tracing::info!(code = %self.code, "market started");
                events.push(self.update_all());
                (events, DraftMode::Market)
            }
        }
    }

    pub fn remove_captain(
        &mut self,
        host: &PlayerId,
        target: &PlayerId,
    ) -> Result<Events, LobbyError> {
        self.require_host(host)?;
        self.require_phase("remove a captain", Phase::CaptainSelect)?;
        if !self.captains.contains(target) {
            return Err(LobbyError::NotACaptain(target.clone()));
        }
        self.captains.retain(|c| c != target);
        Ok(vec![self.update_all()])
    }

    // -- Draft -------------------------------------------------------------

    /// Captain on turn picks an unassigned player. Completing the draft
    /// flips the lobby to `playing`.
    pub fn draft_pick(
        &mut self,
        sender: &PlayerId,
        target: &PlayerId,
    ) -> Result<Events, LobbyError> {
        self.require_phase("pick", Phase::Drafting)?;
        let team = self.captain_team(sender).ok_or(LobbyError::NotCaptain)?;
        let phase = self.phase;
        let draft = self
            .draft
            .as_mut()
            .ok_or(LobbyError::WrongPhase { action: "pick", phase })?;
        if draft.current_turn() != Some(team) {
            return Err(LobbyError::NotYourTurn);
        }
        if !self.members.iter().any(|m| m.player.odiscord_id == *target) {
            return Err(LobbyError::NotInLobby(target.clone()));
        }
        if self.teams[0].contains(target) || self.teams[1].contains(target) {
            return Err(LobbyError::AlreadyAssigned(target.clone()));
        }

        self.teams[team.index()].push(target.clone());
        draft.record_pick();
        tracing::info!(code = %self.code, %team, player = %target, "draft pick");

        if draft.is_complete() {
            self.draft = None;
            self.phase = Phase::Playing;
            tracing::info!(code = %self.code, "draft complete, match underway");
        }
        Ok(vec![self.update_all()])
    }

    // -- Market ------------------------------------------------------------

    /// Captain bids on the player currently up.
    pub fn place_bid(&mut self, sender: &PlayerId, amount: u32) -> Result<Events, LobbyError> {
        self.require_phase("bid", Phase::Market)?;
        let team = self.captain_team(sender).ok_or(LobbyError::NotCaptain)?;
        let roster_len = self.teams[team.index()].len();
        let auction = self.auction.as_mut().ok_or(LobbyError::NoActiveAuction)?;
        auction.place_bid(team, amount, roster_len)?;
        tracing::debug!(code = %self.code, %team, amount, "bid placed");

        Ok(vec![
            (Recipient::All, ServerEvent::BidUpdate { team, amount }),
            self.update_all(),
        ])
    }

    /// Deadline hit: resolve the current window, assign the player, and
    /// either open the next window or complete the market.
    pub fn close_auction_window(&mut self) -> Result<(Events, AuctionProgress), LobbyError> {
        let (t1, t2) = (self.teams[0].len(), self.teams[1].len());
        let auction = self.auction.as_mut().ok_or(LobbyError::NoActiveAuction)?;
        let sale = auction.resolve(t1, t2)?;

        self.teams[sale.team.index()].push(sale.odiscord_id.clone());
        tracing::info!(
            code = %self.code,
            player = %sale.odiscord_id,
            team = %sale.team,
            amount = sale.amount,
            "auction window closed"
        );

        let mut events = vec![(
            Recipient::All,
            ServerEvent::AuctionEnd {
                odiscord_id: sale.odiscord_id.clone(),
                team: sale.team,
                amount: sale.amount,
            },
        )];

        // Reborrow: pushing onto the roster above ended the auction borrow.
        let auction = self.auction.as_mut().ok_or(LobbyError::NoActiveAuction)?;
        if let Some(next) = auction.begin_next() {
            let seconds = auction.window_secs();
            events.push((
                Recipient::All,
                ServerEvent::AuctionStart {
                    odiscord_id: next,
                    seconds,
                },
            ));
            events.push(self.update_all());
            return Ok((events, AuctionProgress::NextWindow));
        }

        self.auction = None;
        self.phase = Phase::Playing;
        tracing::info!(code = %self.code, "market complete, match underway");
        events.push(self.update_all());
        Ok((events, AuctionProgress::Complete))
    }

    /// Close time of the open auction window, for the actor's timer.
    pub fn auction_deadline(&self) -> Option<Instant> {
        self.auction.as_ref().and_then(|a| a.deadline())
    }

    // -- Playing / finish --------------------------------------------------

    /// Awards a round point. Returns the winner when the configured score
    /// threshold is reached.
    pub fn add_score(
        &mut self,
        host: &PlayerId,
        team: TeamId,
    ) -> Result<(Events, Option<Winner>), LobbyError> {
        self.require_host(host)?;
        self.require_phase("score", Phase::Playing)?;
        match team {
            TeamId::Team1 => self.score.team1 += 1,
            TeamId::Team2 => self.score.team2 += 1,
        }

        let winner = self.config.win_score.and_then(|threshold| {
            if self.score.get(team) >= threshold {
                Some(match team {
                    TeamId::Team1 => Winner::Team1,
                    TeamId::Team2 => Winner::Team2,
                })
            } else {
                None
            }
        });
        Ok((vec![self.update_all()], winner))
    }

    /// Builds the outcome handed to the finalizer. Leaves the lobby in
    /// `playing`; [`finish_match`] advances it only after persistence
    /// succeeds.
    ///
    /// [`finish_match`]: Self::finish_match
    pub fn match_outcome(
        &self,
        host: &PlayerId,
        winner: Winner,
    ) -> Result<MatchOutcome, LobbyError> {
        self.require_host(host)?;
        self.require_phase("declare a winner", Phase::Playing)?;
        Ok(MatchOutcome {
            lobby_code: self.code.clone(),
            winner,
            is_ranked: self.is_ranked,
            team1: self.lineup(TeamId::Team1),
            team2: self.lineup(TeamId::Team2),
        })
    }

    fn lineup(&self, team: TeamId) -> Vec<LineupPlayer> {
        self.teams[team.index()]
            .iter()
            .filter_map(|id| self.player(id))
            .map(|p| LineupPlayer {
                odiscord_id: p.odiscord_id.clone(),
                username: p.username.clone(),
                elo: p.elo,
                stats: None,
            })
            .collect()
    }

    /// The match record was persisted; the lobby is done.
    pub fn finish_match(&mut self, match_id: String) -> Events {
        self.phase = Phase::Finished;
        tracing::info!(code = %self.code, %match_id, "match finished");
        vec![
            (Recipient::All, ServerEvent::MatchFinalized { match_id }),
            self.update_all(),
        ]
    }

    /// Host loops a finished lobby back to `waiting`, keeping membership
    /// and whitelist.
    pub fn reset(&mut self, host: &PlayerId) -> Result<Events, LobbyError> {
        self.require_host(host)?;
        self.require_phase("reset", Phase::Finished)?;
        self.captains.clear();
        self.teams = [Vec::new(), Vec::new()];
        self.draft = None;
        self.auction = None;
        self.purge = None;
        self.score = Score::default();
        self.phase = Phase::Waiting;
        tracing::info!(code = %self.code, "lobby reset");
        Ok(vec![self.update_all()])
    }

    /// Voice presence report for `checkVCStatus`.
    pub fn vc_status(&self, present: Vec<PlayerId>) -> Events {
        let all_in_vc = self
            .members
            .iter()
            .all(|m| present.contains(&m.player.odiscord_id));
        vec![(
            Recipient::All,
            ServerEvent::VcStatus {
                players_in_vc: present,
                all_in_vc,
            },
        )]
    }

    // -- Snapshot ----------------------------------------------------------

    fn roster(&self, team: TeamId) -> Vec<LobbyPlayer> {
        self.teams[team.index()]
            .iter()
            .filter_map(|id| self.player(id))
            .cloned()
            .collect()
    }

    /// The full wire-shaped state broadcast in `lobbyUpdate`.
    pub fn snapshot(&self) -> LobbySnapshot {
        LobbySnapshot {
            id: self.code.clone(),
            code: self.code.clone(),
            host: self.host.clone(),
            players: self.members.iter().map(|m| m.player.clone()).collect(),
            max_players: self.max_players,
            is_public: self.is_public,
            is_ranked: self.is_ranked,
            draft_mode: self.draft_mode,
            phase: self.phase,
            team1_color: self.team1_color,
            team2_color: self.team2_color,
            captains: self.captains.clone(),
            teams: Teams {
                team1: self.roster(TeamId::Team1),
                team2: self.roster(TeamId::Team2),
            },
            current_turn: self.draft.as_ref().and_then(|d| d.current_turn()),
            picks_left: self.draft.as_ref().map(|d| d.picks_left()),
            score: self.score,
            whitelist: self.whitelist.clone(),
            purge: self.purge.as_ref().map(|p| p.snapshot()),
            auction: self.auction.as_ref().map(|a| a.snapshot()),
        }
    }

    /// Grace window from the lobby's config, for the actor's timers.
    pub fn reconnect_grace(&self) -> Duration {
        self.config.reconnect_grace
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(s: &str) -> PlayerId {
        PlayerId::from(s)
    }

    fn lp(id: &str, elo: i32) -> LobbyPlayer {
        LobbyPlayer {
            odiscord_id: pid(id),
            username: id.to_string(),
            avatar: None,
            elo,
        }
    }

    fn lobby(max: usize, mode: DraftMode) -> Lobby {
        let mut l = Lobby::new(
            LobbyCode("AB3X9".into()),
            lp("host", 500),
            max,
            true,
            true,
            mode,
            LobbyConfig::default(),
        );
        l.add_member(lp("host", 500)).unwrap();
        l
    }

    /// Fills the lobby to `n` members total and promotes host + p1 to
    /// captains, advancing into the formation phase.
    fn formed(n: usize, mode: DraftMode) -> Lobby {
        let mut l = lobby(n, mode);
        for i in 1..n {
            l.add_member(lp(&format!("p{i}"), 500 + i as i32)).unwrap();
        }
        let host = pid("host");
        l.begin_start(&host, &l.member_ids()).unwrap();
        l.enter_captain_select();
        l.select_captain(&host, &pid("host")).unwrap();
        l.select_captain(&host, &pid("p1")).unwrap();
        l
    }

    #[test]
    fn test_join_and_snapshot_membership() {
        let mut l = lobby(8, DraftMode::Turns);
        let events = l.add_member(lp("p1", 510)).unwrap();
        assert!(matches!(
            events[0],
            (Recipient::Player(_), ServerEvent::LobbyJoined { .. })
        ));
        let snap = l.snapshot();
        assert_eq!(snap.players.len(), 2);
        assert_eq!(snap.host.odiscord_id, pid("host"));
        assert_eq!(snap.phase, Phase::Waiting);
    }

    #[test]
    fn test_creator_first_join_yields_lobby_created() {
        let mut l = Lobby::new(
            LobbyCode("AB3X9".into()),
            lp("host", 500),
            8,
            true,
            true,
            DraftMode::Turns,
            LobbyConfig::default(),
        );
        let events = l.add_member(lp("host", 500)).unwrap();
        assert!(matches!(
            events[0],
            (Recipient::Player(_), ServerEvent::LobbyCreated { .. })
        ));
    }

    #[test]
    fn test_join_rejected_twice() {
        let mut l = lobby(8, DraftMode::Turns);
        l.add_member(lp("p1", 500)).unwrap();
        let err = l.add_member(lp("p1", 500)).unwrap_err();
        assert!(matches!(err, LobbyError::AlreadyInLobby(_)));
    }

    #[test]
    fn test_join_allows_overflow_up_to_hard_cap() {
        let mut l = lobby(4, DraftMode::Turns);
        for i in 1..8 {
            l.add_member(lp(&format!("p{i}"), 500)).unwrap();
        }
        let err = l.add_member(lp("p8", 500)).unwrap_err();
        assert!(matches!(err, LobbyError::LobbyFull(_)));
    }

    #[test]
    fn test_private_lobby_requires_whitelist() {
        let mut l = Lobby::new(
            LobbyCode("AAAAA".into()),
            lp("host", 500),
            8,
            false,
            true,
            DraftMode::Turns,
            LobbyConfig::default(),
        );
        l.add_member(lp("host", 500)).unwrap();
        let err = l.add_member(lp("p1", 500)).unwrap_err();
        assert!(matches!(err, LobbyError::NotWhitelisted));

        l.whitelist_add(&pid("host"), pid("p1")).unwrap();
        assert!(l.add_member(lp("p1", 500)).is_ok());
    }

    #[test]
    fn test_kick_requires_host() {
        let mut l = lobby(8, DraftMode::Turns);
        l.add_member(lp("p1", 500)).unwrap();
        l.add_member(lp("p2", 500)).unwrap();
        assert!(matches!(
            l.kick(&pid("p1"), &pid("p2")),
            Err(LobbyError::NotHost)
        ));
        let events = l.kick(&pid("host"), &pid("p2")).unwrap();
        assert!(matches!(
            events[0],
            (Recipient::Player(_), ServerEvent::PlayerKicked { .. })
        ));
        assert!(!l.contains(&pid("p2")));
    }

    #[test]
    fn test_start_requires_min_players_and_presence() {
        let mut l = lobby(8, DraftMode::Turns);
        l.add_member(lp("p1", 500)).unwrap();
        let host = pid("host");
        assert!(matches!(
            l.begin_start(&host, &l.member_ids()),
            Err(LobbyError::NotEnoughPlayers { have: 2, need: 4 })
        ));

        l.add_member(lp("p2", 500)).unwrap();
        l.add_member(lp("p3", 500)).unwrap();
        // Public lobby: one absent member blocks the start.
        assert!(matches!(
            l.begin_start(&host, &[pid("host"), pid("p1"), pid("p2")]),
            Err(LobbyError::MembersAbsent)
        ));
        assert_eq!(
            l.begin_start(&host, &l.member_ids()).unwrap(),
            StartRoute::CaptainSelect
        );
    }

    #[test]
    fn test_start_routes_through_purge_when_overfull() {
        let mut l = lobby(4, DraftMode::Turns);
        for i in 1..6 {
            l.add_member(lp(&format!("p{i}"), 500)).unwrap();
        }
        let route = l.begin_start(&pid("host"), &l.member_ids()).unwrap();
        assert_eq!(route, StartRoute::Purge { excess: 2 });
    }

    #[test]
    fn test_second_captain_advances_to_drafting() {
        let l = formed(8, DraftMode::Turns);
        assert_eq!(l.phase(), Phase::Drafting);
        let snap = l.snapshot();
        assert_eq!(snap.captains.len(), 2);
        assert_eq!(snap.teams.team1[0].odiscord_id, pid("host"));
        assert_eq!(snap.teams.team2[0].odiscord_id, pid("p1"));
        assert_eq!(snap.current_turn, Some(TeamId::Team1));
        assert_eq!(snap.picks_left, Some(6));
    }

    #[test]
    fn test_draft_enforces_turn_order() {
        let mut l = formed(8, DraftMode::Turns);
        // team2's captain (p1) is not on turn for the first pick.
        assert!(matches!(
            l.draft_pick(&pid("p1"), &pid("p2")),
            Err(LobbyError::NotYourTurn)
        ));
        // Non-captains cannot pick at all.
        assert!(matches!(
            l.draft_pick(&pid("p2"), &pid("p3")),
            Err(LobbyError::NotCaptain)
        ));
        l.draft_pick(&pid("host"), &pid("p2")).unwrap();
        assert!(matches!(
            l.draft_pick(&pid("host"), &pid("p3")),
            Err(LobbyError::NotYourTurn)
        ));
    }

    #[test]
    fn test_draft_completion_fills_rosters_and_starts_match() {
        let mut l = formed(8, DraftMode::Turns);
        // Snake order: 1,2,2,1,1,2 over p2..p7.
        for (captain, target) in [
            ("host", "p2"),
            ("p1", "p3"),
            ("p1", "p4"),
            ("host", "p5"),
            ("host", "p6"),
            ("p1", "p7"),
        ] {
            l.draft_pick(&pid(captain), &pid(target)).unwrap();
        }
        assert_eq!(l.phase(), Phase::Playing);
        let snap = l.snapshot();
        assert_eq!(snap.teams.team1.len(), 4);
        assert_eq!(snap.teams.team2.len(), 4);
        assert_eq!(snap.picks_left, None);
        // Membership partition holds: everyone is on exactly one side.
        for m in &snap.players {
            let in1 = snap.teams.team1.iter().any(|p| p.odiscord_id == m.odiscord_id);
            let in2 = snap.teams.team2.iter().any(|p| p.odiscord_id == m.odiscord_id);
            assert!(in1 ^ in2);
        }
    }

    #[test]
    fn test_picking_an_assigned_player_is_rejected() {
        let mut l = formed(8, DraftMode::Turns);
        l.draft_pick(&pid("host"), &pid("p2")).unwrap();
        let err = l.draft_pick(&pid("p1"), &pid("p2")).unwrap_err();
        assert!(matches!(err, LobbyError::AlreadyAssigned(_)));
    }

    #[test]
    fn test_market_opens_highest_rated_first() {
        let l = formed(4, DraftMode::Market);
        assert_eq!(l.phase(), Phase::Market);
        let snap = l.snapshot();
        let auction = snap.auction.unwrap();
        // p3 (elo 503) outranks p2 (elo 502).
        assert_eq!(auction.current, Some(pid("p3")));
        assert_eq!(auction.budgets.team1, 1000);
    }

    #[test]
    fn test_market_resolution_completes_to_playing() {
        let mut l = formed(4, DraftMode::Market);
        l.place_bid(&pid("host"), 100).unwrap();
        let (_, progress) = l.close_auction_window().unwrap();
        assert_eq!(progress, AuctionProgress::NextWindow);

        let (_, progress) = l.close_auction_window().unwrap();
        assert_eq!(progress, AuctionProgress::Complete);
        assert_eq!(l.phase(), Phase::Playing);
        let snap = l.snapshot();
        assert!(snap.auction.is_none());
        assert_eq!(snap.teams.team1.len() + snap.teams.team2.len(), 4);
    }

    #[test]
    fn test_draft_pick_rejected_during_market() {
        let mut l = formed(4, DraftMode::Market);
        let err = l.draft_pick(&pid("host"), &pid("p2")).unwrap_err();
        assert!(matches!(
            err,
            LobbyError::WrongPhase {
                action: "pick",
                phase: Phase::Market
            }
        ));
    }

    #[test]
    fn test_leave_mid_draft_aborts_formation() {
        let mut l = formed(8, DraftMode::Turns);
        l.remove_member(&pid("p4")).unwrap();
        assert_eq!(l.phase(), Phase::Waiting);
        let snap = l.snapshot();
        assert!(snap.captains.is_empty());
        assert!(snap.teams.team1.is_empty());
        assert_eq!(snap.players.len(), 7);
    }

    #[test]
    fn test_score_threshold_declares_winner() {
        let mut config = LobbyConfig::default();
        config.win_score = Some(2);
        let mut l = Lobby::new(
            LobbyCode("AAAAA".into()),
            lp("host", 500),
            4,
            true,
            true,
            DraftMode::Turns,
            config,
        );
        l.add_member(lp("host", 500)).unwrap();
        for i in 1..4 {
            l.add_member(lp(&format!("p{i}"), 500)).unwrap();
        }
        let host = pid("host");
        l.begin_start(&host, &l.member_ids()).unwrap();
        l.enter_captain_select();
        l.select_captain(&host, &pid("host")).unwrap();
        l.select_captain(&host, &pid("p1")).unwrap();
        l.draft_pick(&pid("host"), &pid("p2")).unwrap();
        l.draft_pick(&pid("p1"), &pid("p3")).unwrap();
        assert_eq!(l.phase(), Phase::Playing);

        let (_, winner) = l.add_score(&host, TeamId::Team1).unwrap();
        assert_eq!(winner, None);
        let (_, winner) = l.add_score(&host, TeamId::Team1).unwrap();
        assert_eq!(winner, Some(Winner::Team1));
    }

    #[test]
    fn test_reset_returns_to_waiting_keeping_members() {
        let mut l = formed(4, DraftMode::Turns);
        l.draft_pick(&pid("host"), &pid("p2")).unwrap();
        l.draft_pick(&pid("p1"), &pid("p3")).unwrap();
        let host = pid("host");
        l.match_outcome(&host, Winner::Team1).unwrap();
        l.finish_match("m1".into());
        assert_eq!(l.phase(), Phase::Finished);

        l.reset(&host).unwrap();
        assert_eq!(l.phase(), Phase::Waiting);
        let snap = l.snapshot();
        assert_eq!(snap.players.len(), 4);
        assert!(snap.captains.is_empty());
        assert_eq!(snap.score, Score::default());
    }

    #[test]
    fn test_match_outcome_uses_roster_ratings() {
        let l = {
            let mut l = formed(4, DraftMode::Turns);
            l.draft_pick(&pid("host"), &pid("p2")).unwrap();
            l.draft_pick(&pid("p1"), &pid("p3")).unwrap();
            l
        };
        let outcome = l.match_outcome(&pid("host"), Winner::Team2).unwrap();
        assert_eq!(outcome.team1.len(), 2);
        assert_eq!(outcome.team2.len(), 2);
        assert!(outcome.is_ranked);
        assert_eq!(outcome.team1[0].odiscord_id, pid("host"));
        assert_eq!(outcome.team1[0].elo, 500);
    }
}
